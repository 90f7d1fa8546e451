//! Frame reassembly.
//!
//! The [`Reassembler`] is the single writer of every device's counters and
//! in-progress frame. Each accepted chunk is written at
//! `chunk_size * index` in the device's working buffer; the end-of-frame
//! chunk freezes an exact-size copy into the chain and starts the next node.
//! The last few completed frames are retained per device so readers a little
//! behind the head can still walk forward to them.
//!
//! Sequencing is checked but never enforced: a gap or reorder marks the
//! frame damaged and assembly carries on, so the chain keeps advancing even
//! on a lossy link. Damaged frames are completed like any other and simply
//! skipped by readers.

use std::net::IpAddr;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;

use fc_core::config::IngestConfig;
use fc_core::DeviceId;

use crate::chunk::Chunk;
use crate::device::Device;
use crate::frame::{Frame, FrameData};
use crate::registry::DeviceRegistry;

/// What happened to an accepted chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepted {
    /// The chunk was added to the in-progress frame.
    Assembling,
    /// The chunk ended a frame.
    Completed {
        /// Chain position of the completed frame.
        seq: u64,
        damaged: bool,
        len: usize,
    },
}

/// Completed frames kept per device when no retention is configured.
pub const DEFAULT_RETAINED_FRAMES: usize = 64;

/// Turns decoded chunks into completed frames.
pub struct Reassembler {
    registry: Arc<DeviceRegistry>,
    chunk_size: usize,
    max_frame_size: usize,
    retained_frames: usize,
}

impl Reassembler {
    pub fn new(registry: Arc<DeviceRegistry>, config: &IngestConfig) -> Self {
        Self {
            registry,
            chunk_size: config.chunk_size,
            max_frame_size: config.max_frame_size,
            retained_frames: DEFAULT_RETAINED_FRAMES,
        }
    }

    /// Set how many completed frames each device keeps alive behind the
    /// frame being assembled.
    pub fn with_retention(mut self, frames: usize) -> Self {
        self.retained_frames = frames;
        self
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Decode one datagram and feed it to the device it came from.
    ///
    /// Undecodable datagrams are logged and dropped without touching any
    /// device.
    pub fn handle_datagram(&self, source: IpAddr, datagram: &[u8]) -> Option<Accepted> {
        let chunk = match Chunk::decode(datagram) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(source = %source, "Dropping datagram: {e}");
                return None;
            }
        };

        let device = self.registry.ensure(DeviceId::new(source));
        Some(self.accept(&device, &chunk))
    }

    /// Apply one chunk to `device`'s in-progress frame.
    pub fn accept(&self, device: &Device, chunk: &Chunk<'_>) -> Accepted {
        let mut asm = device.assembly.lock();

        if asm.frame.is_none() {
            asm.buf = Vec::with_capacity(self.max_frame_size);
            asm.restart(Frame::head());
        }

        let number = asm.number;
        match number {
            None => asm.number = Some(chunk.frame_number),
            Some(number) if number != chunk.frame_number => {
                tracing::debug!(
                    device = %device.id(),
                    expected = number,
                    got = chunk.frame_number,
                    "Chunk from a different frame number"
                );
                asm.damaged = true;
            }
            Some(_) => {}
        }

        let index = i64::from(chunk.index);
        let expected = asm.last_chunk + 1;
        if index != expected {
            tracing::debug!(
                device = %device.id(),
                frame = chunk.frame_number,
                expected,
                got = index,
                "Chunk out of sequence"
            );
            asm.damaged = true;
            device.add_lost_chunks((index - expected).max(0) as u64);
        }

        device.add_rx_bytes(chunk.payload.len() as u64);

        let span = usize::from(chunk.index)
            .checked_mul(self.chunk_size)
            .and_then(|offset| Some((offset, offset.checked_add(chunk.payload.len())?)))
            .filter(|(_, end)| *end <= self.max_frame_size);
        match span {
            Some((offset, end)) => {
                if asm.buf.len() < end {
                    asm.buf.resize(end, 0);
                }
                asm.buf[offset..end].copy_from_slice(chunk.payload);
            }
            None => {
                tracing::warn!(
                    device = %device.id(),
                    frame = chunk.frame_number,
                    index = chunk.index,
                    chunk_size = self.chunk_size,
                    len = chunk.payload.len(),
                    max_frame_size = self.max_frame_size,
                    "Chunk exceeds maximum frame size; dropped"
                );
                asm.damaged = true;
            }
        }

        if !chunk.end_of_frame {
            asm.last_chunk = index;
            return Accepted::Assembling;
        }

        let Some(frame) = asm.frame.take() else {
            return Accepted::Assembling;
        };
        let completed_at = Utc::now();
        let data = FrameData {
            number: asm.number.unwrap_or(chunk.frame_number),
            seq: frame.seq(),
            damaged: asm.damaged,
            payload: Bytes::copy_from_slice(&asm.buf),
            completed_at,
        };
        let outcome = Accepted::Completed {
            seq: frame.seq(),
            damaged: data.damaged,
            len: data.payload.len(),
        };

        if data.damaged {
            tracing::debug!(
                device = %device.id(),
                frame = data.number,
                seq = data.seq,
                "Completed damaged frame"
            );
        } else {
            tracing::trace!(
                device = %device.id(),
                frame = data.number,
                seq = data.seq,
                len = data.payload.len(),
                "Completed frame"
            );
        }

        let next = frame.complete(data);
        asm.retain(frame, self.retained_frames);
        asm.restart(next);
        drop(asm);

        device.record_frame(completed_at);
        outcome
    }
}
