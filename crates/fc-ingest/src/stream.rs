//! Frame delivery to HTTP clients.
//!
//! A [`FrameCursor`] walks one device's chain from the frame that was in
//! progress when it was opened, yielding only undamaged frames. Cursors are
//! independent: a slow reader pins only the frame it is positioned on, and
//! falls forward to the head once it is more than `max_reader_lag` frames
//! behind or its successor has left the device's retention window.

use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use fc_core::config::StreamConfig;
use fc_core::{Error, Result};

use crate::device::Device;
use crate::frame::{Frame, FrameData};

/// A reader's position in a device's frame chain.
pub struct FrameCursor {
    device: Arc<Device>,
    frame: Arc<Frame>,
    max_lag: u64,
    timeout: Option<Duration>,
}

impl FrameCursor {
    /// Position a cursor at the device's in-progress frame.
    ///
    /// Fails with [`Error::NoFrames`] if the device has not sent a single
    /// chunk yet.
    pub fn open(device: Arc<Device>, config: &StreamConfig) -> Result<Self> {
        let frame = device
            .current_frame()
            .ok_or_else(|| Error::no_frames(device.id()))?;
        Ok(Self {
            device,
            frame,
            max_lag: config.max_reader_lag,
            timeout: config.frame_timeout(),
        })
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Chain position of the frame the cursor will yield or wait on next.
    pub fn position(&self) -> u64 {
        self.frame.seq()
    }

    /// Wait for and return the next undamaged frame.
    ///
    /// Returns [`Error::Timeout`] if a frame timeout is configured and no
    /// frame completes in time.
    pub async fn next_frame(&mut self) -> Result<FrameData> {
        loop {
            self.catch_up();

            let frame = Arc::clone(&self.frame);
            let done = match self.timeout {
                Some(limit) => tokio::time::timeout(limit, frame.completed())
                    .await
                    .map_err(|_| Error::Timeout(limit))?,
                None => frame.completed().await,
            };

            let data = done.data().clone();
            self.frame = match done.next() {
                Some(next) => next,
                None => {
                    let head = self
                        .device
                        .current_frame()
                        .ok_or_else(|| Error::no_frames(self.device.id()))?;
                    tracing::debug!(
                        device = %self.device.id(),
                        from = data.seq,
                        to = head.seq(),
                        "Successor no longer retained; skipping ahead"
                    );
                    head
                }
            };

            if data.damaged {
                tracing::trace!(
                    device = %self.device.id(),
                    seq = data.seq,
                    "Skipping damaged frame"
                );
                continue;
            }
            return Ok(data);
        }
    }

    /// Jump to the device's in-progress frame if this cursor has fallen too
    /// far behind.
    fn catch_up(&mut self) {
        let Some(head) = self.device.current_frame() else {
            return;
        };
        let lag = head.seq().saturating_sub(self.frame.seq());
        if lag > self.max_lag {
            tracing::debug!(
                device = %self.device.id(),
                from = self.frame.seq(),
                to = head.seq(),
                "Reader fell behind; skipping ahead"
            );
            self.frame = head;
        }
    }
}

impl std::fmt::Debug for FrameCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCursor")
            .field("device", &self.device.id())
            .field("position", &self.position())
            .finish()
    }
}

/// Wait for the device's next undamaged frame.
///
/// A device that has never completed a frame fails immediately with
/// [`Error::NoFrames`] rather than blocking.
pub async fn snapshot(device: Arc<Device>, config: &StreamConfig) -> Result<FrameData> {
    if device.rx_frames() == 0 {
        return Err(Error::no_frames(device.id()));
    }
    FrameCursor::open(device, config)?.next_frame().await
}

/// `Content-Type` of a multipart MJPEG response.
pub fn content_type(boundary: &str) -> String {
    format!("multipart/x-mixed-replace; boundary={boundary}")
}

/// Encode one multipart body part carrying `frame`.
pub fn encode_part(boundary: &str, frame: &FrameData) -> Bytes {
    let header = format!(
        "--{boundary}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        frame.payload.len()
    );
    let mut part = BytesMut::with_capacity(header.len() + frame.payload.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(&frame.payload);
    part.put_slice(b"\r\n");
    part.freeze()
}
