//! Per-device state.
//!
//! A [`Device`] is shared between the ingest task (the only writer of its
//! counters and in-progress frame), the statistics task (the only writer of
//! its rates) and any number of stream readers. Counters are atomics; the
//! in-progress assembly and the rate snapshot each sit behind their own
//! short-lived lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use fc_core::DeviceId;

use crate::frame::Frame;

/// In-progress reassembly state for a device's current frame.
pub(crate) struct Assembly {
    /// The chain node being filled; `None` until the first chunk arrives.
    pub(crate) frame: Option<Arc<Frame>>,
    /// Protocol frame number of the first chunk accepted into `frame`.
    pub(crate) number: Option<u16>,
    /// Index of the last accepted chunk, -1 before the first one.
    pub(crate) last_chunk: i64,
    pub(crate) damaged: bool,
    /// Working buffer reused across frames; its length is the high-water
    /// mark of bytes written.
    pub(crate) buf: Vec<u8>,
    /// Most recently completed frames, oldest first.
    pub(crate) retained: VecDeque<Arc<Frame>>,
}

impl Assembly {
    fn new() -> Self {
        Self {
            frame: None,
            number: None,
            last_chunk: -1,
            damaged: false,
            buf: Vec::new(),
            retained: VecDeque::new(),
        }
    }

    /// Keep `frame` alive, dropping the oldest retained frames beyond `limit`.
    pub(crate) fn retain(&mut self, frame: Arc<Frame>, limit: usize) {
        self.retained.push_back(frame);
        while self.retained.len() > limit {
            self.retained.pop_front();
        }
    }

    /// Point the assembly at a fresh chain node.
    pub(crate) fn restart(&mut self, frame: Arc<Frame>) {
        self.frame = Some(frame);
        self.number = None;
        self.last_chunk = -1;
        self.damaged = false;
        self.buf.clear();
    }
}

/// Most recent rate sample plus the counter values it was taken at.
#[derive(Debug, Clone, Copy, Default)]
struct RateSample {
    bps: f64,
    fps: f64,
    rx_bytes_last: u64,
    rx_frames_last: u64,
}

/// Rates produced by one statistics sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    pub bps: f64,
    pub fps: f64,
}

/// One upstream video source.
pub struct Device {
    id: DeviceId,
    first_seen: DateTime<Utc>,
    order: u64,
    pub(crate) assembly: Mutex<Assembly>,
    rx_bytes: AtomicU64,
    rx_frames: AtomicU64,
    lost_chunks: AtomicU64,
    last_frame_time: Mutex<Option<DateTime<Utc>>>,
    rates: Mutex<RateSample>,
}

impl Device {
    pub(crate) fn new(id: DeviceId, order: u64) -> Self {
        Self {
            id,
            first_seen: Utc::now(),
            order,
            assembly: Mutex::new(Assembly::new()),
            rx_bytes: AtomicU64::new(0),
            rx_frames: AtomicU64::new(0),
            lost_chunks: AtomicU64::new(0),
            last_frame_time: Mutex::new(None),
            rates: Mutex::new(RateSample::default()),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    /// Registration order within the registry, starting at 0.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// The frame currently being assembled, if any chunk has arrived yet.
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.assembly.lock().frame.clone()
    }

    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes.load(Ordering::Relaxed)
    }

    pub fn rx_frames(&self) -> u64 {
        self.rx_frames.load(Ordering::Relaxed)
    }

    pub fn lost_chunks(&self) -> u64 {
        self.lost_chunks.load(Ordering::Relaxed)
    }

    pub fn last_frame_time(&self) -> Option<DateTime<Utc>> {
        *self.last_frame_time.lock()
    }

    /// The most recently sampled rates.
    pub fn rates(&self) -> Rates {
        let sample = self.rates.lock();
        Rates {
            bps: sample.bps,
            fps: sample.fps,
        }
    }

    pub(crate) fn add_rx_bytes(&self, n: u64) {
        self.rx_bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_lost_chunks(&self, n: u64) {
        self.lost_chunks.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_frame(&self, at: DateTime<Utc>) {
        self.rx_frames.fetch_add(1, Ordering::Relaxed);
        *self.last_frame_time.lock() = Some(at);
    }

    /// Turn the counter deltas since the previous sample into rates.
    ///
    /// A device that has never been sampled reports its full cumulative
    /// counts as the first delta.
    pub(crate) fn sample_rates(&self, interval: Duration) -> Rates {
        let rx_bytes = self.rx_bytes();
        let rx_frames = self.rx_frames();
        let secs = interval.as_secs_f64();

        let mut sample = self.rates.lock();
        let delta_bytes = rx_bytes.saturating_sub(sample.rx_bytes_last);
        let delta_frames = rx_frames.saturating_sub(sample.rx_frames_last);
        if secs > 0.0 {
            sample.bps = delta_bytes as f64 / secs;
            sample.fps = delta_frames as f64 / secs;
        }
        sample.rx_bytes_last = rx_bytes;
        sample.rx_frames_last = rx_frames;

        Rates {
            bps: sample.bps,
            fps: sample.fps,
        }
    }

    /// A serializable point-in-time view of this device.
    pub fn snapshot(&self) -> DeviceSnapshot {
        let rates = self.rates();
        let current_frame_seq = self.current_frame().map(|f| f.seq());
        DeviceSnapshot {
            id: self.id,
            first_seen: self.first_seen,
            last_frame_time: self.last_frame_time(),
            rx_bytes: self.rx_bytes(),
            rx_frames: self.rx_frames(),
            lost_chunks: self.lost_chunks(),
            bps: rates.bps,
            fps: rates.fps,
            current_frame_seq,
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("rx_bytes", &self.rx_bytes())
            .field("rx_frames", &self.rx_frames())
            .field("lost_chunks", &self.lost_chunks())
            .finish()
    }
}

/// Counters and rates for one device, as reported by the status API.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DeviceSnapshot {
    /// Source address of the device.
    #[schema(value_type = String, example = "192.168.168.55")]
    pub id: DeviceId,
    pub first_seen: DateTime<Utc>,
    pub last_frame_time: Option<DateTime<Utc>>,
    pub rx_bytes: u64,
    pub rx_frames: u64,
    pub lost_chunks: u64,
    /// Bytes per second over the last sampling interval.
    pub bps: f64,
    /// Frames per second over the last sampling interval.
    pub fps: f64,
    /// Chain position of the frame being assembled.
    pub current_frame_seq: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> Device {
        Device::new("10.0.0.2".parse().unwrap(), 0)
    }

    #[test]
    fn new_device_is_zeroed() {
        let d = device();
        assert_eq!(d.rx_bytes(), 0);
        assert_eq!(d.rx_frames(), 0);
        assert_eq!(d.lost_chunks(), 0);
        assert!(d.last_frame_time().is_none());
        assert!(d.current_frame().is_none());
        assert_eq!(d.rates(), Rates { bps: 0.0, fps: 0.0 });
    }

    #[test]
    fn sample_is_a_delta_not_cumulative() {
        let d = device();
        d.add_rx_bytes(4096);
        d.record_frame(Utc::now());

        let first = d.sample_rates(Duration::from_secs(1));
        assert_eq!(first.bps, 4096.0);
        assert_eq!(first.fps, 1.0);

        let second = d.sample_rates(Duration::from_secs(1));
        assert_eq!(second.bps, 0.0);
        assert_eq!(second.fps, 0.0);
        assert_eq!(d.rx_bytes(), 4096);
    }

    #[test]
    fn sample_scales_by_interval() {
        let d = device();
        d.add_rx_bytes(1000);
        let rates = d.sample_rates(Duration::from_millis(500));
        assert_eq!(rates.bps, 2000.0);
    }

    #[test]
    fn snapshot_reflects_counters() {
        let d = device();
        d.add_rx_bytes(10);
        d.add_lost_chunks(2);
        let snap = d.snapshot();
        assert_eq!(snap.id.to_string(), "10.0.0.2");
        assert_eq!(snap.rx_bytes, 10);
        assert_eq!(snap.lost_chunks, 2);
        assert_eq!(snap.current_frame_seq, None);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["id"], "10.0.0.2");
        assert_eq!(json["rx_bytes"], 10);
    }
}
