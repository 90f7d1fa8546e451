//! Thread-safe device registry.
//!
//! Devices are created by the ingest path on their first datagram and live
//! for the rest of the process. Readers (statistics, stream delivery, status
//! API) only ever look devices up; a read never creates one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use fc_core::config::StreamConfig;
use fc_core::{DeviceId, Error, Result};

use crate::device::{Device, DeviceSnapshot};
use crate::frame::FrameData;
use crate::stream::{self, FrameCursor};

/// Maps source addresses to devices.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: DashMap<DeviceId, Arc<Device>>,
    next_order: AtomicU64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the device for `id`, creating it on first sight.
    pub fn ensure(&self, id: DeviceId) -> Arc<Device> {
        if let Some(device) = self.devices.get(&id) {
            return Arc::clone(device.value());
        }

        let device = self.devices.entry(id).or_insert_with(|| {
            let order = self.next_order.fetch_add(1, Ordering::Relaxed);
            tracing::info!(device = %id, "New device");
            Arc::new(Device::new(id, order))
        });
        Arc::clone(device.value())
    }

    /// Look up an existing device.
    pub fn get(&self, id: DeviceId) -> Result<Arc<Device>> {
        self.devices
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::not_found("Device", id))
    }

    /// The earliest registered device, used for the `default` alias.
    pub fn first(&self) -> Option<Arc<Device>> {
        self.devices
            .iter()
            .min_by_key(|entry| entry.value().order())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// All devices in registration order.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        let mut devices: Vec<_> = self
            .devices
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        devices.sort_by_key(|d| d.order());
        devices
    }

    /// Identifiers of all devices in registration order.
    pub fn list(&self) -> Vec<DeviceId> {
        self.devices().iter().map(|d| d.id()).collect()
    }

    /// Counters and rates for one device.
    pub fn snapshot(&self, id: DeviceId) -> Result<DeviceSnapshot> {
        self.get(id).map(|d| d.snapshot())
    }

    /// Counters and rates for every device in registration order.
    pub fn snapshots(&self) -> Vec<DeviceSnapshot> {
        self.devices().iter().map(|d| d.snapshot()).collect()
    }

    /// Open a continuous stream positioned at the device's in-progress frame.
    pub fn open_stream(&self, id: DeviceId, config: &StreamConfig) -> Result<FrameCursor> {
        FrameCursor::open(self.get(id)?, config)
    }

    /// Wait for the device's next undamaged frame.
    pub async fn snapshot_frame(&self, id: DeviceId, config: &StreamConfig) -> Result<FrameData> {
        stream::snapshot(self.get(id)?, config).await
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
