//! Shared application context.
//!
//! [`AppContext`] is handed to every route handler via Axum state. It only
//! holds `Arc`s, so cloning it per request is cheap.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use fc_core::config::Config;
use fc_core::{DeviceId, Error, Result};
use fc_ingest::DeviceRegistry;

/// Path segment that resolves to the first device seen.
pub const DEFAULT_DEVICE: &str = "default";

/// Application context shared by all request handlers.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration.
    pub config: Arc<Config>,
    /// Devices discovered by the ingest path.
    pub registry: Arc<DeviceRegistry>,
    /// Cancelled on shutdown; ends open streams so the server can drain.
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(config: Arc<Config>, registry: Arc<DeviceRegistry>) -> Self {
        Self {
            config,
            registry,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Resolve a device path segment to a known device.
    ///
    /// `default` names the earliest registered device. Anything that is not a
    /// registered address, including strings that are not addresses at all,
    /// is a not-found error; resolution never creates a device.
    pub fn resolve_device(&self, segment: &str) -> Result<DeviceId> {
        if segment == DEFAULT_DEVICE {
            return self
                .registry
                .first()
                .map(|d| d.id())
                .ok_or_else(|| Error::not_found("Device", segment));
        }

        let id: DeviceId = segment
            .parse()
            .map_err(|_| Error::not_found("Device", segment))?;
        self.registry.get(id).map(|d| d.id())
    }
}
