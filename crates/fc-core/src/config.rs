//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the HTTP server, multicast ingest, keepalive responder,
//! stream delivery and statistics. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub keepalive: KeepaliveConfig,
    pub stream: StreamConfig,
    pub stats: StatsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file, failing on a missing or malformed file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if !self.ingest.group.is_multicast() {
            warnings.push(format!(
                "ingest.group {} is not a multicast address",
                self.ingest.group
            ));
        }

        if self.ingest.chunk_size == 0 {
            warnings.push("ingest.chunk_size is 0; every chunk will overwrite offset 0".into());
        }

        if self.ingest.max_frame_size < self.ingest.chunk_size {
            warnings.push(format!(
                "ingest.max_frame_size ({}) is smaller than one chunk ({})",
                self.ingest.max_frame_size, self.ingest.chunk_size
            ));
        }

        let addressable = self
            .ingest
            .chunk_size
            .checked_mul(crate::MAX_CHUNKS_PER_FRAME);
        if addressable.map_or(true, |n| n > self.ingest.max_frame_size) {
            warnings.push(format!(
                "ingest.chunk_size ({}) x {} chunks exceeds max_frame_size ({}); high-index chunks will be dropped",
                self.ingest.chunk_size,
                crate::MAX_CHUNKS_PER_FRAME,
                self.ingest.max_frame_size
            ));
        }

        if self.ingest.max_datagram_size <= crate::CHUNK_HEADER_LEN {
            warnings.push(format!(
                "ingest.max_datagram_size ({}) leaves no room for chunk payload",
                self.ingest.max_datagram_size
            ));
        }

        if self.keepalive.enabled && self.keepalive.port == self.ingest.port {
            warnings.push(format!(
                "keepalive.port and ingest.port are both {}",
                self.ingest.port
            ));
        }

        if self.stream.boundary.is_empty()
            || self
                .stream
                .boundary
                .chars()
                .any(|c| c.is_whitespace() || c.is_control())
        {
            warnings.push(format!(
                "stream.boundary '{}' is not a valid multipart boundary",
                self.stream.boundary
            ));
        }

        if self.stream.max_reader_lag == 0 {
            warnings.push(
                "stream.max_reader_lag is 0; readers will skip every frame they fall behind on"
                    .into(),
            );
        }

        if self.stats.interval_ms == 0 {
            warnings.push("stats.interval_ms is 0; statistics will be disabled".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Multicast ingest and frame reassembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Multicast group the extenders transmit to.
    pub group: Ipv4Addr,
    pub port: u16,
    /// Local interface used to join the group (`0.0.0.0` lets the kernel pick).
    pub interface: Ipv4Addr,
    /// Receive buffer per datagram; longer datagrams are truncated.
    pub max_datagram_size: usize,
    /// Requested `SO_RCVBUF` size.
    pub recv_buffer_size: usize,
    /// Payload bytes carried by every chunk except the last of a frame.
    pub chunk_size: usize,
    /// Upper bound on a reassembled frame; chunks past it are rejected.
    pub max_frame_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            group: Ipv4Addr::new(226, 2, 2, 2),
            port: 2068,
            interface: Ipv4Addr::UNSPECIFIED,
            max_datagram_size: 1600,
            recv_buffer_size: 2 * 1024 * 1024,
            chunk_size: 1020,
            max_frame_size: 2 * 1024 * 1024,
        }
    }
}

/// Which control blob the keepalive responder answers with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlBlob {
    V1,
    #[default]
    V2,
}

/// Keepalive responder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    pub enabled: bool,
    pub port: u16,
    pub blob: ControlBlob,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 48689,
            blob: ControlBlob::default(),
        }
    }
}

/// Stream delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Multipart boundary token (without the leading `--`).
    pub boundary: String,
    /// How many frames a reader may trail the device's in-progress frame
    /// before it is moved forward to it.
    pub max_reader_lag: u64,
    /// Give up waiting for a frame after this many seconds (`None` waits
    /// indefinitely).
    pub frame_timeout_secs: Option<u64>,
}

impl StreamConfig {
    /// Completed frames each device keeps alive so readers within
    /// `max_reader_lag` can still walk forward.
    pub fn retained_frames(&self) -> usize {
        usize::try_from(self.max_reader_lag).unwrap_or(usize::MAX)
    }

    /// The frame wait timeout as a [`Duration`].
    pub fn frame_timeout(&self) -> Option<Duration> {
        self.frame_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            boundary: "myboundary".into(),
            max_reader_lag: 64,
            frame_timeout_secs: None,
        }
    }
}

/// Statistics sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub interval_ms: u64,
}

impl StatsConfig {
    /// The sampling interval, or `None` when sampling is disabled.
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.ingest.group, Ipv4Addr::new(226, 2, 2, 2));
        assert_eq!(cfg.ingest.port, 2068);
        assert_eq!(cfg.ingest.chunk_size, 1020);
        assert_eq!(cfg.ingest.max_frame_size, 2 * 1024 * 1024);
        assert_eq!(cfg.keepalive.port, 48689);
        assert_eq!(cfg.keepalive.blob, ControlBlob::V2);
        assert_eq!(cfg.stream.boundary, "myboundary");
        assert!(cfg.stream.frame_timeout().is_none());
        assert_eq!(cfg.stats.interval(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{
            "server": {"port": 9090},
            "ingest": {"group": "239.1.2.3", "chunk_size": 512},
            "keepalive": {"blob": "v1"},
            "stream": {"frame_timeout_secs": 5}
        }"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.ingest.group, Ipv4Addr::new(239, 1, 2, 3));
        assert_eq!(cfg.ingest.chunk_size, 512);
        assert_eq!(cfg.ingest.port, 2068);
        assert_eq!(cfg.keepalive.blob, ControlBlob::V1);
        assert_eq!(cfg.stream.frame_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.stream.max_reader_lag, 64);
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/framecast.json")));
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framecast.json");
        std::fs::write(&path, r#"{"ingest": {"port": 3000}}"#).unwrap();
        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.ingest.port, 3000);
    }

    #[test]
    fn unicast_group_warns() {
        let mut cfg = Config::default();
        cfg.ingest.group = Ipv4Addr::new(10, 0, 0, 1);
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("not a multicast")));
    }

    #[test]
    fn tiny_frame_limit_warns() {
        let mut cfg = Config::default();
        cfg.ingest.max_frame_size = 100;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("max_frame_size")));
    }

    #[test]
    fn oversized_chunk_size_warns_without_overflow() {
        let mut cfg = Config::default();
        cfg.ingest.chunk_size = usize::MAX / 2;
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.contains("ingest.chunk_size") && w.contains("high-index")));

        cfg.ingest.chunk_size = 1020;
        cfg.ingest.max_frame_size = 1020 * 255;
        assert!(cfg.validate().iter().any(|w| w.contains("high-index")));
    }

    #[test]
    fn retention_follows_reader_lag() {
        let mut cfg = StreamConfig::default();
        assert_eq!(cfg.retained_frames(), 64);
        cfg.max_reader_lag = 3;
        assert_eq!(cfg.retained_frames(), 3);
    }

    #[test]
    fn bad_boundary_warns() {
        let mut cfg = Config::default();
        cfg.stream.boundary = "my boundary".into();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("boundary")));
    }

    #[test]
    fn zero_stats_interval_disables_sampling() {
        let mut cfg = Config::default();
        cfg.stats.interval_ms = 0;
        assert!(cfg.stats.interval().is_none());
        assert!(cfg.validate().iter().any(|w| w.contains("stats.interval_ms")));
    }

    #[test]
    fn port_clash_warns() {
        let mut cfg = Config::default();
        cfg.keepalive.port = cfg.ingest.port;
        assert!(cfg.validate().iter().any(|w| w.contains("keepalive.port")));
    }
}
