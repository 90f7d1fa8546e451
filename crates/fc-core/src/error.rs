//! Unified error type for framecast.
//!
//! Every crate funnels its failures into [`Error`], which carries enough
//! context for HTTP handlers to derive a status code via [`Error::http_status`].

use std::fmt;
use std::time::Duration;

/// Unified error type covering all failure modes in framecast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "device").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The device exists but has not completed a single frame yet.
    #[error("No frames received from {0}")]
    NoFrames(String),

    /// Waiting on an upstream frame exceeded the configured limit.
    #[error("Timed out after {0:?} waiting for a frame")]
    Timeout(Duration),

    /// The server cannot serve the request right now, e.g. while shutting down.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Request or configuration data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::NoFrames(_) => 404,
            Error::Timeout(_) => 504,
            Error::Unavailable(_) => 503,
            Error::Validation(_) => 400,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::NoFrames`].
    pub fn no_frames(device: impl fmt::Display) -> Self {
        Error::NoFrames(device.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
