//! fc-core: shared types, errors and configuration.
//!
//! This crate is the foundational dependency for all other fc-* crates,
//! providing the device identifier, a unified error type and the
//! application configuration.

pub mod config;
pub mod error;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::DeviceId;

/// Size of the fixed chunk header that precedes every datagram payload.
pub const CHUNK_HEADER_LEN: usize = 4;

/// Number of distinct chunk indices a frame can carry; only the low header
/// byte contributes to the index.
pub const MAX_CHUNKS_PER_FRAME: usize = 256;
