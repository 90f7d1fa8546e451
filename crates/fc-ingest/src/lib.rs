//! fc-ingest: multicast ingest, frame reassembly and frame delivery.
//!
//! Datagrams flow from the [`receiver`] through [`chunk`] decoding into the
//! [`reassembler`], which builds each device's [`frame`] chain. The
//! [`stream`] module hands completed frames to any number of independent
//! readers, and [`stats`] turns the device counters into rates.

pub mod chunk;
pub mod device;
pub mod frame;
pub mod keepalive;
pub mod reassembler;
pub mod receiver;
pub mod registry;
pub mod stats;
pub mod stream;

pub use chunk::{Chunk, DecodeError};
pub use device::{Device, DeviceSnapshot, Rates};
pub use frame::{CompletedFrame, Frame, FrameData};
pub use reassembler::{Accepted, Reassembler};
pub use registry::DeviceRegistry;
pub use stream::FrameCursor;
