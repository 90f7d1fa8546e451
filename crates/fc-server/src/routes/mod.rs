//! Route handlers for the HTTP surface.

pub mod devices;
pub mod health;
pub mod index;
pub mod stream;
