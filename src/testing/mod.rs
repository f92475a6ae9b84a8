//! In-memory implementations of both boundaries.
//!
//! Built for unit tests and with the `testing` feature.
//!
//! [`MemoryHost`] stands in for the host runtime and [`MemoryEngine`] for the
//! dispatch engine, so the bridge can be driven end to end without either.

mod engine;
mod host;

pub use engine::{LoadRecord, MemoryEngine, NativeFn};
pub use host::{Handle, MemoryHost};
