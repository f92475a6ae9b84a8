//! Callbridge: call engine functions by name from a host runtime
//!
//! The host runtime is garbage collected and owns its values; the dispatch
//! engine works on explicitly-managed generic values. This crate sits
//! between them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Host runtime                 │
//! └───────────────┬──────────────────────────────┘
//!                 │ invoke / bulk_load / inspect / enable_logging
//! ┌───────────────▼──────────────────────────────┐
//! │  module   - exports table, init, boundary    │
//! │  bridge   - dispatch, loading, introspection │
//! │  host     - handle <-> generic value marshal │
//! │  value    - generic values, ledger           │
//! └───────────────┬──────────────────────────────┘
//!                 │ call_by_name / load_from_file / self_describe
//! ┌───────────────▼──────────────────────────────┐
//! │               Dispatch engine                │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//!
//! Host handles are borrowed for one invocation and never stored. Every
//! generic value, native string and engine buffer created during an
//! invocation is owned by a scope in that invocation and released on every
//! exit path. The [`value::Ledger`] counts acquisitions and releases so this
//! can be checked.

pub mod bridge;
pub mod config;
pub mod engine;
pub mod host;
pub mod module;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod value;

pub use bridge::BridgeError;
pub use config::{BridgeConfig, Limits};
pub use engine::DispatchEngine;
pub use host::{generic_to_host, host_to_generic, ConversionError, HostRuntime};
pub use module::Module;
pub use value::{GenericValue, Ledger, Value, ValueKind};
