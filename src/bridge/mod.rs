//! Bridge operations
//!
//! One function per host-callable operation. Each runs synchronously to
//! completion and owns every allocation it makes through scoped values, so
//! all exit paths release exactly what was acquired before the error is
//! returned.

mod inspect;
mod invoke;
mod load;
mod logs;

pub use inspect::inspect;
pub use invoke::invoke;
pub use load::bulk_load;
pub use logs::enable_logging;

use callbridge_log::LogError;
use thiserror::Error;

use crate::host::{ConversionError, HostError};

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid number of arguments")]
    Arity,

    #[error("allocation failed: {0}")]
    Allocation(&'static str),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("invalid name: {0}")]
    NameDecode(String),

    #[error("{what} exceeds capacity: {len} > {capacity}")]
    CapacityExceeded {
        what: &'static str,
        len: usize,
        capacity: usize,
    },

    #[error("{0}")]
    CallFailure(String),

    #[error("short write: {written} of {requested} bytes accepted")]
    WriteShortfall { requested: usize, written: usize },

    #[error(transparent)]
    Host(#[from] HostError),
}

impl From<LogError> for BridgeError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::WriteShortfall { requested, written } => {
                BridgeError::WriteShortfall { requested, written }
            }
            other => BridgeError::CallFailure(other.to_string()),
        }
    }
}

/// `Vec::with_capacity` that reports failure instead of aborting.
pub(crate) fn try_buffer<T>(len: usize, what: &'static str) -> Result<Vec<T>, BridgeError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| BridgeError::Allocation(what))?;
    Ok(buf)
}
