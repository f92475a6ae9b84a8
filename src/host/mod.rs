//! Host Runtime Boundary
//!
//! The host is a garbage-collected runtime that owns its own values. The
//! bridge only ever *borrows* host handles for the duration of one
//! invocation; it never stores them.
//!
//! - [`HostRuntime`] - primitives the bridge needs from the host
//! - [`CallbackInfo`] - argument access for one invocation
//! - [`marshal`] - conversion between host handles and generic values

pub mod marshal;

pub use marshal::{
    generic_to_host, generic_to_host_with_limits, host_to_generic, host_to_generic_with_limits,
    MAX_DEPTH,
};

use std::fmt;
use thiserror::Error;

use crate::value::ValueKind;

/// A failed host primitive (the host reports these as a non-ok status).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("host runtime error: {0}")]
pub struct HostError(pub String);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("unsupported host value kind: {0}")]
    UnsupportedHostKind(&'static str),

    #[error("unsupported value kind: {0}")]
    UnsupportedValueKind(ValueKind),

    #[error("value nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("value has more than {0} nodes")]
    TooManyNodes(usize),

    #[error("string contains an interior NUL byte at {0}")]
    InteriorNul(usize),

    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// A host value, one level deep. Compound values refer to their children
/// by handle.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue<H> {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i64),
    String(String),
    Array(Vec<H>),
    Object(Vec<(String, H)>),
    /// A callable, identified by the name it resolves to in the engine.
    Function(String),
    Symbol,
}

impl<H> HostValue<H> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Number(_) => "number",
            HostValue::BigInt(_) => "bigint",
            HostValue::String(_) => "string",
            HostValue::Array(_) => "array",
            HostValue::Object(_) => "object",
            HostValue::Function(_) => "function",
            HostValue::Symbol => "symbol",
        }
    }
}

/// Primitives provided by the host runtime.
///
/// Handles are borrowed references into host-owned memory, valid only for
/// the current invocation. Every `create*` allocation is owned by the host.
pub trait HostRuntime {
    type Handle: Copy + fmt::Debug;

    /// Inspect a handle one level deep.
    fn classify(&self, handle: Self::Handle) -> Result<HostValue<Self::Handle>, HostError>;

    /// Allocate a new host value.
    fn create(&mut self, value: HostValue<Self::Handle>) -> Result<Self::Handle, HostError>;

    /// Byte length of a string handle's UTF-8 encoding, without terminator.
    fn utf8_len(&self, handle: Self::Handle) -> Result<usize, HostError>;

    /// Copy a string handle's UTF-8 bytes into `buf`, truncating to leave
    /// room for a NUL terminator. Returns the bytes written, excluding NUL.
    fn read_utf8(&self, handle: Self::Handle, buf: &mut [u8]) -> Result<usize, HostError>;

    /// Convert any value to a string value using the host's own rules.
    fn coerce_to_string(&mut self, handle: Self::Handle) -> Result<Self::Handle, HostError>;

    fn array_len(&self, handle: Self::Handle) -> Result<u32, HostError>;

    fn array_get(&self, handle: Self::Handle, index: u32) -> Result<Self::Handle, HostError>;

    /// Raise an error in the host. The current entry point returns no value.
    fn throw_error(&mut self, message: &str);
}

/// Arguments of one invocation.
pub trait CallbackInfo<H> {
    fn argc(&self) -> usize;

    fn arg(&self, index: usize) -> Option<H>;
}

impl<H: Copy> CallbackInfo<H> for [H] {
    fn argc(&self) -> usize {
        self.len()
    }

    fn arg(&self, index: usize) -> Option<H> {
        self.get(index).copied()
    }
}

impl<H: Copy> CallbackInfo<H> for Vec<H> {
    fn argc(&self) -> usize {
        self.len()
    }

    fn arg(&self, index: usize) -> Option<H> {
        self.get(index).copied()
    }
}
