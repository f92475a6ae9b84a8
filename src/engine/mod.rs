//! Dispatch Engine Boundary
//!
//! The engine resolves names to callables, executes them, loads sources and
//! describes itself. It is an external collaborator: this module only fixes
//! the interface the bridge calls and the memory it hands across.

mod alloc;

pub use alloc::{AllocBuf, Allocator, NativeString, StdAllocator};

use callbridge_log::LogPolicy;
use thiserror::Error;

use crate::value::{GenericValue, Ledger};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine initialization failed: {0}")]
    Initialization(String),

    #[error("function not found: {0}")]
    FunctionNotFound(String),

    #[error("call to '{name}' failed: {message}")]
    CallFailed { name: String, message: String },

    #[error("log destination rejected: {0}")]
    Log(String),
}

/// The multi-language dispatch engine.
pub trait DispatchEngine {
    /// One-time startup. Called once, before any other method.
    fn initialize(&mut self) -> Result<(), EngineError>;

    /// The value domain generic values are allocated in.
    fn ledger(&self) -> &Ledger;

    /// Call `name` with borrowed arguments.
    ///
    /// Arguments stay owned by the caller. A returned value is owned by the
    /// caller; `None` means the callable produced no value.
    fn call_by_name(
        &mut self,
        name: &str,
        args: &[GenericValue],
    ) -> Result<Option<GenericValue>, EngineError>;

    /// Load source files under a language tag. Returns 0 on success.
    fn load_from_file(&mut self, tag: &str, paths: &[NativeString]) -> i32;

    /// Describe loaded state. The returned buffer holds a NUL-terminated
    /// string allocated through `allocator`.
    fn self_describe(&mut self, allocator: &dyn Allocator) -> Option<AllocBuf>;

    /// Route the engine's diagnostic output to `policy`.
    fn attach_log(&mut self, policy: LogPolicy) -> Result<(), EngineError>;
}
