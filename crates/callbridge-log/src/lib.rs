//! Log policies for the callbridge runtime.
//!
//! A [`LogPolicy`] is a destination for diagnostic output. Each destination
//! kind is a backend identified by a [`PolicyTag`] and built by a
//! [`PolicyFactory`] registered in a [`PolicyRegistry`]:
//!
//! ```text
//! registry.create("stdio", ctor) ──► PolicyFactory::create ──► Box<dyn LogBackend>
//!                                                                  │
//!            LogPolicy { tag, backend } ◄──────────────────────────┘
//!              write / flush / destroy
//! ```
//!
//! Adding a destination means registering another factory; the creation site
//! never changes.
//!
//! # Example
//!
//! ```
//! use callbridge_log::{PolicyRegistry, StdioCtor, STDIO_TAG};
//!
//! let registry = PolicyRegistry::with_defaults();
//! let mut policy = registry.create(STDIO_TAG, Box::new(StdioCtor::stdout())).unwrap();
//! policy.write(b"hello\n").unwrap();
//! policy.flush().unwrap();
//! policy.destroy();
//! ```

mod logger;
mod policy;
mod stdio;

pub use logger::{Level, Logger};
pub use policy::{LogBackend, LogPolicy, PolicyCtor, PolicyFactory, PolicyRegistry, PolicyTag};
pub use stdio::{SharedStream, StdioBackend, StdioCtor, StdioFactory, STDIO_TAG};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("no log backend registered for tag '{0}'")]
    UnknownTag(String),

    #[error("invalid constructor data for log backend '{0}'")]
    InvalidCtor(PolicyTag),

    #[error("log policy '{0}' is not initialized")]
    Uninitialized(PolicyTag),

    #[error("short write: {written} of {requested} bytes accepted")]
    WriteShortfall { requested: usize, written: usize },

    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}
