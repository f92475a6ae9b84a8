//! Memory handed across the engine boundary.

use std::ffi::{CStr, CString, NulError};
use std::fmt;

use crate::value::{Ledger, Resource, Token};

/// Allocation strategy passed to the engine.
pub trait Allocator {
    /// Allocate `len` zeroed bytes. `None` when the allocation fails.
    fn allocate(&self, len: usize) -> Option<AllocBuf>;

    /// Return a buffer obtained from [`Allocator::allocate`].
    fn free(&self, buf: AllocBuf);
}

/// A buffer allocated through an [`Allocator`].
pub struct AllocBuf {
    bytes: Vec<u8>,
    _token: Token,
}

impl AllocBuf {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl fmt::Debug for AllocBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocBuf").field("len", &self.len()).finish()
    }
}

/// Pass-through to the global allocator.
pub struct StdAllocator {
    ledger: Ledger,
    _token: Token,
}

impl StdAllocator {
    pub fn new(ledger: &Ledger) -> Self {
        Self {
            ledger: ledger.clone(),
            _token: ledger.acquire(Resource::Allocator),
        }
    }
}

impl Allocator for StdAllocator {
    fn allocate(&self, len: usize) -> Option<AllocBuf> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len).ok()?;
        bytes.resize(len, 0);
        Some(AllocBuf {
            bytes,
            _token: self.ledger.acquire(Resource::Buffer),
        })
    }

    fn free(&self, buf: AllocBuf) {
        drop(buf);
    }
}

/// A NUL-terminated copy of a host string, owned by the bridge.
pub struct NativeString {
    inner: CString,
    _token: Token,
}

impl NativeString {
    pub fn new(ledger: &Ledger, bytes: Vec<u8>) -> Result<Self, NulError> {
        let inner = CString::new(bytes)?;
        Ok(Self {
            inner,
            _token: ledger.acquire(Resource::NativeString),
        })
    }

    pub fn as_c_str(&self) -> &CStr {
        &self.inner
    }

    /// The string without its terminator. Empty if it is not UTF-8.
    pub fn as_str(&self) -> &str {
        self.inner.to_str().unwrap_or_default()
    }
}

impl fmt::Debug for NativeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}
