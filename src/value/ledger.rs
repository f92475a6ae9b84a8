//! Allocation accounting for the explicitly-managed domain.
//!
//! Every generic value, native string copy, engine buffer and allocator holds a
//! [`Token`] from a [`Ledger`]. The token is released exactly once, when its
//! owner is dropped, so `outstanding() == 0` after an invocation proves that
//! nothing leaked and nothing was released twice.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Value,
    NativeString,
    Buffer,
    Allocator,
}

#[derive(Default)]
struct Counter {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Counter {
    fn outstanding(&self) -> usize {
        self.acquired.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct LedgerInner {
    values: Counter,
    strings: Counter,
    buffers: Counter,
    allocators: Counter,
}

impl LedgerInner {
    fn counter(&self, resource: Resource) -> &Counter {
        match resource {
            Resource::Value => &self.values,
            Resource::NativeString => &self.strings,
            Resource::Buffer => &self.buffers,
            Resource::Allocator => &self.allocators,
        }
    }
}

/// Shared acquire/release counters. Cloning shares the counters.
#[derive(Clone, Default)]
pub struct Ledger {
    inner: Arc<LedgerInner>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, resource: Resource) -> Token {
        self.inner
            .counter(resource)
            .acquired
            .fetch_add(1, Ordering::SeqCst);
        Token {
            ledger: self.clone(),
            resource,
        }
    }

    pub fn acquired(&self, resource: Resource) -> usize {
        self.inner.counter(resource).acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self, resource: Resource) -> usize {
        self.inner.counter(resource).released.load(Ordering::SeqCst)
    }

    /// Live allocations of one kind.
    pub fn live(&self, resource: Resource) -> usize {
        self.inner.counter(resource).outstanding()
    }

    /// Live allocations of every kind.
    pub fn outstanding(&self) -> usize {
        [
            Resource::Value,
            Resource::NativeString,
            Resource::Buffer,
            Resource::Allocator,
        ]
        .iter()
        .map(|r| self.live(*r))
        .sum()
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("values", &self.live(Resource::Value))
            .field("strings", &self.live(Resource::NativeString))
            .field("buffers", &self.live(Resource::Buffer))
            .field("allocators", &self.live(Resource::Allocator))
            .finish()
    }
}

/// Proof of one live allocation. Not `Clone`; dropping it releases.
pub struct Token {
    ledger: Ledger,
    resource: Resource,
}

impl Token {
    pub fn resource(&self) -> Resource {
        self.resource
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        self.ledger
            .inner
            .counter(self.resource)
            .released
            .fetch_add(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.resource).finish()
    }
}
