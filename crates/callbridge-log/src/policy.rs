//! Policy lifecycle: create, write, flush, destroy.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::stdio::StdioFactory;
use crate::LogError;

/// Discriminator naming a backend kind (e.g. `"stdio"`).
pub type PolicyTag = &'static str;

/// Backend-specific construction data, checked by the factory that receives it.
pub type PolicyCtor = Box<dyn Any + Send>;

/// Backend-private state of a live policy.
pub trait LogBackend: Send {
    /// Write the whole buffer or fail. Partial writes are errors.
    fn write(&mut self, buffer: &[u8]) -> Result<(), LogError>;

    fn flush(&mut self) -> Result<(), LogError>;
}

/// Builds backend state for one tag.
pub trait PolicyFactory: Send + Sync {
    fn tag(&self) -> PolicyTag;

    fn create(&self, ctor: PolicyCtor) -> Result<Box<dyn LogBackend>, LogError>;
}

/// Tag to factory map. Backends are added with [`PolicyRegistry::register`].
#[derive(Default)]
pub struct PolicyRegistry {
    factories: HashMap<PolicyTag, Box<dyn PolicyFactory>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in stdio backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(StdioFactory);
        registry
    }

    /// Register a factory under its tag, replacing any previous one.
    pub fn register<F: PolicyFactory + 'static>(&mut self, factory: F) -> &mut Self {
        self.factories.insert(factory.tag(), Box::new(factory));
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Create a policy for `tag`. On failure no backend state exists.
    pub fn create(&self, tag: &str, ctor: PolicyCtor) -> Result<LogPolicy, LogError> {
        let (tag, factory) = self
            .factories
            .get_key_value(tag)
            .ok_or_else(|| LogError::UnknownTag(tag.to_string()))?;
        let backend = factory.create(ctor)?;
        Ok(LogPolicy {
            tag: *tag,
            backend: Some(backend),
        })
    }
}

impl fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.factories.keys().collect();
        tags.sort();
        f.debug_struct("PolicyRegistry").field("tags", &tags).finish()
    }
}

/// A log destination bound to one backend.
///
/// The backend state lives until [`LogPolicy::destroy`] or drop, whichever
/// comes first. Destroying twice is a no-op.
pub struct LogPolicy {
    tag: PolicyTag,
    backend: Option<Box<dyn LogBackend>>,
}

impl LogPolicy {
    /// Wrap an already-built backend. Used by factories outside a registry.
    pub fn from_backend(tag: PolicyTag, backend: Box<dyn LogBackend>) -> Self {
        Self {
            tag,
            backend: Some(backend),
        }
    }

    pub fn tag(&self) -> PolicyTag {
        self.tag
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    pub fn write(&mut self, buffer: &[u8]) -> Result<(), LogError> {
        self.backend_mut()?.write(buffer)
    }

    pub fn flush(&mut self) -> Result<(), LogError> {
        self.backend_mut()?.flush()
    }

    /// Release backend state. Safe to call on an already destroyed policy.
    pub fn destroy(&mut self) {
        self.backend.take();
    }

    fn backend_mut(&mut self) -> Result<&mut (dyn LogBackend + 'static), LogError> {
        self.backend
            .as_deref_mut()
            .ok_or(LogError::Uninitialized(self.tag))
    }
}

impl Drop for LogPolicy {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for LogPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogPolicy")
            .field("tag", &self.tag)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct MemoryBackend {
        sink: Arc<Mutex<Vec<u8>>>,
        drops: Arc<AtomicUsize>,
    }

    impl LogBackend for MemoryBackend {
        fn write(&mut self, buffer: &[u8]) -> Result<(), LogError> {
            self.sink.lock().unwrap().extend_from_slice(buffer);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), LogError> {
            Ok(())
        }
    }

    impl Drop for MemoryBackend {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct MemoryCtor {
        sink: Arc<Mutex<Vec<u8>>>,
        drops: Arc<AtomicUsize>,
    }

    struct MemoryFactory;

    impl PolicyFactory for MemoryFactory {
        fn tag(&self) -> PolicyTag {
            "memory"
        }

        fn create(&self, ctor: PolicyCtor) -> Result<Box<dyn LogBackend>, LogError> {
            let ctor = ctor
                .downcast::<MemoryCtor>()
                .map_err(|_| LogError::InvalidCtor(self.tag()))?;
            Ok(Box::new(MemoryBackend {
                sink: ctor.sink,
                drops: ctor.drops,
            }))
        }
    }

    fn memory_ctor() -> (PolicyCtor, Arc<Mutex<Vec<u8>>>, Arc<AtomicUsize>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let drops = Arc::new(AtomicUsize::new(0));
        let ctor = Box::new(MemoryCtor {
            sink: sink.clone(),
            drops: drops.clone(),
        });
        (ctor, sink, drops)
    }

    #[test]
    fn registered_backend_is_selected_by_tag() {
        let mut registry = PolicyRegistry::with_defaults();
        registry.register(MemoryFactory);
        let (ctor, sink, _) = memory_ctor();

        let mut policy = registry.create("memory", ctor).expect("create");
        assert_eq!(policy.tag(), "memory");
        policy.write(b"abc").expect("write");
        policy.flush().expect("flush");

        assert_eq!(sink.lock().unwrap().as_slice(), b"abc");
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let registry = PolicyRegistry::with_defaults();
        let (ctor, _, _) = memory_ctor();

        let err = registry.create("syslog", ctor).expect_err("expected error");
        assert!(matches!(err, LogError::UnknownTag(tag) if tag == "syslog"));
    }

    #[test]
    fn mismatched_ctor_is_rejected() {
        let mut registry = PolicyRegistry::new();
        registry.register(MemoryFactory);

        let err = registry
            .create("memory", Box::new(42u32))
            .expect_err("expected error");
        assert!(matches!(err, LogError::InvalidCtor("memory")));
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut registry = PolicyRegistry::new();
        registry.register(MemoryFactory);
        let (ctor, _, drops) = memory_ctor();

        let mut policy = registry.create("memory", ctor).expect("create");
        policy.destroy();
        policy.destroy();
        drop(policy);

        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroyed_policy_rejects_io() {
        let mut registry = PolicyRegistry::new();
        registry.register(MemoryFactory);
        let (ctor, _, _) = memory_ctor();

        let mut policy = registry.create("memory", ctor).expect("create");
        policy.destroy();

        assert!(!policy.is_initialized());
        assert!(matches!(policy.write(b"x"), Err(LogError::Uninitialized("memory"))));
        assert!(matches!(policy.flush(), Err(LogError::Uninitialized("memory"))));
    }
}
