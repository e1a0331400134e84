//! # Capability Provider
//!
//! Resolution of injected handler parameters. The router itself has no
//! dependency-injection container; it asks a [`ServiceProvider`] for
//! non-request parameters by key at materialization time. [`ServiceMap`] is
//! the bundled thread-safe implementation for applications and tests.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Type-erased shared service handle
pub type ServiceRef = Arc<dyn Any + Send + Sync>;

/// Resolves injected parameters by key at dispatch time
pub trait ServiceProvider: Send + Sync {
    /// Look up a service; `None` makes materialization fail with
    /// [`crate::Error::ServiceNotFound`]
    fn resolve(&self, key: &str) -> Option<ServiceRef>;
}

/// Thread-safe key→service store
///
/// Stores arbitrary shared values that handlers receive as injected
/// arguments. Cloning is cheap; all clones share the same storage.
#[derive(Clone, Default)]
pub struct ServiceMap {
    /// Type-erased storage for keyed services
    data: Arc<RwLock<HashMap<String, ServiceRef>>>,
}

impl ServiceMap {
    /// Create an empty service map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under a key, overwriting any previous entry
    pub fn register<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        let mut data = self.data.write().expect("Service lock poisoned");
        data.insert(key.into(), Arc::new(value));
    }

    /// Store an already-shared value under a key
    pub fn register_arc(&self, key: impl Into<String>, value: ServiceRef) {
        let mut data = self.data.write().expect("Service lock poisoned");
        data.insert(key.into(), value);
    }

    /// Get a typed handle by key
    ///
    /// Returns `None` if the key doesn't exist or the type doesn't match.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let data = self.data.read().expect("Service lock poisoned");
        data.get(key).cloned()?.downcast::<T>().ok()
    }

    /// Check if a key exists
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let data = self.data.read().expect("Service lock poisoned");
        data.contains_key(key)
    }

    /// Remove a service by key
    pub fn remove(&self, key: &str) -> bool {
        let mut data = self.data.write().expect("Service lock poisoned");
        data.remove(key).is_some()
    }

    /// Number of registered services
    #[must_use]
    pub fn len(&self) -> usize {
        let data = self.data.read().expect("Service lock poisoned");
        data.len()
    }

    /// Check if no services are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ServiceProvider for ServiceMap {
    fn resolve(&self, key: &str) -> Option<ServiceRef> {
        let data = self.data.read().expect("Service lock poisoned");
        data.get(key).cloned()
    }
}
