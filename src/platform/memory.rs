//! In-process storage and termination signal
//!
//! Used on native targets and throughout the test suite. `MemoryStore` can be
//! given a byte quota or put in disabled mode to reproduce the failures a
//! browser's localStorage produces (full quota, private browsing).

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{KeyValueStore, StorageError, SubscriptionId, TerminationSignal};

/// String map implementing [`KeyValueStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<BTreeMap<String, String>>,
    /// Max total bytes (keys + values), `None` for unlimited
    quota: Option<usize>,
    /// Every operation fails with `Unavailable`
    disabled: bool,
    /// Number of get/set/remove calls that reached this store
    ops: Cell<usize>,
}

impl MemoryStore {
    /// Create an empty, unlimited store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes pushing it past `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Create a store that refuses every operation
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Raw read that bypasses accounting (for inspection)
    pub fn peek(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    /// Seed a value without counting it as an operation
    pub fn seed(&self, key: &str, value: &str) {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Check if the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Remove every key
    pub fn clear(&self) {
        self.items.borrow_mut().clear();
    }

    /// How many get/set/remove calls have reached the store
    pub fn op_count(&self) -> usize {
        self.ops.get()
    }

    fn enter(&self) -> Result<(), StorageError> {
        self.ops.set(self.ops.get() + 1);
        if self.disabled {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }

    /// Total bytes after `key` is set to `value`
    fn size_with(&self, key: &str, value: &str) -> usize {
        let items = self.items.borrow();
        let others: usize = items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        others + key.len() + value.len()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.enter()?;
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.enter()?;
        if let Some(limit) = self.quota {
            if self.size_with(key, value) > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    limit,
                });
            }
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.enter()?;
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Manually fired termination signal
#[derive(Default)]
pub struct UnloadRegistry {
    handlers: RefCell<BTreeMap<SubscriptionId, Rc<dyn Fn()>>>,
    next_id: Cell<u64>,
}

impl UnloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    /// Check whether `id` is still registered
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.handlers.borrow().contains_key(&id)
    }

    /// Run every registered handler, in registration order
    ///
    /// Handlers may unsubscribe themselves (or others) while running.
    pub fn fire(&self) {
        let handlers: Vec<Rc<dyn Fn()>> = self.handlers.borrow().values().cloned().collect();
        for handler in handlers {
            handler();
        }
    }
}

impl std::fmt::Debug for UnloadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnloadRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}

impl TerminationSignal for UnloadRegistry {
    fn subscribe(&self, handler: Rc<dyn Fn()>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().insert(id, handler);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handlers.borrow_mut().remove(&id).is_some()
    }
}
