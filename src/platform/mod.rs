//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Storage (LocalStorage on web, in-process map elsewhere)
//! - Process termination (`beforeunload` on web, manual registry elsewhere)

pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use memory::{MemoryStore, UnloadRegistry};
#[cfg(target_arch = "wasm32")]
pub use web::{BeforeUnload, WebStorage};

use std::rc::Rc;
use thiserror::Error;

/// Errors raised by a storage backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No store exists, or the platform refuses access (private browsing)
    #[error("storage unavailable")]
    Unavailable,

    /// Writing would exceed the store's capacity
    #[error("quota of {limit} bytes exceeded writing {key:?}")]
    QuotaExceeded { key: String, limit: usize },

    /// The backend rejected the operation
    #[error("storage access failed: {0}")]
    Access(String),
}

/// Synchronous string-keyed text store, shaped like the Web Storage API
pub trait KeyValueStore {
    /// Read the text stored under `key`, `Ok(None)` if nothing is stored
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Rc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

/// Handle returned by [`TerminationSignal::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Process-wide "about to terminate" event
pub trait TerminationSignal {
    /// Register `handler` to run when the process is about to terminate
    fn subscribe(&self, handler: Rc<dyn Fn()>) -> SubscriptionId;

    /// Remove a handler; returns false if it was not registered
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// The platform's default persistent store, if one can be reached
#[cfg(target_arch = "wasm32")]
pub fn default_store() -> Option<Rc<dyn KeyValueStore>> {
    WebStorage::local().map(|s| Rc::new(s) as Rc<dyn KeyValueStore>)
}

/// Native builds have no persistent store
#[cfg(not(target_arch = "wasm32"))]
pub fn default_store() -> Option<Rc<dyn KeyValueStore>> {
    None
}

/// The platform's termination signal
#[cfg(target_arch = "wasm32")]
pub fn default_signal() -> Rc<dyn TerminationSignal> {
    Rc::new(BeforeUnload::new())
}

/// The platform's termination signal
#[cfg(not(target_arch = "wasm32"))]
pub fn default_signal() -> Rc<dyn TerminationSignal> {
    Rc::new(UnloadRegistry::new())
}
