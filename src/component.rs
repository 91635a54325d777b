//! Host component contract
//!
//! A component exposes its live state as a JSON object and a shallow-merge
//! primitive for replacing fields. Everything else is optional.

use serde_json::{Map, Value};

use crate::config::{PersistConfig, StateFilter, StorageKey};

/// Live component state: field name to JSON value
pub type State = Map<String, Value>;

/// A stateful component that can be bound to local storage
pub trait Persistent: Sized {
    /// Current live state
    fn state(&self) -> &State;

    /// Shallow-merge `patch` into the live state (fields not in `patch` are kept)
    fn set_state(&mut self, patch: State);

    /// Per-instance persistence configuration
    fn persist_config(&self) -> &PersistConfig<Self>;

    /// Human-readable component name, used as the default storage key
    fn display_name(&self) -> Option<&str> {
        None
    }

    /// Instance-level key override; wins over `PersistConfig::storage_key`
    fn storage_key_override(&self) -> Option<StorageKey> {
        None
    }

    /// Instance-level filter override; wins over `PersistConfig::state_filter`
    fn state_filter_override(&self) -> Option<StateFilter> {
        None
    }
}

/// State container with the host framework's merge semantics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentState {
    fields: State,
}

impl ComponentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &State {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Shallow merge: top-level fields in `patch` replace existing ones
    pub fn merge(&mut self, patch: State) {
        for (field, value) in patch {
            self.fields.insert(field, value);
        }
    }
}

impl From<State> for ComponentState {
    fn from(fields: State) -> Self {
        Self { fields }
    }
}
