//! Restore/save pipeline
//!
//! Features:
//! - One capability probe per context; an unusable store turns every
//!   operation into a no-op that never touches the store again
//! - Restore shallow-merges the stored JSON object into live state
//! - Save writes the (optionally filtered) snapshot, last write wins
//! - Corrupt blobs and failed writes are logged, never propagated

pub mod snapshot;

pub use snapshot::{is_truthy, snapshot};

use std::cell::OnceCell;
use std::rc::Rc;

use serde_json::Value;

use crate::component::Persistent;
use crate::platform::{self, KeyValueStore};
use crate::probe::{StorageCapability, probe};
use crate::resolve::{display_name, resolve_filter_keys, resolve_key};

/// Per-instance bookkeeping for the restore/save pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSlot {
    loaded: bool,
}

impl PersistSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a restore has been attempted; saves are refused until then
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

/// What a restore did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Store unavailable; slot untouched
    Unavailable,
    /// Persistence disabled for this instance; slot untouched
    NoKey,
    /// Component was borrowed elsewhere; slot untouched
    Busy,
    /// Nothing stored under the key
    Missing,
    /// Stored value was `null`, an empty object or another falsy value
    Empty,
    /// Blob could not be read or was not a JSON object
    Corrupt,
    /// Merged this many fields into live state
    Applied { fields: usize },
}

impl RestoreOutcome {
    /// Whether this restore counts as an attempt (marks the slot loaded)
    pub fn attempted(&self) -> bool {
        !matches!(
            self,
            RestoreOutcome::Unavailable | RestoreOutcome::NoKey | RestoreOutcome::Busy
        )
    }
}

/// What a save did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Unavailable,
    /// No restore has been attempted for this instance yet
    NotLoaded,
    NoKey,
    /// Component was borrowed elsewhere; nothing read or written
    Busy,
    Written { key: String },
    /// Serialization or the store write failed
    Failed,
}

/// Storage context: a store plus its probed capability
pub struct Persistence {
    store: Option<Rc<dyn KeyValueStore>>,
    capability: StorageCapability,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("capability", &self.capability)
            .finish()
    }
}

thread_local! {
    static BROWSER: OnceCell<Rc<Persistence>> = const { OnceCell::new() };
}

impl Persistence {
    /// Probe `store` and build a context around it
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self::from_store(Some(store))
    }

    /// Build a context from an optional store; `None` is unavailable
    pub fn from_store(store: Option<Rc<dyn KeyValueStore>>) -> Self {
        let capability = match &store {
            Some(store) => probe(store.as_ref()),
            None => StorageCapability::Unavailable,
        };

        warning!(
            capability.is_available(),
            "localStorage not found. Component state will not be stored to localStorage."
        );

        Self { store, capability }
    }

    /// The platform's localStorage context, probed once per thread
    pub fn browser() -> Rc<Persistence> {
        BROWSER.with(|cell| {
            cell.get_or_init(|| Rc::new(Self::from_store(platform::default_store())))
                .clone()
        })
    }

    pub fn capability(&self) -> StorageCapability {
        self.capability
    }

    pub fn is_available(&self) -> bool {
        self.capability.is_available()
    }

    fn usable_store(&self) -> Option<&dyn KeyValueStore> {
        if self.capability.is_available() {
            self.store.as_deref()
        } else {
            None
        }
    }

    /// Load the stored blob for `component` and merge it into its state
    ///
    /// Marks `slot` loaded whenever the store was consulted, including when
    /// nothing was stored or the blob was unreadable.
    pub fn restore<C: Persistent>(
        &self,
        component: &mut C,
        slot: &mut PersistSlot,
    ) -> RestoreOutcome {
        let Some(store) = self.usable_store() else {
            return RestoreOutcome::Unavailable;
        };
        let Some(key) = resolve_key(component) else {
            return RestoreOutcome::NoKey;
        };

        let outcome = match store.get_item(&key) {
            Ok(None) => RestoreOutcome::Missing,
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(fields)) if !fields.is_empty() => {
                    let count = fields.len();
                    component.set_state(fields);
                    log::info!("Loaded {} state fields from {:?}", count, key);
                    RestoreOutcome::Applied { fields: count }
                }
                Ok(value) if !is_truthy(&value) || value.is_object() => RestoreOutcome::Empty,
                Ok(_) | Err(_) => {
                    warning!(
                        false,
                        "Unable to load state for {} from localStorage.",
                        display_name(component)
                    );
                    RestoreOutcome::Corrupt
                }
            },
            Err(e) => {
                warning!(
                    false,
                    "Unable to load state for {} from localStorage: {}",
                    display_name(component),
                    e
                );
                RestoreOutcome::Corrupt
            }
        };

        slot.loaded = true;
        outcome
    }

    /// Write the persistable snapshot of `component` under its key
    pub fn save<C: Persistent>(&self, component: &C, slot: &PersistSlot) -> SaveOutcome {
        let Some(store) = self.usable_store() else {
            return SaveOutcome::Unavailable;
        };
        if !slot.loaded {
            return SaveOutcome::NotLoaded;
        }
        let Some(key) = resolve_key(component) else {
            return SaveOutcome::NoKey;
        };

        let filter = resolve_filter_keys(component);
        let snap = snapshot(component.state(), filter.as_deref());
        let json = match serde_json::to_string(&snap) {
            Ok(json) => json,
            Err(e) => {
                warning!(false, "Unable to serialize state for {}: {}", display_name(component), e);
                return SaveOutcome::Failed;
            }
        };

        match store.set_item(&key, &json) {
            Ok(()) => {
                log::info!("Saved {} state fields to {:?}", snap.len(), key);
                SaveOutcome::Written { key }
            }
            Err(e) => {
                warning!(
                    false,
                    "Unable to save state for {} to localStorage: {}",
                    display_name(component),
                    e
                );
                SaveOutcome::Failed
            }
        }
    }

    /// Delete the stored blob for `component`; returns whether a removal was issued
    pub fn clear<C: Persistent>(&self, component: &C) -> bool {
        let Some(store) = self.usable_store() else {
            return false;
        };
        let Some(key) = resolve_key(component) else {
            return false;
        };
        match store.remove_item(&key) {
            Ok(()) => {
                log::info!("Cleared saved state {:?}", key);
                true
            }
            Err(e) => {
                warning!(false, "Unable to clear state for {}: {}", display_name(component), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentState, State};
    use crate::config::{PersistConfig, StateFilter};
    use crate::platform::MemoryStore;
    use crate::warning::{self, capture::warnings};
    use serde_json::json;

    struct Panel {
        name: &'static str,
        state: ComponentState,
        config: PersistConfig<Panel>,
    }

    impl Panel {
        fn new(name: &'static str, config: PersistConfig<Panel>) -> Self {
            Self {
                name,
                state: ComponentState::new(),
                config,
            }
        }

        fn set(&mut self, value: Value) {
            if let Value::Object(patch) = value {
                self.state.merge(patch);
            }
        }
    }

    impl Persistent for Panel {
        fn state(&self) -> &State {
            self.state.fields()
        }

        fn set_state(&mut self, patch: State) {
            self.state.merge(patch);
        }

        fn persist_config(&self) -> &PersistConfig<Self> {
            &self.config
        }

        fn display_name(&self) -> Option<&str> {
            Some(self.name)
        }
    }

    fn context() -> (Rc<MemoryStore>, Persistence) {
        let store = Rc::new(MemoryStore::new());
        let persistence = Persistence::new(store.clone());
        (store, persistence)
    }

    #[test]
    fn test_save_before_restore_is_refused() {
        let (store, persistence) = context();
        let mut panel = Panel::new("component1", PersistConfig::new());
        panel.set(json!({ "a": "world" }));

        let slot = PersistSlot::new();
        assert_eq!(persistence.save(&panel, &slot), SaveOutcome::NotLoaded);
        assert_eq!(store.peek("component1"), None);
    }

    #[test]
    fn test_restore_marks_loaded_without_blob() {
        let (_store, persistence) = context();
        let mut panel = Panel::new("component1", PersistConfig::new());
        let mut slot = PersistSlot::new();

        assert_eq!(persistence.restore(&mut panel, &mut slot), RestoreOutcome::Missing);
        assert!(slot.is_loaded());
    }

    #[test]
    fn test_save_uses_display_name() {
        let (store, persistence) = context();
        let mut panel = Panel::new("component1", PersistConfig::new());
        let mut slot = PersistSlot::new();
        persistence.restore(&mut panel, &mut slot);

        panel.set(json!({ "a": "world" }));
        assert_eq!(
            persistence.save(&panel, &slot),
            SaveOutcome::Written { key: "component1".to_string() }
        );
        assert_eq!(store.peek("component1").as_deref(), Some(r#"{"a":"world"}"#));
    }

    #[test]
    fn test_configured_key_replaces_display_name() {
        let (store, persistence) = context();
        let mut panel = Panel::new("component2", PersistConfig::new().storage_key("component-key"));
        let mut slot = PersistSlot::new();
        persistence.restore(&mut panel, &mut slot);

        panel.set(json!({ "hello": "moon" }));
        persistence.save(&panel, &slot);
        assert_eq!(store.peek("component2"), None);
        assert_eq!(store.peek("component-key").as_deref(), Some(r#"{"hello":"moon"}"#));
    }

    #[test]
    fn test_round_trip_merges_over_defaults() {
        let (store, persistence) = context();
        let mut first = Panel::new("prefs", PersistConfig::new());
        let mut slot = PersistSlot::new();
        persistence.restore(&mut first, &mut slot);
        first.set(json!({ "theme": "dark", "zoom": 2 }));
        persistence.save(&first, &slot);
        assert!(store.peek("prefs").is_some());

        let mut second = Panel::new("prefs", PersistConfig::new());
        second.set(json!({ "theme": "light", "sidebar": true }));
        let mut slot = PersistSlot::new();
        assert_eq!(
            persistence.restore(&mut second, &mut slot),
            RestoreOutcome::Applied { fields: 2 }
        );
        assert_eq!(second.state.get("theme"), Some(&json!("dark")));
        assert_eq!(second.state.get("zoom"), Some(&json!(2)));
        assert_eq!(second.state.get("sidebar"), Some(&json!(true)));
    }

    #[test]
    fn test_corrupt_blob_still_marks_loaded() {
        let (store, persistence) = context();
        store.seed("component1", "{not json");
        let mut panel = Panel::new("component1", PersistConfig::new());
        panel.set(json!({ "a": 1 }));
        let mut slot = PersistSlot::new();

        assert_eq!(persistence.restore(&mut panel, &mut slot), RestoreOutcome::Corrupt);
        assert!(slot.is_loaded());
        assert_eq!(panel.state(), &json!({ "a": 1 }).as_object().cloned().unwrap());
    }

    #[test]
    fn test_non_object_blobs() {
        let (store, persistence) = context();
        let mut panel = Panel::new("component1", PersistConfig::new());

        for (raw, expected) in [
            ("null", RestoreOutcome::Empty),
            ("{}", RestoreOutcome::Empty),
            ("0", RestoreOutcome::Empty),
            ("[1,2]", RestoreOutcome::Corrupt),
            ("\"text\"", RestoreOutcome::Corrupt),
        ] {
            store.seed("component1", raw);
            let mut slot = PersistSlot::new();
            assert_eq!(persistence.restore(&mut panel, &mut slot), expected, "blob {raw}");
            assert!(slot.is_loaded());
        }
        assert!(panel.state().is_empty());
    }

    #[test]
    fn test_filtered_save_drops_falsy_fields() {
        let (store, persistence) = context();
        let mut panel = Panel::new(
            "componentStateFilter",
            PersistConfig::new().state_filter(["a", "b"]),
        );
        let mut slot = PersistSlot::new();
        persistence.restore(&mut panel, &mut slot);

        panel.set(json!({ "a": "world", "b": "bar", "c": "shouldNotSync" }));
        persistence.save(&panel, &slot);
        assert_eq!(
            store.peek("componentStateFilter").as_deref(),
            Some(r#"{"a":"world","b":"bar"}"#)
        );

        panel.set(json!({ "b": 0 }));
        persistence.save(&panel, &slot);
        assert_eq!(store.peek("componentStateFilter").as_deref(), Some(r#"{"a":"world"}"#));
        // Still in live state
        assert_eq!(panel.state.get("b"), Some(&json!(0)));
    }

    #[test]
    fn test_computed_filter() {
        let (store, persistence) = context();
        let mut panel = Panel::new(
            "componentStateFilterFunc",
            PersistConfig::new().state_filter(StateFilter::computed(|| vec!["a".into()])),
        );
        let mut slot = PersistSlot::new();
        persistence.restore(&mut panel, &mut slot);
        panel.set(json!({ "a": "world", "b": "bar" }));
        persistence.save(&panel, &slot);
        assert_eq!(
            store.peek("componentStateFilterFunc").as_deref(),
            Some(r#"{"a":"world"}"#)
        );
    }

    #[test]
    fn test_disabled_key_touches_nothing() {
        let (store, persistence) = context();
        let ops_after_probe = store.op_count();
        let mut panel = Panel::new("component1", PersistConfig::new().disabled());
        let mut slot = PersistSlot::new();

        assert_eq!(persistence.restore(&mut panel, &mut slot), RestoreOutcome::NoKey);
        assert!(!slot.is_loaded());
        panel.set(json!({ "a": "hello" }));
        assert_eq!(persistence.save(&panel, &slot), SaveOutcome::NotLoaded);
        let loaded = PersistSlot { loaded: true };
        assert_eq!(persistence.save(&panel, &loaded), SaveOutcome::NoKey);
        assert!(!persistence.clear(&panel));
        assert_eq!(store.op_count(), ops_after_probe);
    }

    #[test]
    fn test_unavailable_store_is_never_touched_again() {
        let store = Rc::new(MemoryStore::disabled());
        let persistence = Persistence::new(store.clone());
        assert!(!persistence.is_available());
        let ops_after_probe = store.op_count();

        let mut panel = Panel::new("component1", PersistConfig::new());
        let mut slot = PersistSlot::new();
        assert_eq!(persistence.restore(&mut panel, &mut slot), RestoreOutcome::Unavailable);
        assert!(!slot.is_loaded());
        assert_eq!(persistence.save(&panel, &slot), SaveOutcome::Unavailable);
        assert!(!persistence.clear(&panel));
        assert_eq!(store.op_count(), ops_after_probe);
    }

    #[test]
    fn test_missing_store_is_unavailable() {
        let persistence = Persistence::from_store(None);
        assert_eq!(persistence.capability(), StorageCapability::Unavailable);
    }

    #[test]
    fn test_missing_store_warns_once() {
        let (persistence, logged) = warnings(|| Persistence::from_store(None));
        assert!(!persistence.is_available());
        if warning::ENABLED {
            assert_eq!(logged.len(), 1);
            assert!(logged[0].contains("localStorage not found"), "{logged:?}");
        } else {
            assert!(logged.is_empty());
        }
    }

    #[test]
    fn test_working_store_is_silent() {
        let ((_store, persistence), logged) = warnings(context);
        assert!(persistence.is_available());
        assert!(logged.is_empty(), "{logged:?}");
    }

    #[test]
    fn test_corrupt_blob_warning_names_component() {
        let (store, persistence) = context();
        store.seed("component1", "{not json");
        let mut panel = Panel::new("component1", PersistConfig::new());
        let mut slot = PersistSlot::new();

        let (outcome, logged) = warnings(|| persistence.restore(&mut panel, &mut slot));
        assert_eq!(outcome, RestoreOutcome::Corrupt);
        if warning::ENABLED {
            assert_eq!(logged.len(), 1);
            assert!(logged[0].contains("component1"), "{logged:?}");
        } else {
            assert!(logged.is_empty());
        }
    }

    #[test]
    fn test_busy_is_not_an_attempt() {
        assert!(!RestoreOutcome::Busy.attempted());
        assert!(RestoreOutcome::Missing.attempted());
    }

    #[test]
    fn test_write_failure_is_contained() {
        let store = Rc::new(MemoryStore::with_quota(64));
        let persistence = Persistence::new(store.clone());
        assert!(persistence.is_available());

        let mut panel = Panel::new("big", PersistConfig::new());
        let mut slot = PersistSlot::new();
        persistence.restore(&mut panel, &mut slot);
        panel.set(json!({ "blob": "x".repeat(128) }));

        assert_eq!(persistence.save(&panel, &slot), SaveOutcome::Failed);
        assert_eq!(store.peek("big"), None);
    }

    #[test]
    fn test_last_write_wins_between_instances() {
        let (store, persistence) = context();
        let mut a = Panel::new("shared", PersistConfig::new());
        let mut b = Panel::new("shared", PersistConfig::new());
        let (mut slot_a, mut slot_b) = (PersistSlot::new(), PersistSlot::new());
        persistence.restore(&mut a, &mut slot_a);
        persistence.restore(&mut b, &mut slot_b);

        a.set(json!({ "from": "a" }));
        b.set(json!({ "from": "b" }));
        persistence.save(&a, &slot_a);
        persistence.save(&b, &slot_b);
        assert_eq!(store.peek("shared").as_deref(), Some(r#"{"from":"b"}"#));
    }

    #[test]
    fn test_clear_removes_blob() {
        let (store, persistence) = context();
        store.seed("component1", r#"{"a":1}"#);
        let panel = Panel::new("component1", PersistConfig::new());
        assert!(persistence.clear(&panel));
        assert_eq!(store.peek("component1"), None);
    }
}
