//! Per-instance persistence configuration
//!
//! Mirrors the two knobs a component can set: which key its state lives
//! under, and which fields of its state get written.

use std::fmt;
use std::rc::Rc;

/// A storage key value: a name, or an explicit opt-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKey {
    Named(String),
    /// Persistence switched off for this instance
    Disabled,
}

impl StorageKey {
    /// The key if it is usable; `Disabled` and empty names are falsy
    pub fn into_key(self) -> Option<String> {
        match self {
            StorageKey::Named(name) if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for StorageKey {
    fn from(name: &str) -> Self {
        StorageKey::Named(name.to_string())
    }
}

impl From<String> for StorageKey {
    fn from(name: String) -> Self {
        StorageKey::Named(name)
    }
}

type KeyFn<C> = Rc<dyn Fn(&C) -> Option<StorageKey>>;

/// Where the configured storage key comes from
pub enum KeySource<C> {
    /// Nothing configured; the display name is used
    Absent,
    Static(StorageKey),
    /// Evaluated against the instance on every resolution; `None` opts out
    Function(KeyFn<C>),
}

impl<C> KeySource<C> {
    pub fn function(f: impl Fn(&C) -> Option<StorageKey> + 'static) -> Self {
        KeySource::Function(Rc::new(f))
    }
}

impl<C> Default for KeySource<C> {
    fn default() -> Self {
        KeySource::Absent
    }
}

impl<C> Clone for KeySource<C> {
    fn clone(&self) -> Self {
        match self {
            KeySource::Absent => KeySource::Absent,
            KeySource::Static(key) => KeySource::Static(key.clone()),
            KeySource::Function(f) => KeySource::Function(f.clone()),
        }
    }
}

impl<C> fmt::Debug for KeySource<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Absent => write!(f, "Absent"),
            KeySource::Static(key) => f.debug_tuple("Static").field(key).finish(),
            KeySource::Function(_) => write!(f, "Function(..)"),
        }
    }
}

/// Which state fields to persist
#[derive(Clone)]
pub enum StateFilter {
    Field(String),
    Fields(Vec<String>),
    /// Zero-argument function producing the field list
    Computed(Rc<dyn Fn() -> Vec<String>>),
}

impl StateFilter {
    pub fn computed(f: impl Fn() -> Vec<String> + 'static) -> Self {
        StateFilter::Computed(Rc::new(f))
    }

    /// Normalize to an ordered list of field names
    pub fn keys(&self) -> Vec<String> {
        match self {
            StateFilter::Field(name) => vec![name.clone()],
            StateFilter::Fields(names) => names.clone(),
            StateFilter::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for StateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateFilter::Field(name) => f.debug_tuple("Field").field(name).finish(),
            StateFilter::Fields(names) => f.debug_tuple("Fields").field(names).finish(),
            StateFilter::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

impl From<&str> for StateFilter {
    fn from(name: &str) -> Self {
        StateFilter::Field(name.to_string())
    }
}

impl From<String> for StateFilter {
    fn from(name: String) -> Self {
        StateFilter::Field(name)
    }
}

impl From<Vec<String>> for StateFilter {
    fn from(names: Vec<String>) -> Self {
        StateFilter::Fields(names)
    }
}

impl<const N: usize> From<[&str; N]> for StateFilter {
    fn from(names: [&str; N]) -> Self {
        StateFilter::Fields(names.iter().map(|s| s.to_string()).collect())
    }
}

/// Persistence settings for one component instance
pub struct PersistConfig<C> {
    pub storage_key: KeySource<C>,
    /// `None` persists the entire state
    pub state_filter: Option<StateFilter>,
}

impl<C> Clone for PersistConfig<C> {
    fn clone(&self) -> Self {
        Self {
            storage_key: self.storage_key.clone(),
            state_filter: self.state_filter.clone(),
        }
    }
}

impl<C> fmt::Debug for PersistConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistConfig")
            .field("storage_key", &self.storage_key)
            .field("state_filter", &self.state_filter)
            .finish()
    }
}

impl<C> Default for PersistConfig<C> {
    fn default() -> Self {
        Self {
            storage_key: KeySource::Absent,
            state_filter: None,
        }
    }
}

impl<C> PersistConfig<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store under a literal key
    pub fn storage_key(mut self, key: impl Into<StorageKey>) -> Self {
        self.storage_key = KeySource::Static(key.into());
        self
    }

    /// Compute the key from the instance each time it is needed
    pub fn storage_key_fn(mut self, f: impl Fn(&C) -> Option<StorageKey> + 'static) -> Self {
        self.storage_key = KeySource::function(f);
        self
    }

    /// Switch persistence off for this instance
    pub fn disabled(mut self) -> Self {
        self.storage_key = KeySource::Static(StorageKey::Disabled);
        self
    }

    /// Persist only the named fields
    pub fn state_filter(mut self, filter: impl Into<StateFilter>) -> Self {
        self.state_filter = Some(filter.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_falsy_values() {
        assert_eq!(StorageKey::from("k").into_key().as_deref(), Some("k"));
        assert_eq!(StorageKey::from("").into_key(), None);
        assert_eq!(StorageKey::Disabled.into_key(), None);
    }

    #[test]
    fn test_filter_normalization() {
        assert_eq!(StateFilter::from("a").keys(), vec!["a"]);
        assert_eq!(StateFilter::from(["a", "b"]).keys(), vec!["a", "b"]);
        let f = StateFilter::computed(|| vec!["x".to_string()]);
        assert_eq!(f.keys(), vec!["x"]);
    }

    #[test]
    fn test_builder() {
        struct Dummy;
        let config: PersistConfig<Dummy> = PersistConfig::new()
            .storage_key("component-key")
            .state_filter(["a", "b"]);
        assert!(matches!(
            config.storage_key,
            KeySource::Static(StorageKey::Named(ref k)) if k == "component-key"
        ));
        assert_eq!(
            config.state_filter.map(|f| f.keys()),
            Some(vec!["a".to_string(), "b".to_string()])
        );

        let off: PersistConfig<Dummy> = PersistConfig::new().disabled();
        assert!(matches!(off.storage_key, KeySource::Static(StorageKey::Disabled)));
    }
}
