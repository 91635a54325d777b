//! Storage key and state filter resolution
//!
//! Precedence is fixed:
//! - key: instance override > configured key/function > display name > default
//! - filter: instance override > configured filter > none (whole state)

use crate::component::Persistent;
use crate::config::KeySource;
use crate::consts::DEFAULT_STORAGE_KEY;

/// Name used in diagnostics
///
/// The instance's `display_name()` if non-empty, otherwise the bare type name.
pub fn display_name<C: Persistent>(component: &C) -> String {
    match component.display_name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => short_type_name::<C>().to_string(),
    }
}

/// Last path segment of a type name, generics stripped
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Storage key for `component`, or `None` when persistence is off
pub fn resolve_key<C: Persistent>(component: &C) -> Option<String> {
    if let Some(key) = component.storage_key_override() {
        return key.into_key();
    }

    match &component.persist_config().storage_key {
        KeySource::Absent => match component.display_name() {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => Some(DEFAULT_STORAGE_KEY.to_string()),
        },
        KeySource::Static(key) => key.clone().into_key(),
        KeySource::Function(f) => f(component).and_then(|key| key.into_key()),
    }
}

/// Fields to persist for `component`, or `None` for the whole state
pub fn resolve_filter_keys<C: Persistent>(component: &C) -> Option<Vec<String>> {
    if let Some(filter) = component.state_filter_override() {
        return Some(filter.keys());
    }
    component
        .persist_config()
        .state_filter
        .as_ref()
        .map(|filter| filter.keys())
}
