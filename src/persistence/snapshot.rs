//! Persistable snapshot of component state
//!
//! Filtered snapshots copy only truthy values. A filtered field holding
//! `0`, `""`, `false` or `null` is left out of the blob even though the
//! filter names it, while an unfiltered snapshot keeps everything. Callers
//! depend on this asymmetry; keep it.

use serde_json::Value;

use crate::component::State;

/// JavaScript truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// State to write: the whole thing, or only the truthy filtered fields
pub fn snapshot(state: &State, filter: Option<&[String]>) -> State {
    let Some(keys) = filter else {
        return state.clone();
    };

    let mut result = State::new();
    for key in keys {
        if let Some(value) = state.get(key) {
            if is_truthy(value) {
                result.insert(key.clone(), value.clone());
            }
        }
    }
    result
}
