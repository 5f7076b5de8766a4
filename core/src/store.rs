use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::KvBackend;
use crate::models::{AppState, Targets};

/// Primary application-state key.
pub const STATE_KEY: &str = "nutriplan/v2/state";

/// Previous-generation state key, consulted read-only when the primary key
/// is absent or unreadable.
pub const LEGACY_STATE_KEY: &str = "nutriplan/v1/state";

/// Load the application state, trying the primary key then the legacy key.
///
/// A key is skipped when the backend read fails, the value is not JSON, or
/// the value is not a JSON object. Whatever object survives goes through
/// [`migrate`], so the result always satisfies the `AppState` invariants no
/// matter what was previously persisted. Both keys failing yields the
/// structural default.
pub fn load_state(backend: &dyn KvBackend) -> AppState {
    for key in [STATE_KEY, LEGACY_STATE_KEY] {
        if let Ok(Some(raw)) = backend.get(key) {
            if let Ok(Value::Object(fields)) = serde_json::from_str(&raw) {
                return migrate(&fields);
            }
        }
    }
    AppState::default()
}

/// Serialize the full state and write it under the primary key.
///
/// Fire-and-forget: a failed write leaves the in-memory state as the source
/// of truth for the rest of the session.
pub fn save_state(backend: &dyn KvBackend, state: &AppState) {
    if let Ok(json) = serde_json::to_string(state) {
        let _ = backend.set(STATE_KEY, &json);
    }
}

/// Field-by-field migration of a raw decoded record.
///
/// Each field is validated independently: `targetsByDate` must be an object
/// or it degrades to empty, each collection must be an array or it degrades
/// to empty, and array elements that do not decode are dropped one by one.
/// No single bad field aborts the load.
fn migrate(fields: &serde_json::Map<String, Value>) -> AppState {
    AppState {
        targets_by_date: decode_targets(fields.get("targetsByDate")),
        meals: decode_seq(fields.get("meals")),
        plans: decode_seq(fields.get("plans")),
        shopping: decode_seq(fields.get("shopping")),
        weights: decode_seq(fields.get("weights")),
    }
}

fn decode_targets(field: Option<&Value>) -> HashMap<String, Targets> {
    match field {
        Some(Value::Object(entries)) => entries
            .iter()
            .filter_map(|(date, value)| {
                let targets: Targets = serde_json::from_value(value.clone()).ok()?;
                Some((date.clone(), targets))
            })
            .collect(),
        _ => HashMap::new(),
    }
}

fn decode_seq<T: DeserializeOwned>(field: Option<&Value>) -> Vec<T> {
    match field {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        _ => Vec::new(),
    }
}
