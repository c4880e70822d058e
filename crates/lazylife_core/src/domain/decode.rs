//! Tolerant decoding of stored domain values.
//!
//! # Invariants
//! - A list item that does not fit its entity type is handed back as raw JSON
//!   so the caller can write it back unchanged; one bad item never empties
//!   the list.
//! - `null` entity fields read as absent and take the field default.
//! - An object value keeps every field that fits; a mistyped field (at most
//!   one level deep) falls back to the default value's field.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Decodes one list item, returning the untouched value when it does not fit.
pub(crate) fn decode_entity<E: DeserializeOwned>(value: Value) -> Result<E, Value> {
    if let Ok(entity) = serde_json::from_value(value.clone()) {
        return Ok(entity);
    }
    let stripped = value.as_object().map(|fields| {
        let present: Map<String, Value> = fields
            .iter()
            .filter(|(_, field)| !field.is_null())
            .map(|(key, field)| (key.clone(), field.clone()))
            .collect();
        (fields.len(), present)
    });
    let Some((total, present)) = stripped else {
        return Err(value);
    };
    if present.len() == total {
        return Err(value);
    }
    serde_json::from_value(Value::Object(present)).map_err(|_| value)
}

/// Decodes a singleton value, repairing mistyped fields from `default`.
///
/// Returns the decoded value and the paths of the fields that were dropped,
/// or the untouched value when it cannot be read as `T` at all.
pub(crate) fn decode_object<T>(value: Value, default: &T) -> Result<(T, Vec<String>), Value>
where
    T: Serialize + DeserializeOwned,
{
    if let Ok(decoded) = serde_json::from_value(value.clone()) {
        return Ok((decoded, Vec::new()));
    }
    let stored = match value {
        Value::Object(stored) => stored,
        other => return Err(other),
    };
    let Ok(Value::Object(mut base)) = serde_json::to_value(default) else {
        return Err(Value::Object(stored));
    };

    let mut dropped = Vec::new();
    for (key, next) in &stored {
        let nested_target = matches!(base.get(key), Some(Value::Object(_)));
        match next {
            Value::Object(nested) if nested_target => {
                for (nested_key, nested_value) in nested {
                    let mut candidate = base.clone();
                    if let Some(Value::Object(target)) = candidate.get_mut(key) {
                        target.insert(nested_key.clone(), nested_value.clone());
                    }
                    if fits::<T>(&candidate) {
                        base = candidate;
                    } else {
                        dropped.push(format!("{key}.{nested_key}"));
                    }
                }
            }
            _ => {
                let mut candidate = base.clone();
                candidate.insert(key.clone(), next.clone());
                if fits::<T>(&candidate) {
                    base = candidate;
                } else {
                    dropped.push(key.clone());
                }
            }
        }
    }

    match serde_json::from_value(Value::Object(base)) {
        Ok(decoded) => Ok((decoded, dropped)),
        Err(_) => Err(Value::Object(stored)),
    }
}

fn fits<T: DeserializeOwned>(candidate: &Map<String, Value>) -> bool {
    serde_json::from_value::<T>(Value::Object(candidate.clone())).is_ok()
}

#[cfg(test)]
mod tests {
    use super::{decode_entity, decode_object};
    use crate::model::goal::Goal;
    use crate::model::settings::Settings;
    use crate::model::task::Task;
    use serde_json::json;

    #[test]
    fn null_fields_take_their_defaults() {
        let task: Task = decode_entity(json!({ "id": "t2", "title": "b", "priority": null }))
            .expect("task should decode");
        assert_eq!(task.priority, "medium");
        assert_eq!(task.title, "b");
    }

    #[test]
    fn items_that_never_fit_come_back_untouched() {
        let stored = json!({ "id": "g1", "status": "archived", "targetValue": 3 });
        let back = decode_entity::<Goal>(stored.clone()).expect_err("unknown status");
        assert_eq!(back, stored);
        assert_eq!(decode_entity::<Goal>(json!("g2")).expect_err("not an object"), json!("g2"));
    }

    #[test]
    fn mistyped_nested_field_falls_back_alone() {
        let stored = json!({
            "userName": "Sam",
            "preferences": { "weekStartsOn": "monday", "timeFormat": "12h" },
            "notifications": "off"
        });
        let (settings, dropped) =
            decode_object(stored, &Settings::default()).expect("settings should repair");
        assert_eq!(settings.user_name, "Sam");
        assert_eq!(settings.preferences.time_format, "12h");
        assert_eq!(settings.preferences.week_starts_on, 0);
        assert!(settings.notifications.enabled);
        assert_eq!(
            dropped,
            vec!["preferences.weekStartsOn".to_string(), "notifications".to_string()]
        );
    }

    #[test]
    fn non_object_value_is_not_repaired() {
        let back = decode_object(json!("dark"), &Settings::default()).expect_err("string");
        assert_eq!(back, json!("dark"));
        let (currency, dropped) = decode_object(json!("EUR"), &"USD".to_string()).expect("string");
        assert_eq!(currency, "EUR");
        assert!(dropped.is_empty());
    }
}
