//! Application settings singleton and its patch semantics.
//!
//! # Invariants
//! - Patches merge exactly one level deep: an object-valued top-level field
//!   (`notifications`, `preferences`, or any future one) is merged
//!   key-by-key; every other value, arrays included, is replaced wholesale.
//! - Missing fields in stored settings fall back to `Settings::default()`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub habit_reminders: bool,
    pub reminder_time: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            habit_reminders: true,
            reminder_time: "09:00".to_string(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// `0 = Sunday .. 6 = Saturday`.
    pub week_starts_on: u8,
    pub default_task_priority: String,
    pub time_format: String,
    pub auto_backup: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            week_starts_on: 0,
            default_task_priority: crate::model::task::default_priority(),
            time_format: "24h".to_string(),
            auto_backup: true,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub user_name: String,
    pub language: String,
    pub notifications: NotificationSettings,
    pub preferences: Preferences,
    /// Module ids hidden from navigation.
    pub disabled_modules: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_name: String::new(),
            language: "en".to_string(),
            notifications: NotificationSettings::default(),
            preferences: Preferences::default(),
            disabled_modules: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Applies a settings patch with one-level deep merge.
    ///
    /// # Errors
    /// Returns the deserialization error when the merged document no longer
    /// fits `Settings`; `self` is untouched in that case.
    pub fn merged_with(&self, patch: &Map<String, Value>) -> serde_json::Result<Settings> {
        let mut current = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        merge_one_level(&mut current, patch);
        serde_json::from_value(Value::Object(current))
    }

    pub fn is_module_enabled(&self, module_id: &str) -> bool {
        !self.disabled_modules.iter().any(|id| id == module_id)
    }
}

/// Merges `patch` into `base`, descending exactly one object level.
pub fn merge_one_level(base: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, next) in patch {
        match (base.get_mut(key), next) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                for (nested_key, nested_value) in nested {
                    existing.insert(nested_key.clone(), nested_value.clone());
                }
            }
            _ => {
                base.insert(key.clone(), next.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{merge_one_level, Settings};
    use serde_json::{json, Map, Value};

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(fields) => fields,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn nested_objects_merge_key_by_key() {
        let settings = Settings::default();
        let patch = as_map(json!({ "notifications": { "enabled": false } }));
        let merged = settings.merged_with(&patch).expect("merge");
        assert!(!merged.notifications.enabled);
        assert!(merged.notifications.habit_reminders);
        assert_eq!(merged.notifications.reminder_time, "09:00");
    }

    #[test]
    fn arrays_are_replaced_wholesale() {
        let mut settings = Settings::default();
        settings.disabled_modules = vec!["finance".to_string(), "meals".to_string()];
        let patch = as_map(json!({ "disabledModules": ["sleep"] }));
        let merged = settings.merged_with(&patch).expect("merge");
        assert_eq!(merged.disabled_modules, vec!["sleep".to_string()]);
        assert!(!merged.is_module_enabled("sleep"));
        assert!(merged.is_module_enabled("finance"));
    }

    #[test]
    fn merge_descends_only_one_level() {
        let mut base = as_map(json!({ "a": { "b": { "c": 1, "d": 2 } } }));
        merge_one_level(&mut base, &as_map(json!({ "a": { "b": { "c": 9 } } })));
        assert_eq!(Value::Object(base), json!({ "a": { "b": { "c": 9 } } }));
    }

    #[test]
    fn mistyped_patch_is_rejected() {
        let settings = Settings::default();
        let patch = as_map(json!({ "preferences": { "weekStartsOn": "monday" } }));
        assert!(settings.merged_with(&patch).is_err());
    }

    #[test]
    fn partial_stored_settings_fill_defaults() {
        let settings: Settings =
            serde_json::from_value(json!({ "userName": "Sam", "theme": "dark" }))
                .expect("settings should deserialize");
        assert_eq!(settings.user_name, "Sam");
        assert_eq!(settings.language, "en");
        assert_eq!(settings.extra.get("theme"), Some(&json!("dark")));
    }
}
