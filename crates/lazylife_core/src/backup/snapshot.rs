//! Aggregate snapshot document.

use crate::backup::table::DomainSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: &str = "2.0.0";

/// One aggregate snapshot (`BackupData`).
///
/// Kept as an ordered JSON object so fields written by newer or older
/// builds survive a round trip untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupData(Map<String, Value>);

impl BackupData {
    pub(crate) fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn version(&self) -> Option<&str> {
        self.0.get("version").and_then(Value::as_str)
    }

    pub fn app_version(&self) -> Option<&str> {
        self.0.get("appVersion").and_then(Value::as_str)
    }

    pub fn export_date(&self) -> Option<&str> {
        self.0.get("exportDate").and_then(Value::as_str)
    }

    /// Value at the domain's field path; `null` reads as absent.
    pub fn domain(&self, spec: &DomainSpec) -> Option<&Value> {
        let (first, rest) = spec.path.split_first()?;
        let mut current = self.0.get(*first)?;
        for segment in rest {
            current = current.as_object()?.get(*segment)?;
        }
        (!current.is_null()).then_some(current)
    }

    /// Writes the domain's value, creating parent objects as needed.
    pub(crate) fn set_domain(&mut self, spec: &DomainSpec, value: Value) {
        let Some((last, parents)) = spec.path.split_last() else {
            return;
        };
        let mut current = &mut self.0;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return;
            };
            current = next;
        }
        current.insert(last.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::BackupData;
    use crate::backup::table::spec_for_key;
    use crate::storage::keys;
    use serde_json::{json, Value};

    fn data(value: Value) -> BackupData {
        serde_json::from_value(value).expect("snapshot")
    }

    #[test]
    fn nested_fields_are_read_by_path() {
        let snapshot = data(json!({ "finance": { "accounts": [{ "id": "a1" }] } }));
        let accounts = spec_for_key(keys::FINANCE_ACCOUNTS).expect("spec");
        let budgets = spec_for_key(keys::FINANCE_BUDGETS).expect("spec");
        assert_eq!(snapshot.domain(accounts), Some(&json!([{ "id": "a1" }])));
        assert_eq!(snapshot.domain(budgets), None);
    }

    #[test]
    fn null_fields_read_as_absent() {
        let snapshot = data(json!({ "journal": null }));
        let journal = spec_for_key(keys::JOURNAL).expect("spec");
        assert!(snapshot.domain(journal).is_none());
    }

    #[test]
    fn set_domain_creates_parent_objects() {
        let mut snapshot = BackupData::default();
        let recipes = spec_for_key(keys::RECIPES).expect("spec");
        snapshot.set_domain(recipes, json!([]));
        assert_eq!(snapshot.into_value(), json!({ "meals": { "recipes": [] } }));
    }
}
