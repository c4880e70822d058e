//! Untyped JSON record for domains without engine-enforced invariants
//! (journal, finance, meals, sleep logs, time blocks, vision board, reports,
//! custom themes).

use crate::model::entity::Entity;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One stored object, kept verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Entity for Record {
    fn id(&self) -> &str {
        self.0.get("id").and_then(Value::as_str).unwrap_or_default()
    }
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}
