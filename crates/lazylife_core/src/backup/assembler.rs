//! Snapshot assembly, validation and file (de)serialization.
//!
//! # Invariants
//! - Assembly only reads domain state; it never mutates a store.
//! - A snapshot is valid when the core domains are present with the right
//!   coarse shape, and every present optional domain has its shape too.
//! - Parse failures and validation failures stay distinct errors.

use crate::backup::snapshot::{BackupData, SNAPSHOT_VERSION};
use crate::backup::table::{DomainSpec, Shape, DOMAIN_TABLE};
use crate::clock::{iso8601_from_ms, Clock};
use crate::domain::DomainStores;
use crate::logging::log_safe;
use crate::storage::KeyValueStore;
use chrono::NaiveDate;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const APP_NAME: &str = "LazyLife";

static BACKUP_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<app>[A-Za-z0-9]+)_FullBackup_(?P<date>\d{4}-\d{2}-\d{2})\.json$")
        .expect("valid backup file regex")
});

/// Read access to the current value of each domain key.
pub trait SnapshotSource {
    /// Current value stored for `key`, or `None` when the domain is absent.
    fn domain_value(&self, key: &str) -> Option<Value>;
}

impl SnapshotSource for DomainStores {
    fn domain_value(&self, key: &str) -> Option<Value> {
        self.value_for(key)
    }
}

/// Assembles straight from storage, for callers without live stores.
impl SnapshotSource for KeyValueStore {
    fn domain_value(&self, key: &str) -> Option<Value> {
        self.load_value(key)
    }
}

/// Import failure, split by the stage that rejected the input.
#[derive(Debug)]
pub enum ImportError {
    /// Input is not JSON.
    Parse(serde_json::Error),
    /// Input is JSON but not a snapshot.
    Validation(String),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "backup file is not valid JSON: {err}"),
            Self::Validation(details) => write!(f, "backup file is not a valid snapshot: {details}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Validation(_) => None,
        }
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Builds a snapshot of every domain the source has.
pub fn assemble(source: &impl SnapshotSource, clock: &dyn Clock) -> BackupData {
    let mut snapshot = BackupData::from_fields(header(clock.now_ms()));
    let mut included = 0usize;
    for spec in DOMAIN_TABLE {
        let value = source.domain_value(spec.key).or_else(|| core_default(spec));
        if let Some(value) = value {
            snapshot.set_domain(spec, value);
            included += 1;
        }
    }
    info!("event=snapshot_assemble module=backup status=ok domains={included}");
    snapshot
}

fn header(now_ms: i64) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("version".to_string(), json!(SNAPSHOT_VERSION));
    fields.insert("appVersion".to_string(), json!(env!("CARGO_PKG_VERSION")));
    fields.insert("exportDate".to_string(), json!(iso8601_from_ms(now_ms)));
    fields
}

/// Core domains are always written so an assembled snapshot validates even
/// from an empty store.
fn core_default(spec: &DomainSpec) -> Option<Value> {
    if !spec.required {
        return None;
    }
    Some(match spec.shape {
        Shape::List => Value::Array(Vec::new()),
        Shape::Object | Shape::Any => Value::Object(Map::new()),
    })
}

/// Structural check of a candidate snapshot.
///
/// # Errors
/// Returns `ImportError::Validation` naming the first offending field.
pub fn validate(candidate: &Value) -> Result<BackupData, ImportError> {
    let Value::Object(fields) = candidate else {
        return Err(ImportError::Validation("top level is not an object".to_string()));
    };
    let snapshot = BackupData::from_fields(fields.clone());

    if snapshot.version().is_none() {
        return Err(ImportError::Validation("missing version".to_string()));
    }
    for spec in DOMAIN_TABLE {
        match snapshot.domain(spec) {
            None if spec.required => {
                return Err(ImportError::Validation(format!("missing {}", spec.name())));
            }
            None => {}
            Some(value) if !has_shape(value, spec.shape) => {
                return Err(ImportError::Validation(format!(
                    "{} has the wrong shape",
                    spec.name()
                )));
            }
            Some(_) => {}
        }
    }
    Ok(snapshot)
}

pub fn is_valid(candidate: &Value) -> bool {
    validate(candidate).is_ok()
}

fn has_shape(value: &Value, shape: Shape) -> bool {
    match shape {
        Shape::List => value.is_array(),
        Shape::Object => value.is_object(),
        Shape::Any => true,
    }
}

/// Pretty-printed export form.
pub fn serialize_pretty(snapshot: &BackupData) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|err| {
        warn!(
            "event=snapshot_serialize module=backup status=error error={}",
            log_safe(&err)
        );
        String::from("{}")
    })
}

/// Parses and validates an imported file.
///
/// # Errors
/// `ImportError::Parse` for non-JSON input, `ImportError::Validation` for
/// JSON that is not a snapshot.
pub fn deserialize(text: &str) -> Result<BackupData, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    let snapshot = validate(&value);
    if let Err(err) = &snapshot {
        warn!(
            "event=snapshot_import module=backup status=rejected error={}",
            log_safe(err)
        );
    }
    snapshot
}

/// `<AppName>_FullBackup_<YYYY-MM-DD>.json` for the clock's current day.
pub fn backup_file_name(clock: &dyn Clock) -> String {
    format!("{APP_NAME}_FullBackup_{}.json", clock.today())
}

/// Recognizes a full-backup file name and returns its app name and date.
pub fn parse_backup_file_name(name: &str) -> Option<(String, NaiveDate)> {
    let captures = BACKUP_FILE_RE.captures(name)?;
    let date = NaiveDate::parse_from_str(&captures["date"], "%Y-%m-%d").ok()?;
    Some((captures["app"].to_string(), date))
}

#[cfg(test)]
mod tests {
    use super::{
        assemble, backup_file_name, deserialize, is_valid, parse_backup_file_name,
        serialize_pretty, ImportError,
    };
    use crate::clock::ManualClock;
    use crate::storage::{keys, KeyValueStore};
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    const JAN_FIRST_2024: i64 = 1_704_067_200_000;

    #[test]
    fn assemble_from_empty_store_is_valid() {
        let kv = KeyValueStore::open_in_memory().expect("open kv");
        let snapshot = assemble(&kv, &ManualClock::new(JAN_FIRST_2024));
        assert_eq!(snapshot.version(), Some("2.0.0"));
        assert_eq!(snapshot.export_date(), Some("2024-01-01T00:00:00.000Z"));
        assert!(is_valid(&snapshot.clone().into_value()));
        assert!(snapshot.fields().get("journal").is_none());
    }

    #[test]
    fn assemble_nests_grouped_domains() {
        let kv = KeyValueStore::open_in_memory().expect("open kv");
        kv.save(keys::FINANCE_CURRENCY, &json!("EUR"));
        kv.save(keys::MEAL_PLANS, &json!([{ "id": "p1" }]));
        let snapshot = assemble(&kv, &ManualClock::new(JAN_FIRST_2024)).into_value();
        assert_eq!(snapshot["finance"]["currency"], json!("EUR"));
        assert_eq!(snapshot["meals"]["mealPlans"], json!([{ "id": "p1" }]));
    }

    #[test]
    fn parse_and_validation_failures_are_distinct() {
        assert!(matches!(deserialize("{not json"), Err(ImportError::Parse(_))));
        assert!(matches!(
            deserialize(r#"{"foo":1}"#),
            Err(ImportError::Validation(_))
        ));
        assert!(matches!(
            deserialize(r#"{"version":"2.0.0","habits":{},"tasks":[],"settings":{}}"#),
            Err(ImportError::Validation(_))
        ));
    }

    #[test]
    fn optional_domains_may_be_missing_but_not_misshapen() {
        let base = json!({ "version": "1.0", "habits": [], "tasks": [], "settings": {} });
        assert!(is_valid(&base));

        let mut bad = base.clone();
        bad["journal"] = json!("oops");
        assert!(!is_valid(&bad));

        let mut null_field = base;
        null_field["journal"] = Value::Null;
        assert!(is_valid(&null_field));
    }

    #[test]
    fn pretty_export_round_trips() {
        let kv = KeyValueStore::open_in_memory().expect("open kv");
        kv.save(keys::HABITS, &json!([{ "id": "h1", "completedDates": ["2024-01-01"] }]));
        let snapshot = assemble(&kv, &ManualClock::new(JAN_FIRST_2024));
        let text = serialize_pretty(&snapshot);
        assert!(text.contains('\n'));
        assert_eq!(deserialize(&text).expect("valid"), snapshot);
    }

    #[test]
    fn backup_file_names_follow_convention() {
        let name = backup_file_name(&ManualClock::new(JAN_FIRST_2024));
        assert_eq!(name, "LazyLife_FullBackup_2024-01-01.json");
        assert_eq!(
            parse_backup_file_name(&name),
            Some((
                "LazyLife".to_string(),
                NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
            ))
        );
        assert!(parse_backup_file_name("LazyLife_FullBackup_2024-13-01.json").is_none());
        assert!(parse_backup_file_name("notes.json").is_none());
    }
}
