//! Replace and Merge restore strategies.
//!
//! # Responsibility
//! - Write snapshot domains into the key-value store.
//! - Never touch live domain-store memory: callers reload afterwards.
//!
//! # Invariants
//! - Replace writes only domains present in the snapshot; absent and `null`
//!   fields leave storage untouched.
//! - Replace stops at the first failed write. Earlier writes are not rolled
//!   back and are reported in the error.
//! - Merge only adds: existing entities, singletons and settings are never
//!   overwritten, so merging the same snapshot twice adds nothing the second
//!   time.

use crate::backup::snapshot::BackupData;
use crate::backup::table::{MergeRule, DOMAIN_TABLE};
use crate::logging::log_safe;
use crate::storage::{KeyValueStore, StorageError};
use log::{error, info};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Restore strategy chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStrategy {
    Replace,
    Merge,
}

impl RestoreStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => Some(Self::Replace),
            "merge" => Some(Self::Merge),
            _ => None,
        }
    }
}

/// A write failed partway through a restore.
#[derive(Debug)]
pub enum RestoreError {
    WriteFailed {
        key: &'static str,
        /// Keys already overwritten before the failure; they stay written.
        overwritten: Vec<&'static str>,
        source: StorageError,
    },
}

impl Display for RestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WriteFailed {
                key, overwritten, ..
            } => write!(
                f,
                "restore failed writing `{key}` after {} domain(s) were already written; retry or reload",
                overwritten.len()
            ),
        }
    }
}

impl Error for RestoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WriteFailed { source, .. } => Some(source),
        }
    }
}

/// Result of a completed Replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaceReport {
    pub written: Vec<&'static str>,
}

/// Per-domain counts of a completed Merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Items added, keyed by snapshot field name.
    pub added: BTreeMap<String, usize>,
    /// Snapshot entities without an `id`, ignored by Merge.
    pub skipped_without_id: usize,
}

impl MergeReport {
    pub fn added_for(&self, field: &str) -> usize {
        self.added.get(field).copied().unwrap_or(0)
    }

    pub fn habits_added(&self) -> usize {
        self.added_for("habits")
    }

    pub fn tasks_added(&self) -> usize {
        self.added_for("tasks")
    }

    pub fn total_added(&self) -> usize {
        self.added.values().sum()
    }
}

/// Applies snapshots to the key-value store.
#[derive(Clone)]
pub struct RestoreEngine {
    kv: KeyValueStore,
}

impl RestoreEngine {
    pub fn new(kv: KeyValueStore) -> Self {
        Self { kv }
    }

    /// Overwrites every domain present in `snapshot`.
    ///
    /// # Errors
    /// Returns `RestoreError::WriteFailed` on the first storage failure;
    /// remaining domains are not written.
    pub fn replace(&self, snapshot: &BackupData) -> Result<ReplaceReport, RestoreError> {
        let mut written = Vec::new();
        for spec in DOMAIN_TABLE {
            let Some(value) = snapshot.domain(spec) else {
                continue;
            };
            if let Err(source) = self.kv.try_save(spec.key, value) {
                error!(
                    "event=restore_replace module=backup status=error key={} written={} error={}",
                    spec.key,
                    written.len(),
                    log_safe(&source)
                );
                return Err(RestoreError::WriteFailed {
                    key: spec.key,
                    overwritten: written,
                    source,
                });
            }
            written.push(spec.key);
        }
        info!(
            "event=restore_replace module=backup status=ok written={}",
            written.len()
        );
        Ok(ReplaceReport { written })
    }

    /// Adds snapshot items missing from storage.
    ///
    /// # Errors
    /// Returns `RestoreError::WriteFailed` when a merged list cannot be
    /// stored; lists merged before it stay written.
    pub fn merge(&self, snapshot: &BackupData) -> Result<MergeReport, RestoreError> {
        let mut report = MergeReport::default();
        let mut written = Vec::new();
        for spec in DOMAIN_TABLE {
            if spec.merge == MergeRule::Skip {
                continue;
            }
            let Some(Value::Array(incoming)) = snapshot.domain(spec) else {
                continue;
            };
            let mut current = match self.kv.load_value(spec.key) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let added = match spec.merge {
                MergeRule::ById => merge_by_id(&mut current, incoming, &mut report),
                MergeRule::Union => merge_union(&mut current, incoming),
                MergeRule::Skip => 0,
            };
            report.added.insert(spec.name(), added);
            if added == 0 {
                continue;
            }
            if let Err(source) = self.kv.try_save(spec.key, &current) {
                error!(
                    "event=restore_merge module=backup status=error key={} error={}",
                    spec.key,
                    log_safe(&source)
                );
                return Err(RestoreError::WriteFailed {
                    key: spec.key,
                    overwritten: written,
                    source,
                });
            }
            written.push(spec.key);
        }
        info!(
            "event=restore_merge module=backup status=ok added={} skipped_without_id={}",
            report.total_added(),
            report.skipped_without_id
        );
        Ok(report)
    }
}

fn entity_id(item: &Value) -> Option<&str> {
    match item.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.as_str()),
        _ => None,
    }
}

fn merge_by_id(current: &mut Vec<Value>, incoming: &[Value], report: &mut MergeReport) -> usize {
    let mut known: HashSet<String> = current
        .iter()
        .filter_map(entity_id)
        .map(str::to_string)
        .collect();
    let mut added = 0;
    for item in incoming {
        let Some(id) = entity_id(item) else {
            report.skipped_without_id += 1;
            continue;
        };
        if known.insert(id.to_string()) {
            current.push(item.clone());
            added += 1;
        }
    }
    added
}

fn merge_union(current: &mut Vec<Value>, incoming: &[Value]) -> usize {
    let mut added = 0;
    for item in incoming {
        if !current.contains(item) {
            current.push(item.clone());
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::{RestoreEngine, RestoreError, RestoreStrategy};
    use crate::backup::assembler::validate;
    use crate::storage::{keys, KeyValueStore, KvBackend, StorageError, StorageResult};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn snapshot(value: Value) -> crate::backup::BackupData {
        validate(&value).expect("valid snapshot")
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!(RestoreStrategy::parse("Merge"), Some(RestoreStrategy::Merge));
        assert_eq!(RestoreStrategy::parse(" replace "), Some(RestoreStrategy::Replace));
        assert_eq!(RestoreStrategy::parse("wipe"), None);
    }

    #[test]
    fn merge_unions_categories_and_skips_singletons() {
        let kv = KeyValueStore::open_in_memory().expect("open kv");
        kv.save(keys::HABIT_CATEGORIES, &json!(["Health"]));
        kv.save(keys::SETTINGS, &json!({ "language": "en" }));
        let engine = RestoreEngine::new(kv.clone());

        let report = engine
            .merge(&snapshot(json!({
                "version": "2.0.0",
                "settings": { "language": "de" },
                "habits": [{ "title": "no id" }],
                "tasks": [],
                "habitCategories": ["Health", "Focus"],
                "sleepSettings": { "targetHours": 6 }
            })))
            .expect("merge");

        assert_eq!(report.added_for("habitCategories"), 1);
        assert_eq!(report.skipped_without_id, 1);
        assert_eq!(kv.load_value(keys::HABIT_CATEGORIES), Some(json!(["Health", "Focus"])));
        assert_eq!(kv.load_value(keys::SETTINGS), Some(json!({ "language": "en" })));
        assert!(kv.load_value(keys::SLEEP_SETTINGS).is_none());
        assert!(kv.load_value(keys::HABITS).is_none());
    }

    struct FailingAfter {
        inner: KeyValueStore,
        allowed: std::sync::atomic::AtomicUsize,
    }

    impl KvBackend for FailingAfter {
        fn read(&self, key: &str) -> StorageResult<Option<String>> {
            Ok(self.inner.load_value(key).map(|value| value.to_string()))
        }

        fn write(&self, key: &str, value: &str) -> StorageResult<()> {
            use std::sync::atomic::Ordering;
            if self.allowed.load(Ordering::SeqCst) == 0 {
                return Err(StorageError::Unavailable("disk full"));
            }
            self.allowed.fetch_sub(1, Ordering::SeqCst);
            let parsed: Value = serde_json::from_str(value)?;
            self.inner.try_save(key, &parsed)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key);
            Ok(())
        }

        fn clear(&self) -> StorageResult<()> {
            self.inner.clear_all();
            Ok(())
        }

        fn keys(&self) -> StorageResult<Vec<String>> {
            Ok(self.inner.keys())
        }
    }

    #[test]
    fn replace_aborts_on_first_failed_write() {
        let inner = KeyValueStore::open_in_memory().expect("open kv");
        inner.save(keys::TASKS, &json!([{ "id": "old" }]));
        let kv = KeyValueStore::new(Arc::new(FailingAfter {
            inner: inner.clone(),
            allowed: 1.into(),
        }));

        let result = RestoreEngine::new(kv).replace(&snapshot(json!({
            "version": "2.0.0",
            "settings": {},
            "habits": [],
            "tasks": [{ "id": "new" }]
        })));

        match result {
            Err(RestoreError::WriteFailed {
                key, overwritten, ..
            }) => {
                assert_eq!(key, keys::HABITS);
                assert_eq!(overwritten, vec![keys::SETTINGS]);
            }
            other => panic!("expected write failure, got {other:?}"),
        }
        assert_eq!(inner.load_value(keys::TASKS), Some(json!([{ "id": "old" }])));
    }
}
