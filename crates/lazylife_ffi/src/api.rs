//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level backup/restore functions to Dart via FRB.
//! - Translate core errors into envelopes the UI can show directly.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Import failures keep "invalid file" (nothing written) distinct from
//!   "restore failed" (storage error partway).

use lazylife_core::backup::{
    assemble, backup_file_name, deserialize, factory_reset as factory_reset_inner,
    serialize_pretty, AutoBackupConfig, AutoBackups, BackupData, ImportError, RestoreEngine,
    RestoreStrategy,
};
use lazylife_core::clock::{Clock, SystemClock};
use lazylife_core::domain::DomainStores;
use lazylife_core::storage::KeyValueStore;
use lazylife_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
};
use log::warn;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

const DB_FILE_NAME: &str = "lazylife.sqlite3";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Stable failure category for import calls.
pub const IMPORT_INVALID_FILE: &str = "invalid_file";
pub const IMPORT_RESTORE_FAILED: &str = "restore_failed";
pub const IMPORT_INVALID_STRATEGY: &str = "invalid_strategy";
pub const STORAGE_UNAVAILABLE: &str = "storage_unavailable";

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Export response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupExportResponse {
    pub ok: bool,
    /// Suggested download name, `LazyLife_FullBackup_<date>.json`.
    pub file_name: String,
    /// Pretty-printed snapshot; empty on failure.
    pub json: String,
    pub message: String,
}

/// Import response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupImportResponse {
    pub ok: bool,
    /// One of the `IMPORT_*` / `STORAGE_UNAVAILABLE` codes on failure.
    pub error_code: Option<String>,
    /// Items added by a merge; zero for replace.
    pub added: u32,
    pub message: String,
}

impl BackupImportResponse {
    fn success(message: impl Into<String>, added: usize) -> Self {
        Self {
            ok: true,
            error_code: None,
            added: u32::try_from(added).unwrap_or(u32::MAX),
            message: message.into(),
        }
    }

    fn failure(code: &str, message: impl Into<String>) -> Self {
        warn!("event=ffi_import module=ffi status=error code={code}");
        Self {
            ok: false,
            error_code: Some(code.to_string()),
            added: 0,
            message: message.into(),
        }
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// One stored auto backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoBackupItem {
    /// Position in the ring buffer, 0 = newest.
    pub index: u32,
    pub created_at: String,
}

/// Assembles a full snapshot of the current local state.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn backup_export() -> BackupExportResponse {
    let clock = system_clock();
    match open_stores(clock.clone()) {
        Ok(stores) => BackupExportResponse {
            ok: true,
            file_name: backup_file_name(clock.as_ref()),
            json: serialize_pretty(&assemble(&stores, clock.as_ref())),
            message: "Backup ready.".to_string(),
        },
        Err(message) => BackupExportResponse {
            ok: false,
            file_name: String::new(),
            json: String::new(),
            message,
        },
    }
}

/// Imports backup file contents with `strategy` (`merge` | `replace`).
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Malformed or structurally invalid files write nothing and report
///   `invalid_file`; storage failures report `restore_failed`.
/// - Callers reload their views after a successful import.
#[flutter_rust_bridge::frb(sync)]
pub fn backup_import(json: String, strategy: String) -> BackupImportResponse {
    let Some(strategy) = RestoreStrategy::parse(&strategy) else {
        return BackupImportResponse::failure(
            IMPORT_INVALID_STRATEGY,
            format!("unknown restore strategy `{}`", strategy.trim()),
        );
    };
    let snapshot = match deserialize(&json) {
        Ok(snapshot) => snapshot,
        Err(err) => return BackupImportResponse::failure(IMPORT_INVALID_FILE, import_message(&err)),
    };
    let kv = match open_kv() {
        Ok(kv) => kv,
        Err(message) => return BackupImportResponse::failure(STORAGE_UNAVAILABLE, message),
    };
    restore_with(kv, &snapshot, strategy)
}

/// Clears all local data once the exact confirmation phrase is supplied.
#[flutter_rust_bridge::frb(sync)]
pub fn factory_reset(confirmation: String) -> ActionResponse {
    let kv = match open_kv() {
        Ok(kv) => kv,
        Err(message) => return ActionResponse::failure(message),
    };
    match factory_reset_inner(&kv, confirmation.as_str()) {
        Ok(()) => ActionResponse::success("All data deleted."),
        Err(err) => ActionResponse::failure(err.to_string()),
    }
}

/// Takes an automatic snapshot when enabled and due.
///
/// Returns `ok=true` with a "skipped" message when nothing was due.
#[flutter_rust_bridge::frb(sync)]
pub fn auto_backup_run() -> ActionResponse {
    let stores = match open_stores(system_clock()) {
        Ok(stores) => stores,
        Err(message) => return ActionResponse::failure(message),
    };
    let backups = AutoBackups::new(stores.kv().clone(), AutoBackupConfig::default());
    match backups.run_if_due(&stores) {
        Some(entry) => ActionResponse::success(format!("Auto backup saved at {}.", entry.created_at)),
        None => ActionResponse::success("Auto backup skipped."),
    }
}

/// Lists stored auto backups, newest first. Empty when storage is unavailable.
#[flutter_rust_bridge::frb(sync)]
pub fn auto_backup_list() -> Vec<AutoBackupItem> {
    let Ok(kv) = open_kv() else {
        return Vec::new();
    };
    AutoBackups::new(kv, AutoBackupConfig::default())
        .entries()
        .into_iter()
        .enumerate()
        .map(|(index, entry)| AutoBackupItem {
            index: u32::try_from(index).unwrap_or(u32::MAX),
            created_at: entry.created_at,
        })
        .collect()
}

/// Restores the auto backup at `index` with `strategy`.
#[flutter_rust_bridge::frb(sync)]
pub fn auto_backup_restore(index: u32, strategy: String) -> BackupImportResponse {
    let Some(strategy) = RestoreStrategy::parse(&strategy) else {
        return BackupImportResponse::failure(
            IMPORT_INVALID_STRATEGY,
            format!("unknown restore strategy `{}`", strategy.trim()),
        );
    };
    let kv = match open_kv() {
        Ok(kv) => kv,
        Err(message) => return BackupImportResponse::failure(STORAGE_UNAVAILABLE, message),
    };
    let backups = AutoBackups::new(kv.clone(), AutoBackupConfig::default());
    let Some(snapshot) = backups.snapshot_at(index as usize) else {
        return BackupImportResponse::failure(
            IMPORT_INVALID_FILE,
            format!("no auto backup at position {index}"),
        );
    };
    restore_with(kv, &snapshot, strategy)
}

fn restore_with(
    kv: KeyValueStore,
    snapshot: &BackupData,
    strategy: RestoreStrategy,
) -> BackupImportResponse {
    let engine = RestoreEngine::new(kv);
    match strategy {
        RestoreStrategy::Replace => match engine.replace(snapshot) {
            Ok(report) => BackupImportResponse::success(
                format!("Restored {} data sets.", report.written.len()),
                0,
            ),
            Err(err) => BackupImportResponse::failure(IMPORT_RESTORE_FAILED, err.to_string()),
        },
        RestoreStrategy::Merge => match engine.merge(snapshot) {
            Ok(report) => BackupImportResponse::success(
                format!(
                    "Merged {} habits and {} tasks.",
                    report.habits_added(),
                    report.tasks_added()
                ),
                report.total_added(),
            ),
            Err(err) => BackupImportResponse::failure(IMPORT_RESTORE_FAILED, err.to_string()),
        },
    }
}

fn import_message(err: &ImportError) -> String {
    match err {
        ImportError::Parse(_) => "Invalid backup file: not valid JSON.".to_string(),
        ImportError::Validation(reason) => format!("Invalid backup file: {reason}."),
    }
}

fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("LAZYLIFE_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn open_kv() -> Result<KeyValueStore, String> {
    KeyValueStore::open(resolve_db_path()).map_err(|err| format!("local storage unavailable: {err}"))
}

fn open_stores(clock: Arc<dyn Clock>) -> Result<DomainStores, String> {
    Ok(DomainStores::open(open_kv()?, clock))
}
