//! Core logic for LazyLife.
//! This crate is the single source of truth for persistence, backup/restore
//! and sync invariants.

pub mod backup;
pub mod clock;
pub mod db;
pub mod domain;
pub mod logging;
pub mod model;
pub mod storage;
pub mod sync;

pub use backup::{
    assemble, backup_file_name, deserialize, factory_reset, serialize_pretty, validate,
    AutoBackupConfig, AutoBackups, BackupData, ImportError, MergeReport, ReplaceReport,
    ResetError, RestoreEngine, RestoreError, RestoreStrategy, FACTORY_RESET_PHRASE,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{DomainError, DomainStores};
pub use logging::{default_log_level, init_logging};
pub use model::date_key::DateKey;
pub use storage::{KeyValueStore, StorageError};
pub use sync::{
    FileDropProvider, ProviderRegistry, SyncConfig, SyncCoordinator, SyncError, SyncPhase,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
