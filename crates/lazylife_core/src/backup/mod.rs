//! Backup, export/import and restore.
//!
//! # Responsibility
//! - Assemble one portable snapshot from every domain and validate
//!   candidates before anything is written.
//! - Restore snapshots through the key-value store only (Replace / Merge).
//! - Keep the local auto-backup ring buffer and the guarded factory reset.

pub mod assembler;
pub mod auto_backup;
pub mod reset;
pub mod restore;
pub mod snapshot;
pub mod table;

pub use assembler::{
    assemble, backup_file_name, deserialize, is_valid, parse_backup_file_name,
    serialize_pretty, validate, ImportError, SnapshotSource, APP_NAME,
};
pub use auto_backup::{AutoBackupConfig, AutoBackupEntry, AutoBackups};
pub use reset::{factory_reset, ResetError, FACTORY_RESET_PHRASE};
pub use restore::{MergeReport, ReplaceReport, RestoreEngine, RestoreError, RestoreStrategy};
pub use snapshot::{BackupData, SNAPSHOT_VERSION};
pub use table::{DomainSpec, MergeRule, Shape, DOMAIN_TABLE};
