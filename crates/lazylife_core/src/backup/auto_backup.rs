//! Periodic local snapshots kept in a small ring buffer.
//!
//! # Invariants
//! - `auto_backups` holds at most `max_entries` entries, newest first.
//! - `last_auto_backup` is written only after the ring buffer write
//!   succeeded.
//! - Neither key belongs to a domain store, so auto backups never count as
//!   local changes for sync.

use crate::backup::assembler::assemble;
use crate::backup::snapshot::BackupData;
use crate::clock::{iso8601_from_ms, ms_from_iso8601};
use crate::domain::DomainStores;
use crate::storage::{keys, KeyValueStore};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoBackupConfig {
    pub interval_ms: i64,
    pub max_entries: usize,
}

impl Default for AutoBackupConfig {
    fn default() -> Self {
        Self {
            interval_ms: DAY_MS,
            max_entries: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoBackupEntry {
    pub created_at: String,
    pub data: BackupData,
}

pub struct AutoBackups {
    kv: KeyValueStore,
    config: AutoBackupConfig,
}

impl AutoBackups {
    pub fn new(kv: KeyValueStore, config: AutoBackupConfig) -> Self {
        Self { kv, config }
    }

    /// True when no auto backup exists or the last one is older than the
    /// interval. An unreadable timestamp counts as "never".
    pub fn is_due(&self, now_ms: i64) -> bool {
        match self
            .kv
            .load::<String>(keys::LAST_AUTO_BACKUP)
            .and_then(|value| ms_from_iso8601(&value))
        {
            Some(last_ms) => now_ms - last_ms >= self.config.interval_ms,
            None => true,
        }
    }

    /// Takes a snapshot when auto backup is enabled in settings and due.
    pub fn run_if_due(&self, stores: &DomainStores) -> Option<AutoBackupEntry> {
        if !stores.settings.settings().preferences.auto_backup {
            debug!("event=auto_backup module=backup status=skip reason=disabled");
            return None;
        }
        let now_ms = stores.clock().now_ms();
        if !self.is_due(now_ms) {
            debug!("event=auto_backup module=backup status=skip reason=not_due");
            return None;
        }
        self.run_now(stores)
    }

    /// Takes a snapshot unconditionally; `None` when it could not be stored.
    pub fn run_now(&self, stores: &DomainStores) -> Option<AutoBackupEntry> {
        let now_ms = stores.clock().now_ms();
        let entry = AutoBackupEntry {
            created_at: iso8601_from_ms(now_ms),
            data: assemble(stores, stores.clock().as_ref()),
        };

        let mut entries = self.entries();
        entries.insert(0, entry.clone());
        entries.truncate(self.config.max_entries);

        if !self.kv.save(keys::AUTO_BACKUPS, &entries) {
            warn!("event=auto_backup module=backup status=error reason=write_failed");
            return None;
        }
        self.kv.save(keys::LAST_AUTO_BACKUP, &entry.created_at);
        info!(
            "event=auto_backup module=backup status=ok entries={}",
            entries.len()
        );
        Some(entry)
    }

    /// Stored entries, newest first.
    pub fn entries(&self) -> Vec<AutoBackupEntry> {
        self.kv
            .load::<Vec<AutoBackupEntry>>(keys::AUTO_BACKUPS)
            .unwrap_or_default()
    }

    pub fn snapshot_at(&self, index: usize) -> Option<BackupData> {
        self.entries().into_iter().nth(index).map(|entry| entry.data)
    }
}
