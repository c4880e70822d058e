//! Shared-folder remote provider.
//!
//! # Responsibility
//! - Publish the latest snapshot as one envelope file inside a folder that
//!   several devices can see (network share, synced cloud folder).
//! - Report envelopes written by other devices as remote changes.
//!
//! # Invariants
//! - The envelope file is replaced atomically (temp file + rename); readers
//!   see either the old or the new envelope, never a torn write.
//! - Revisions strictly increase across pushes to the same folder.

use crate::clock::{iso8601_from_ms, Clock};
use crate::logging::log_safe;
use crate::sync::provider_spi::ProviderSpi;
use crate::sync::provider_types::{
    ProviderAuthRequest, ProviderAuthResult, ProviderAuthState, ProviderErrorEnvelope,
    ProviderHealth, ProviderPullRequest, ProviderPullResult, ProviderPushRequest,
    ProviderPushResult, ProviderResult, ProviderStatus, RemoteChange, SyncStage,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub const FILE_DROP_PROVIDER_ID: &str = "file_drop";
const ENVELOPE_FILE: &str = "lazylife_sync.json";
const ENVELOPE_TEMP_FILE: &str = "lazylife_sync.json.tmp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    revision: i64,
    origin_device: String,
    pushed_at: String,
    snapshot: Value,
}

#[derive(Debug, Default)]
struct FileDropState {
    signed_in: bool,
    last_sync_at_ms: Option<i64>,
}

pub struct FileDropProvider {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
    state: Mutex<FileDropState>,
}

impl FileDropProvider {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
            state: Mutex::new(FileDropState::default()),
        }
    }

    pub fn envelope_path(&self) -> PathBuf {
        self.dir.join(ENVELOPE_FILE)
    }

    fn state(&self) -> MutexGuard<'_, FileDropState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn error(
        &self,
        stage: SyncStage,
        code: &str,
        message: impl Into<String>,
        retryable: bool,
    ) -> ProviderErrorEnvelope {
        ProviderErrorEnvelope::new(FILE_DROP_PROVIDER_ID, stage, code, message, retryable)
    }

    fn require_signed_in(&self, stage: SyncStage) -> ProviderResult<()> {
        if self.state().signed_in {
            Ok(())
        } else {
            Err(self.error(stage, "signed_out", "Shared folder is not connected.", false))
        }
    }

    fn read_envelope(&self, stage: SyncStage) -> ProviderResult<Option<Envelope>> {
        let text = match fs::read_to_string(self.envelope_path()) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(self.error(stage, "read_failed", log_safe(&err), true));
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|err| self.error(stage, "corrupt_remote", log_safe(&err), false))
    }

    fn write_envelope(&self, envelope: &Envelope) -> ProviderResult<()> {
        let text = serde_json::to_string_pretty(envelope)
            .map_err(|err| self.error(SyncStage::Push, "encode_failed", log_safe(&err), false))?;
        let temp = self.dir.join(ENVELOPE_TEMP_FILE);
        fs::write(&temp, text)
            .and_then(|()| fs::rename(&temp, self.envelope_path()))
            .map_err(|err| self.error(SyncStage::Push, "write_failed", log_safe(&err), true))
    }
}

impl ProviderSpi for FileDropProvider {
    fn provider_id(&self) -> &str {
        FILE_DROP_PROVIDER_ID
    }

    fn status(&self) -> ProviderStatus {
        let state = self.state();
        ProviderStatus {
            provider_id: FILE_DROP_PROVIDER_ID.to_string(),
            health: if self.dir.is_dir() {
                ProviderHealth::Healthy
            } else {
                ProviderHealth::Unavailable
            },
            auth_state: if state.signed_in {
                ProviderAuthState::Authenticated
            } else {
                ProviderAuthState::SignedOut
            },
            last_sync_at_ms: state.last_sync_at_ms,
        }
    }

    fn auth(&self, _request: ProviderAuthRequest) -> ProviderResult<ProviderAuthResult> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            self.error(SyncStage::Auth, "folder_unavailable", log_safe(&err), true)
        })?;
        self.state().signed_in = true;
        debug!("event=provider_auth module=sync status=ok provider={FILE_DROP_PROVIDER_ID}");
        Ok(ProviderAuthResult {
            state: ProviderAuthState::Authenticated,
            granted: true,
            account: Some(display_path(&self.dir)),
        })
    }

    fn sign_out(&self) -> ProviderResult<()> {
        self.state().signed_in = false;
        Ok(())
    }

    fn push(&self, request: ProviderPushRequest) -> ProviderResult<ProviderPushResult> {
        self.require_signed_in(SyncStage::Push)?;
        let now_ms = self.clock.now_ms();
        let previous = match self.read_envelope(SyncStage::Push) {
            Ok(previous) => previous.map(|envelope| envelope.revision),
            Err(err) => {
                warn!(
                    "event=provider_push module=sync status=overwrite reason={}",
                    err.code
                );
                None
            }
        };
        let revision = previous.map_or(now_ms, |prev| now_ms.max(prev + 1));
        self.write_envelope(&Envelope {
            revision,
            origin_device: request.origin_device,
            pushed_at: iso8601_from_ms(now_ms),
            snapshot: request.snapshot,
        })?;
        self.state().last_sync_at_ms = Some(now_ms);
        Ok(ProviderPushResult { revision })
    }

    fn pull(&self, request: ProviderPullRequest) -> ProviderResult<ProviderPullResult> {
        self.require_signed_in(SyncStage::Pull)?;
        let envelope = self.read_envelope(SyncStage::Pull)?;
        self.state().last_sync_at_ms = Some(self.clock.now_ms());
        let Some(envelope) = envelope else {
            return Ok(ProviderPullResult {
                changes: Vec::new(),
                next_cursor: request.cursor,
            });
        };
        if request.cursor.is_some_and(|cursor| envelope.revision <= cursor) {
            return Ok(ProviderPullResult {
                changes: Vec::new(),
                next_cursor: request.cursor,
            });
        }
        Ok(ProviderPullResult {
            next_cursor: Some(envelope.revision),
            changes: vec![RemoteChange {
                revision: envelope.revision,
                origin_device: envelope.origin_device,
                snapshot: envelope.snapshot,
            }],
        })
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
