//! Remote sync coordinator.
//!
//! # Responsibility
//! - Own the remote session lifecycle (Disconnected / Connected).
//! - Debounce outbound pushes of the assembled snapshot.
//! - Apply inbound remote snapshots through Replace, then reload every
//!   domain store.
//!
//! # Invariants
//! - `SyncPhase` is the single authority consulted before every push.
//! - Nothing is pushed while `Restoring`. A local change made during the
//!   window is remembered and pushed once the window closes and its debounce
//!   has elapsed. A second inbound change re-arms the same deadline instead
//!   of starting an independent timer, and drops the remembered change
//!   because the replace overwrote it.
//! - Changes produced by applying a remote snapshot are never observed as
//!   local changes.
//! - Snapshots pushed by this device are skipped on pull.
//!
//! Time only advances through `tick`; the host drives it from its event
//! loop or timer.

use crate::backup::{assemble, validate, ImportError, RestoreEngine, RestoreError};
use crate::clock::Clock;
use crate::domain::DomainStores;
use crate::logging::log_safe;
use crate::storage::{keys, KeyValueStore};
use crate::sync::provider_registry::{ProviderRegistry, ProviderRegistryError};
use crate::sync::provider_types::{
    ProviderAuthRequest, ProviderAuthState, ProviderErrorEnvelope, ProviderPullRequest,
    ProviderPushRequest, RemoteChange,
};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period after the last local change before a push fires.
    pub debounce_ms: i64,
    /// Suppression window after an inbound change was applied.
    pub cooldown_ms: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 5_000,
            cooldown_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected {
        provider_id: String,
        account: Option<String>,
    },
}

/// Outbound scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    /// A push fires at `due_at_ms` unless another change re-arms it.
    PendingPush { due_at_ms: i64 },
    /// Pushes are suppressed until `until_ms`; `pending_since_ms` is the
    /// latest local change seen inside the window.
    Restoring {
        until_ms: i64,
        pending_since_ms: Option<i64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncInput {
    LocalChange { at_ms: i64 },
    Inbound { at_ms: i64 },
    Tick { at_ms: i64 },
    ManualSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEffect {
    None,
    Push,
    /// The request conflicts with an in-flight restore.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub phase: SyncPhase,
    pub effect: SyncEffect,
}

impl Transition {
    fn stay(phase: SyncPhase) -> Self {
        Self {
            phase,
            effect: SyncEffect::None,
        }
    }
}

/// Outbound transition table.
pub fn next_phase(phase: SyncPhase, input: SyncInput, config: &SyncConfig) -> Transition {
    use SyncPhase::{Idle, PendingPush, Restoring};

    match (phase, input) {
        (Restoring { until_ms, .. }, SyncInput::LocalChange { at_ms }) => {
            Transition::stay(Restoring {
                until_ms,
                pending_since_ms: Some(at_ms),
            })
        }
        (Restoring { until_ms, .. }, SyncInput::Inbound { at_ms }) => Transition::stay(Restoring {
            until_ms: until_ms.max(at_ms + config.cooldown_ms),
            pending_since_ms: None,
        }),
        (
            Restoring {
                until_ms,
                pending_since_ms,
            },
            SyncInput::Tick { at_ms },
        ) if at_ms >= until_ms => match pending_since_ms {
            None => Transition::stay(Idle),
            Some(changed_at) => next_phase(
                PendingPush {
                    due_at_ms: until_ms.max(changed_at + config.debounce_ms),
                },
                input,
                config,
            ),
        },
        (Restoring { .. }, SyncInput::Tick { .. }) => Transition::stay(phase),
        (Restoring { .. }, SyncInput::ManualSync) => Transition {
            phase,
            effect: SyncEffect::Reject,
        },
        (Idle | PendingPush { .. }, SyncInput::LocalChange { at_ms }) => {
            Transition::stay(PendingPush {
                due_at_ms: at_ms + config.debounce_ms,
            })
        }
        (Idle | PendingPush { .. }, SyncInput::Inbound { at_ms }) => Transition::stay(Restoring {
            until_ms: at_ms + config.cooldown_ms,
            pending_since_ms: None,
        }),
        (PendingPush { due_at_ms }, SyncInput::Tick { at_ms }) if at_ms >= due_at_ms => {
            Transition {
                phase: Idle,
                effect: SyncEffect::Push,
            }
        }
        (Idle | PendingPush { .. }, SyncInput::Tick { .. }) => Transition::stay(phase),
        (Idle | PendingPush { .. }, SyncInput::ManualSync) => Transition {
            phase: Idle,
            effect: SyncEffect::Push,
        },
    }
}

#[derive(Debug)]
pub enum SyncError {
    NotConnected,
    RestoreInProgress,
    AuthDenied(String),
    Registry(ProviderRegistryError),
    Provider(ProviderErrorEnvelope),
    InvalidRemote(ImportError),
    Restore(RestoreError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "sync is not connected"),
            Self::RestoreInProgress => {
                write!(f, "a remote restore is in progress; try again shortly")
            }
            Self::AuthDenied(provider_id) => write!(f, "provider `{provider_id}` denied access"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Provider(err) => write!(f, "{err}"),
            Self::InvalidRemote(err) => write!(f, "remote snapshot rejected: {err}"),
            Self::Restore(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotConnected | Self::RestoreInProgress | Self::AuthDenied(_) => None,
            Self::Registry(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::InvalidRemote(err) => Some(err),
            Self::Restore(err) => Some(err),
        }
    }
}

impl From<ProviderRegistryError> for SyncError {
    fn from(value: ProviderRegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<ProviderErrorEnvelope> for SyncError {
    fn from(value: ProviderErrorEnvelope) -> Self {
        Self::Provider(value)
    }
}

impl From<ImportError> for SyncError {
    fn from(value: ImportError) -> Self {
        Self::InvalidRemote(value)
    }
}

impl From<RestoreError> for SyncError {
    fn from(value: RestoreError) -> Self {
        Self::Restore(value)
    }
}

/// What one `tick` did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Remote snapshots applied locally.
    pub applied: usize,
    /// Revision of the push fired by this tick.
    pub pushed: Option<i64>,
    /// Set when the session was lost during this tick.
    pub disconnected: bool,
    /// Failures reported but not retried.
    pub errors: Vec<SyncError>,
}

pub struct SyncCoordinator {
    registry: ProviderRegistry,
    restore: RestoreEngine,
    kv: KeyValueStore,
    clock: Arc<dyn Clock>,
    config: SyncConfig,
    device_id: String,
    connection: ConnectionState,
    phase: SyncPhase,
    seen_generation: u64,
    cursor: Option<i64>,
}

impl SyncCoordinator {
    pub fn new(registry: ProviderRegistry, stores: &DomainStores, config: SyncConfig) -> Self {
        let kv = stores.kv().clone();
        let device_id = load_or_create_device_id(&kv);
        Self {
            registry,
            restore: RestoreEngine::new(kv.clone()),
            kv,
            clock: stores.clock().clone(),
            config,
            device_id,
            connection: ConnectionState::Disconnected,
            phase: SyncPhase::Idle,
            seen_generation: stores.changes().generation(),
            cursor: None,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, ConnectionState::Connected { .. })
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn is_restoring(&self) -> bool {
        matches!(self.phase, SyncPhase::Restoring { .. })
    }

    /// Authenticates against `provider_id` and starts a session.
    ///
    /// # Errors
    /// Unknown provider, provider failure, or a denied grant.
    pub fn connect(&mut self, provider_id: &str, interactive: bool) -> Result<(), SyncError> {
        self.registry.select_active(provider_id)?;
        let auth = match self.registry.auth_active(ProviderAuthRequest { interactive }) {
            Ok(auth) => auth,
            Err(err) => {
                self.registry.clear_active();
                return Err(err.into());
            }
        };
        if !auth.granted || auth.state != ProviderAuthState::Authenticated {
            self.registry.clear_active();
            warn!("event=sync_connect module=sync status=denied provider={provider_id}");
            return Err(SyncError::AuthDenied(provider_id.to_string()));
        }

        self.kv.save(keys::GOOGLE_LINKED, &true);
        self.connection = ConnectionState::Connected {
            provider_id: provider_id.trim().to_string(),
            account: auth.account,
        };
        self.phase = SyncPhase::Idle;
        self.cursor = None;
        info!("event=sync_connect module=sync status=ok provider={provider_id}");
        Ok(())
    }

    /// Reconnects without prompting when a previous session was linked.
    pub fn resume(&mut self, provider_id: &str) -> bool {
        if !self.kv.load::<bool>(keys::GOOGLE_LINKED).unwrap_or(false) {
            return false;
        }
        match self.connect(provider_id, false) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "event=sync_resume module=sync status=error error={}",
                    log_safe(&err)
                );
                false
            }
        }
    }

    /// Ends the session. Local data is kept.
    pub fn sign_out(&mut self) {
        if let Err(err) = self.registry.sign_out_active() {
            warn!(
                "event=sync_sign_out module=sync status=error error={}",
                log_safe(&err)
            );
        }
        self.kv.save(keys::GOOGLE_LINKED, &false);
        self.disconnect("sign_out");
    }

    /// Advances timers, applies inbound changes and fires due pushes.
    pub fn tick(&mut self, stores: &mut DomainStores) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_connected() {
            self.seen_generation = stores.changes().generation();
            return report;
        }

        let authenticated = matches!(
            self.registry.active_status(),
            Some(status) if status.auth_state == ProviderAuthState::Authenticated
        );
        if !authenticated {
            self.disconnect("auth_lost");
            report.disconnected = true;
            return report;
        }

        self.pull_and_apply(stores, &mut report);
        if !self.is_connected() {
            report.disconnected = true;
            return report;
        }

        self.observe_local_changes(stores);
        let now_ms = self.clock.now_ms();
        if self.step(SyncInput::Tick { at_ms: now_ms }) == SyncEffect::Push {
            match self.push(stores) {
                Ok(revision) => report.pushed = Some(revision),
                Err(err) => {
                    report.disconnected = !self.is_connected();
                    report.errors.push(err);
                }
            }
        }
        report
    }

    /// Applies one inbound remote snapshot with pushes suppressed.
    ///
    /// # Errors
    /// `InvalidRemote` when the snapshot fails validation (nothing written),
    /// `Restore` when a write failed partway.
    pub fn apply_remote_change(
        &mut self,
        stores: &mut DomainStores,
        change: &RemoteChange,
    ) -> Result<(), SyncError> {
        self.step(SyncInput::Inbound {
            at_ms: self.clock.now_ms(),
        });
        let snapshot = validate(&change.snapshot)?;
        let result = self.restore.replace(&snapshot);
        // Reload even after a partial replace so memory matches storage.
        stores.reload_all();
        self.seen_generation = stores.changes().generation();
        let replaced = result?;
        info!(
            "event=sync_pull module=sync status=applied revision={} domains={}",
            change.revision,
            replaced.written.len()
        );
        Ok(())
    }

    /// Pushes immediately, bypassing the debounce.
    ///
    /// # Errors
    /// `NotConnected`, `RestoreInProgress` while an inbound change is being
    /// settled, or the provider failure.
    pub fn sync_now(&mut self, stores: &DomainStores) -> Result<i64, SyncError> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        self.step(SyncInput::Tick {
            at_ms: self.clock.now_ms(),
        });
        match self.step(SyncInput::ManualSync) {
            SyncEffect::Reject => {
                warn!("event=sync_now module=sync status=rejected reason=restoring");
                Err(SyncError::RestoreInProgress)
            }
            _ => {
                self.seen_generation = stores.changes().generation();
                self.push(stores)
            }
        }
    }

    fn pull_and_apply(&mut self, stores: &mut DomainStores, report: &mut TickReport) {
        let pulled = match self.registry.pull_active(ProviderPullRequest {
            cursor: self.cursor,
        }) {
            Ok(pulled) => pulled,
            Err(err) => {
                self.handle_provider_error(&err);
                report.errors.push(err.into());
                return;
            }
        };

        for change in &pulled.changes {
            if change.origin_device == self.device_id {
                debug!(
                    "event=sync_pull module=sync status=skip reason=own_push revision={}",
                    change.revision
                );
                continue;
            }
            match self.apply_remote_change(stores, change) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    error!(
                        "event=sync_pull module=sync status=error revision={} error={}",
                        change.revision,
                        log_safe(&err)
                    );
                    report.errors.push(err);
                }
            }
        }
        if pulled.next_cursor.is_some() {
            self.cursor = pulled.next_cursor;
        }
    }

    fn observe_local_changes(&mut self, stores: &DomainStores) {
        let generation = stores.changes().generation();
        if generation == self.seen_generation {
            return;
        }
        self.seen_generation = generation;
        self.step(SyncInput::LocalChange {
            at_ms: stores.changes().last_change_ms(),
        });
    }

    fn push(&mut self, stores: &DomainStores) -> Result<i64, SyncError> {
        let snapshot = assemble(stores, self.clock.as_ref()).into_value();
        match self.registry.push_active(ProviderPushRequest {
            origin_device: self.device_id.clone(),
            snapshot,
        }) {
            Ok(pushed) => {
                info!(
                    "event=sync_push module=sync status=ok revision={}",
                    pushed.revision
                );
                Ok(pushed.revision)
            }
            Err(err) => {
                error!(
                    "event=sync_push module=sync status=error code={} retryable={}",
                    err.code, err.retryable
                );
                self.handle_provider_error(&err);
                Err(err.into())
            }
        }
    }

    fn handle_provider_error(&mut self, err: &ProviderErrorEnvelope) {
        if err.is_auth_loss() {
            self.disconnect("auth_lost");
        }
    }

    fn disconnect(&mut self, reason: &str) {
        self.registry.clear_active();
        self.connection = ConnectionState::Disconnected;
        self.phase = SyncPhase::Idle;
        self.cursor = None;
        info!("event=sync_disconnect module=sync status=ok reason={reason}");
    }

    fn step(&mut self, input: SyncInput) -> SyncEffect {
        let transition = next_phase(self.phase, input, &self.config);
        if transition.phase != self.phase {
            debug!(
                "event=sync_phase module=sync status=ok from={:?} to={:?}",
                self.phase, transition.phase
            );
        }
        self.phase = transition.phase;
        transition.effect
    }
}

fn load_or_create_device_id(kv: &KeyValueStore) -> String {
    if let Some(existing) = kv.load::<String>(keys::SYNC_DEVICE_ID) {
        if !existing.trim().is_empty() {
            return existing;
        }
    }
    let created = Uuid::new_v4().to_string();
    kv.save(keys::SYNC_DEVICE_ID, &created);
    created
}
