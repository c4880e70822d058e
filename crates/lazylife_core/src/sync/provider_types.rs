//! Remote provider contract types.
//!
//! # Invariants
//! - Every provider failure is reported as a `ProviderErrorEnvelope`; a
//!   provider call never panics across the SPI boundary.
//! - Snapshots travel as opaque JSON; providers never inspect domain data.

use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ProviderResult<T> = Result<T, ProviderErrorEnvelope>;

/// Sync pipeline stage a provider call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Auth,
    Pull,
    Push,
    SignOut,
}

impl SyncStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Pull => "pull",
            Self::Push => "push",
            Self::SignOut => "sign_out",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderHealth {
    Healthy,
    Degraded,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderAuthState {
    SignedOut,
    Authenticated,
    /// Credentials existed but were revoked or expired.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub provider_id: String,
    pub health: ProviderHealth,
    pub auth_state: ProviderAuthState,
    pub last_sync_at_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAuthRequest {
    /// Whether the provider may prompt the user.
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAuthResult {
    pub state: ProviderAuthState,
    pub granted: bool,
    /// Display name of the connected account, when the provider knows it.
    pub account: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPushRequest {
    pub origin_device: String,
    pub snapshot: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPushResult {
    /// Remote revision assigned to the pushed snapshot.
    pub revision: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPullRequest {
    /// Last revision the caller has seen; `None` on first pull.
    pub cursor: Option<i64>,
}

/// One inbound remote change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteChange {
    pub revision: i64,
    pub origin_device: String,
    pub snapshot: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPullResult {
    /// Changes newer than the request cursor, oldest first.
    pub changes: Vec<RemoteChange>,
    pub next_cursor: Option<i64>,
}

/// Uniform provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderErrorEnvelope {
    pub provider_id: String,
    pub stage: SyncStage,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ProviderErrorEnvelope {
    pub fn new(
        provider_id: impl Into<String>,
        stage: SyncStage,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            stage,
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// True when the failure means the session is no longer authorized.
    pub fn is_auth_loss(&self) -> bool {
        matches!(self.code.as_str(), "auth_expired" | "auth_revoked" | "signed_out")
    }
}

impl Display for ProviderErrorEnvelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}:{}] {}: {}",
            self.provider_id,
            self.stage.as_str(),
            self.code,
            self.message
        )
    }
}

impl Error for ProviderErrorEnvelope {}
