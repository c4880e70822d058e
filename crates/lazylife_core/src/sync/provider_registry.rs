//! Remote providers known to this process, at most one of them in use.
//!
//! # Invariants
//! - Provider ids are unique, lowercase `[a-z0-9_-]+`, and compared after
//!   trimming.
//! - Every `*_active` call fails with `provider_not_selected` when nothing is
//!   selected; the registry never picks a provider on its own.

use crate::sync::provider_spi::ProviderSpi;
use crate::sync::provider_types::{
    ProviderAuthRequest, ProviderAuthResult, ProviderErrorEnvelope, ProviderPullRequest,
    ProviderPullResult, ProviderPushRequest, ProviderPushResult, ProviderResult, ProviderStatus,
    SyncStage,
};
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderRegistryError {
    InvalidProviderId(String),
    DuplicateProviderId(String),
    ProviderNotFound(String),
}

impl Display for ProviderRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProviderId(id) => write!(f, "`{id}` is not a usable provider id"),
            Self::DuplicateProviderId(id) => write!(f, "a provider named `{id}` already exists"),
            Self::ProviderNotFound(id) => write!(f, "no provider named `{id}`"),
        }
    }
}

impl Error for ProviderRegistryError {}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn ProviderSpi>>,
    active: Option<Arc<dyn ProviderSpi>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn ProviderSpi>) -> Result<(), ProviderRegistryError> {
        let id = provider.provider_id().trim();
        let usable = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if !usable {
            return Err(ProviderRegistryError::InvalidProviderId(id.to_string()));
        }
        if self.providers.contains_key(id) {
            return Err(ProviderRegistryError::DuplicateProviderId(id.to_string()));
        }
        debug!("event=provider_register module=sync status=ok provider={id}");
        self.providers.insert(id.to_string(), provider);
        Ok(())
    }

    pub fn select_active(&mut self, provider_id: &str) -> Result<(), ProviderRegistryError> {
        let id = provider_id.trim();
        let provider = self
            .providers
            .get(id)
            .ok_or_else(|| ProviderRegistryError::ProviderNotFound(id.to_string()))?;
        self.active = Some(Arc::clone(provider));
        Ok(())
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    pub fn active_provider_id(&self) -> Option<&str> {
        self.active.as_deref().map(|provider| provider.provider_id())
    }

    pub fn active_status(&self) -> Option<ProviderStatus> {
        self.active.as_deref().map(|provider| provider.status())
    }

    pub fn auth_active(&self, request: ProviderAuthRequest) -> ProviderResult<ProviderAuthResult> {
        self.active(SyncStage::Auth)?.auth(request)
    }

    pub fn pull_active(&self, request: ProviderPullRequest) -> ProviderResult<ProviderPullResult> {
        self.active(SyncStage::Pull)?.pull(request)
    }

    pub fn push_active(&self, request: ProviderPushRequest) -> ProviderResult<ProviderPushResult> {
        self.active(SyncStage::Push)?.push(request)
    }

    pub fn sign_out_active(&self) -> ProviderResult<()> {
        self.active(SyncStage::SignOut)?.sign_out()
    }

    fn active(&self, stage: SyncStage) -> ProviderResult<&dyn ProviderSpi> {
        self.active.as_deref().ok_or_else(|| {
            ProviderErrorEnvelope::new(
                "registry",
                stage,
                "provider_not_selected",
                "No remote provider is selected.",
                false,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ProviderRegistry, ProviderRegistryError};
    use crate::clock::ManualClock;
    use crate::sync::file_drop::{FileDropProvider, FILE_DROP_PROVIDER_ID};
    use crate::sync::provider_spi::ProviderSpi;
    use crate::sync::provider_types::{
        ProviderAuthRequest, ProviderAuthResult, ProviderAuthState, ProviderHealth,
        ProviderPullRequest, ProviderPullResult, ProviderPushRequest, ProviderPushResult,
        ProviderResult, ProviderStatus,
    };
    use serde_json::json;
    use std::sync::Arc;

    /// Provider whose id is the only thing that matters.
    struct Named(&'static str);

    impl ProviderSpi for Named {
        fn provider_id(&self) -> &str {
            self.0
        }

        fn status(&self) -> ProviderStatus {
            ProviderStatus {
                provider_id: self.0.to_string(),
                health: ProviderHealth::Unavailable,
                auth_state: ProviderAuthState::SignedOut,
                last_sync_at_ms: None,
            }
        }

        fn auth(&self, _request: ProviderAuthRequest) -> ProviderResult<ProviderAuthResult> {
            Ok(ProviderAuthResult {
                state: ProviderAuthState::SignedOut,
                granted: false,
                account: None,
            })
        }

        fn sign_out(&self) -> ProviderResult<()> {
            Ok(())
        }

        fn pull(&self, request: ProviderPullRequest) -> ProviderResult<ProviderPullResult> {
            Ok(ProviderPullResult {
                changes: Vec::new(),
                next_cursor: request.cursor,
            })
        }

        fn push(&self, _request: ProviderPushRequest) -> ProviderResult<ProviderPushResult> {
            Ok(ProviderPushResult { revision: 0 })
        }
    }

    #[test]
    fn ids_must_be_usable_and_unique() {
        let mut registry = ProviderRegistry::new();
        for bad in ["File Drop", "   ", "drop!"] {
            assert!(matches!(
                registry.register(Arc::new(Named(bad))),
                Err(ProviderRegistryError::InvalidProviderId(_))
            ));
        }
        registry.register(Arc::new(Named("webdav"))).unwrap();
        assert_eq!(
            registry.register(Arc::new(Named(" webdav "))),
            Err(ProviderRegistryError::DuplicateProviderId("webdav".to_string()))
        );
    }

    #[test]
    fn nothing_is_active_until_selected() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Named("webdav"))).unwrap();
        assert!(registry.active_status().is_none());
        let err = registry
            .pull_active(ProviderPullRequest { cursor: None })
            .unwrap_err();
        assert_eq!(err.code, "provider_not_selected");

        assert_eq!(
            registry.select_active("dropbox"),
            Err(ProviderRegistryError::ProviderNotFound("dropbox".to_string()))
        );
        registry.select_active("  webdav ").unwrap();
        assert_eq!(registry.active_provider_id(), Some("webdav"));

        registry.clear_active();
        assert!(registry.sign_out_active().is_err());
    }

    #[test]
    fn active_calls_reach_the_selected_provider() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(42));
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Named("webdav"))).unwrap();
        registry
            .register(Arc::new(FileDropProvider::new(dir.path(), clock)))
            .unwrap();
        registry.select_active(FILE_DROP_PROVIDER_ID).unwrap();

        let auth = registry
            .auth_active(ProviderAuthRequest { interactive: true })
            .unwrap();
        assert!(auth.granted);
        let pushed = registry
            .push_active(ProviderPushRequest {
                origin_device: "device-a".to_string(),
                snapshot: json!({ "habits": [] }),
            })
            .unwrap();
        assert_eq!(pushed.revision, 42);
        let pulled = registry
            .pull_active(ProviderPullRequest { cursor: None })
            .unwrap();
        assert_eq!(pulled.next_cursor, Some(42));

        registry.sign_out_active().unwrap();
        let status = registry.active_status().unwrap();
        assert_eq!(status.auth_state, ProviderAuthState::SignedOut);
        assert_eq!(status.health, ProviderHealth::Healthy);
    }
}
