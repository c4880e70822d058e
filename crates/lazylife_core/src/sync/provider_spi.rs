//! Remote store service-provider interface.

use crate::sync::provider_types::{
    ProviderAuthRequest, ProviderAuthResult, ProviderPullRequest, ProviderPullResult,
    ProviderPushRequest, ProviderPushResult, ProviderResult, ProviderStatus,
};

/// One remote backend (document database, file-drop folder, ...).
///
/// Implementations are interchangeable: the coordinator only relies on this
/// contract. Calls are blocking and carry no timeout of their own.
pub trait ProviderSpi: Send + Sync {
    /// Stable lowercase id (`[a-z0-9_-]+`).
    fn provider_id(&self) -> &str;

    fn status(&self) -> ProviderStatus;

    fn auth(&self, request: ProviderAuthRequest) -> ProviderResult<ProviderAuthResult>;

    fn sign_out(&self) -> ProviderResult<()>;

    /// Uploads one full snapshot.
    fn push(&self, request: ProviderPushRequest) -> ProviderResult<ProviderPushResult>;

    /// Returns remote changes newer than the request cursor.
    fn pull(&self, request: ProviderPullRequest) -> ProviderResult<ProviderPullResult>;
}
