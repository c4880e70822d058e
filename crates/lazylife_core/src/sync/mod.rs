//! Remote sync: provider contract, registry, concrete providers and the
//! coordinator that ties them to the domain stores.

pub mod coordinator;
pub mod file_drop;
pub mod provider_registry;
pub mod provider_spi;
pub mod provider_types;

pub use coordinator::{
    next_phase, ConnectionState, SyncConfig, SyncCoordinator, SyncEffect, SyncError, SyncInput,
    SyncPhase, TickReport, Transition,
};
pub use file_drop::{FileDropProvider, FILE_DROP_PROVIDER_ID};
pub use provider_registry::{ProviderRegistry, ProviderRegistryError};
pub use provider_spi::ProviderSpi;
pub use provider_types::{
    ProviderAuthRequest, ProviderAuthResult, ProviderAuthState, ProviderErrorEnvelope,
    ProviderHealth, ProviderPullRequest, ProviderPullResult, ProviderPushRequest,
    ProviderPushResult, ProviderResult, ProviderStatus, RemoteChange, SyncStage,
};
