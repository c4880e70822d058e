use super::backup::open_stores;
use lazylife_core::sync::{
    FileDropProvider, ProviderRegistry, SyncConfig, SyncCoordinator, FILE_DROP_PROVIDER_ID,
};
use std::path::Path;
use std::sync::Arc;

/// Pulls once from `folder`; pushes the local snapshot when nothing arrived.
pub fn run_once(db: &Path, folder: &Path) -> Result<(), String> {
    let mut stores = open_stores(db)?;
    let mut registry = ProviderRegistry::new();
    registry
        .register(Arc::new(FileDropProvider::new(folder, stores.clock().clone())))
        .map_err(|err| err.to_string())?;
    let mut sync = SyncCoordinator::new(registry, &stores, SyncConfig::default());
    sync.connect(FILE_DROP_PROVIDER_ID, true)
        .map_err(|err| err.to_string())?;

    let report = sync.tick(&mut stores);
    if let Some(err) = report.errors.first() {
        return Err(format!("sync failed: {err}"));
    }
    if report.applied > 0 {
        println!("applied {} remote snapshot(s)", report.applied);
        return Ok(());
    }
    let revision = sync.sync_now(&stores).map_err(|err| err.to_string())?;
    println!("pushed revision {revision} as device {}", sync.device_id());
    Ok(())
}
