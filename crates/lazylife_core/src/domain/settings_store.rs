//! Settings singleton store.

use crate::domain::store::{DomainState, ObjectStore, StoreContext};
use crate::domain::DomainError;
use crate::model::settings::Settings;
use crate::storage::keys;
use log::info;
use serde_json::{Map, Value};

/// Owns `settings_v1` and publishes every change to the shared
/// `SettingsHandle`.
pub struct SettingsStore {
    inner: ObjectStore<Settings>,
}

impl SettingsStore {
    pub fn open(ctx: StoreContext) -> Self {
        let store = Self {
            inner: ObjectStore::open(keys::SETTINGS, ctx.clone(), Settings::default),
        };
        ctx.settings.replace(store.inner.get().clone());
        store
    }

    pub fn settings(&self) -> &Settings {
        self.inner.get()
    }

    /// Applies a one-level deep-merge patch and persists the result.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidSettings` when the merged document does not
    /// fit the settings shape; nothing is persisted then.
    pub fn update_settings(&mut self, patch: &Map<String, Value>) -> Result<Settings, DomainError> {
        let next = self
            .inner
            .get()
            .merged_with(patch)
            .map_err(DomainError::InvalidSettings)?;
        self.inner.set(next.clone());
        self.publish();
        info!(
            "event=settings_update module=domain status=ok fields={}",
            patch.len()
        );
        Ok(next)
    }

    /// Restores factory-default settings.
    pub fn reset_to_defaults(&mut self) {
        self.inner.set(Settings::default());
        self.publish();
    }

    fn publish(&self) {
        self.inner.context().settings.replace(self.inner.get().clone());
    }
}

impl DomainState for SettingsStore {
    fn storage_key(&self) -> &'static str {
        self.inner.storage_key()
    }

    fn export_value(&self) -> Value {
        self.inner.export_value()
    }

    fn reload(&mut self) {
        self.inner.reload();
        self.publish();
    }
}
