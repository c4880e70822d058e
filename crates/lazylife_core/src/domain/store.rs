//! Generic domain-store pattern.
//!
//! # Responsibility
//! - Own one storage key, hold its value in memory, persist the full value
//!   after every mutation.
//! - Provide the CRUD primitives every per-domain store is built from.
//!
//! # Invariants
//! - `load` keeps the persisted value verbatim, or the documented default
//!   when the key is absent or corrupt. It is re-invocable for reloads.
//! - List items that do not fit the entity type survive every later persist
//!   untouched. A stored value of the wrong shape is never overwritten by
//!   this store; it stays as-is until a reload reads something usable.
//! - Nothing is persisted while the store is loading, so an empty default can
//!   never overwrite not-yet-loaded storage.
//! - A failed save keeps the in-memory value; the next successful save
//!   converges storage again.

use crate::clock::Clock;
use crate::domain::changes::ChangeFeed;
use crate::domain::decode::{decode_entity, decode_object};
use crate::logging::log_safe;
use crate::model::entity::{apply_patch, Entity};
use crate::model::settings::Settings;
use crate::storage::KeyValueStore;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

/// Read-only view of the current settings, shared with every domain store.
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    /// Returns a copy of the current settings.
    pub fn get(&self) -> Settings {
        match self.inner.read() {
            Ok(settings) => settings.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(crate) fn replace(&self, settings: Settings) {
        match self.inner.write() {
            Ok(mut current) => *current = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }
}

/// Dependencies injected into every domain store.
#[derive(Clone)]
pub struct StoreContext {
    pub kv: KeyValueStore,
    pub clock: Arc<dyn Clock>,
    pub changes: ChangeFeed,
    pub settings: SettingsHandle,
}

impl StoreContext {
    pub fn new(kv: KeyValueStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            clock,
            changes: ChangeFeed::new(),
            settings: SettingsHandle::default(),
        }
    }

    pub(crate) fn now_iso(&self) -> String {
        self.clock.now_iso8601()
    }
}

/// One persisted domain key, as seen by snapshot assembly and reload.
pub trait DomainState {
    fn storage_key(&self) -> &'static str;

    /// Current in-memory value in its stored JSON shape.
    fn export_value(&self) -> Value;

    /// Re-reads the key from storage, replacing in-memory state.
    fn reload(&mut self);
}

/// Store for a list of entities under one key.
pub struct ListStore<E> {
    key: &'static str,
    ctx: StoreContext,
    items: Vec<E>,
    /// Stored items that do not fit `E`, written back after `items`.
    unparsed: Vec<Value>,
    /// Stored value that is not a list at all; blocks every persist.
    unreadable: Option<Value>,
    loading: bool,
}

impl<E: Entity> ListStore<E> {
    /// Creates the store and runs the initial load.
    pub fn open(key: &'static str, ctx: StoreContext) -> Self {
        let mut store = Self {
            key,
            ctx,
            items: Vec::new(),
            unparsed: Vec::new(),
            unreadable: None,
            loading: true,
        };
        store.load();
        store
    }

    pub fn load(&mut self) {
        self.loading = true;
        self.items = Vec::new();
        self.unparsed = Vec::new();
        self.unreadable = None;
        match self.ctx.kv.load_value(self.key) {
            Some(Value::Array(values)) => {
                for value in values {
                    match decode_entity::<E>(value) {
                        Ok(item) => self.items.push(item),
                        Err(raw) => self.unparsed.push(raw),
                    }
                }
                if !self.unparsed.is_empty() {
                    warn!(
                        "event=store_load module=domain status=partial key={} unparsed={}",
                        self.key,
                        self.unparsed.len()
                    );
                }
            }
            Some(other) => {
                warn!(
                    "event=store_load module=domain status=unreadable key={}",
                    self.key
                );
                self.unreadable = Some(other);
            }
            None => {
                debug!(
                    "event=store_load module=domain status=default key={}",
                    self.key
                );
            }
        }
        self.loading = false;
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Appends a fully-formed entity and persists.
    pub fn insert(&mut self, entity: E) -> E {
        self.items.push(entity.clone());
        self.commit();
        entity
    }

    /// Mutates the matching entity in place and persists.
    ///
    /// Returns `None` without persisting when `id` is unknown.
    pub fn update_with<R>(&mut self, id: &str, mutate: impl FnOnce(&mut E) -> R) -> Option<R> {
        let item = self.items.iter_mut().find(|item| item.id() == id)?;
        let result = mutate(item);
        self.commit();
        Some(result)
    }

    /// Shallow-merges `patch` into the matching entity.
    ///
    /// Returns `false` when `id` is unknown or the patch does not fit the
    /// entity shape; the entity is unchanged in both cases.
    pub fn patch(&mut self, id: &str, patch: &Map<String, Value>) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id() == id) else {
            return false;
        };
        match apply_patch(&self.items[index], patch) {
            Ok(next) => {
                self.items[index] = next;
                self.commit();
                true
            }
            Err(err) => {
                warn!(
                    "event=store_patch module=domain status=rejected key={} id={} error={}",
                    self.key,
                    id,
                    log_safe(&err)
                );
                false
            }
        }
    }

    /// Removes the matching entity; unknown ids are a no-op.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        if self.items.len() == before {
            return false;
        }
        self.commit();
        true
    }

    pub(crate) fn context(&self) -> &StoreContext {
        &self.ctx
    }

    /// Stored JSON shape: readable items first, then unparsed ones verbatim.
    fn stored_value(&self) -> Value {
        if let Some(raw) = &self.unreadable {
            return raw.clone();
        }
        let mut values: Vec<Value> = self
            .items
            .iter()
            .filter_map(|item| serde_json::to_value(item).ok())
            .collect();
        values.extend(self.unparsed.iter().cloned());
        Value::Array(values)
    }

    fn commit(&self) {
        if self.unreadable.is_some() {
            warn_unreadable(self.key);
            return;
        }
        persist(&self.ctx, self.key, &self.stored_value(), self.loading);
    }
}

impl<E: Entity> DomainState for ListStore<E> {
    fn storage_key(&self) -> &'static str {
        self.key
    }

    fn export_value(&self) -> Value {
        self.stored_value()
    }

    fn reload(&mut self) {
        self.load();
    }
}

/// Store for a single value (settings-like object, string, list) under one
/// key.
pub struct ObjectStore<T> {
    key: &'static str,
    ctx: StoreContext,
    value: T,
    default: fn() -> T,
    /// Stored value that cannot be read as `T`; blocks every persist.
    unreadable: Option<Value>,
    loading: bool,
}

impl<T: Serialize + DeserializeOwned + Clone> ObjectStore<T> {
    pub fn open(key: &'static str, ctx: StoreContext, default: fn() -> T) -> Self {
        let mut store = Self {
            key,
            ctx,
            value: default(),
            default,
            unreadable: None,
            loading: true,
        };
        store.load();
        store
    }

    pub fn load(&mut self) {
        self.loading = true;
        self.unreadable = None;
        self.value = match self.ctx.kv.load_value(self.key) {
            Some(stored) => match decode_object(stored, &(self.default)()) {
                Ok((value, dropped)) => {
                    if !dropped.is_empty() {
                        warn!(
                            "event=store_load module=domain status=repaired key={} fields={}",
                            self.key,
                            dropped.join(",")
                        );
                    }
                    value
                }
                Err(raw) => {
                    warn!(
                        "event=store_load module=domain status=unreadable key={}",
                        self.key
                    );
                    self.unreadable = Some(raw);
                    (self.default)()
                }
            },
            None => {
                debug!(
                    "event=store_load module=domain status=default key={}",
                    self.key
                );
                (self.default)()
            }
        };
        self.loading = false;
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.commit();
    }

    pub fn update_with<R>(&mut self, mutate: impl FnOnce(&mut T) -> R) -> R {
        let result = mutate(&mut self.value);
        self.commit();
        result
    }

    pub(crate) fn context(&self) -> &StoreContext {
        &self.ctx
    }

    fn commit(&self) {
        if self.unreadable.is_some() {
            warn_unreadable(self.key);
            return;
        }
        persist(&self.ctx, self.key, &self.value, self.loading);
    }
}

impl<T: Serialize + DeserializeOwned + Clone> DomainState for ObjectStore<T> {
    fn storage_key(&self) -> &'static str {
        self.key
    }

    fn export_value(&self) -> Value {
        match &self.unreadable {
            Some(raw) => raw.clone(),
            None => serde_json::to_value(&self.value).unwrap_or(Value::Null),
        }
    }

    fn reload(&mut self) {
        self.load();
    }
}

fn warn_unreadable(key: &str) {
    warn!("event=store_persist module=domain status=skip reason=unreadable key={key}");
}

fn persist<T: Serialize + ?Sized>(ctx: &StoreContext, key: &str, value: &T, loading: bool) {
    if loading {
        debug!("event=store_persist module=domain status=skip reason=loading key={key}");
        return;
    }
    // Storage failures are logged by `save`; memory stays authoritative.
    ctx.kv.save(key, value);
    ctx.changes.mark(ctx.clock.now_ms());
}

#[cfg(test)]
mod tests {
    use super::{DomainState, ListStore, ObjectStore, StoreContext};
    use crate::clock::ManualClock;
    use crate::model::record::Record;
    use crate::storage::KeyValueStore;
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    fn context() -> StoreContext {
        let kv = KeyValueStore::open_in_memory().expect("open kv");
        StoreContext::new(kv, Arc::new(ManualClock::new(1_000)))
    }

    fn record(value: Value) -> Record {
        serde_json::from_value(value).expect("record")
    }

    #[test]
    fn load_uses_stored_value_verbatim_or_default() {
        let ctx = context();
        ctx.kv.save("journal_v1", &json!([{ "id": "j1", "mood": 4 }]));

        let store: ListStore<Record> = ListStore::open("journal_v1", ctx.clone());
        assert_eq!(store.export_value(), json!([{ "id": "j1", "mood": 4 }]));

        let empty: ListStore<Record> = ListStore::open("time_blocks_v1", ctx);
        assert!(empty.is_empty());
    }

    #[test]
    fn mutations_persist_and_mark_changes_but_load_does_not() {
        let ctx = context();
        let mut store: ListStore<Record> = ListStore::open("journal_v1", ctx.clone());
        assert_eq!(ctx.changes.generation(), 0);

        store.insert(record(json!({ "id": "j1" })));
        assert_eq!(ctx.changes.generation(), 1);
        assert_eq!(ctx.kv.load_value("journal_v1"), Some(json!([{ "id": "j1" }])));

        store.reload();
        assert_eq!(ctx.changes.generation(), 1);
    }

    #[test]
    fn update_and_delete_of_unknown_ids_are_noops() {
        let ctx = context();
        let mut store: ListStore<Record> = ListStore::open("journal_v1", ctx.clone());
        assert!(!store.delete("missing"));
        assert!(store.update_with("missing", |_| ()).is_none());
        assert!(!store.patch("missing", &Map::new()));
        assert_eq!(ctx.changes.generation(), 0);
        assert!(ctx.kv.load_value("journal_v1").is_none());
    }

    #[test]
    fn patch_never_changes_id() {
        let ctx = context();
        let mut store: ListStore<Record> = ListStore::open("journal_v1", ctx);
        store.insert(record(json!({ "id": "j1", "title": "a" })));
        let mut patch = Map::new();
        patch.insert("id".to_string(), json!("j2"));
        patch.insert("title".to_string(), json!("b"));
        assert!(store.patch("j1", &patch));
        assert_eq!(store.get("j1").and_then(|r| r.get("title")), Some(&json!("b")));
    }

    #[test]
    fn unparsed_items_are_written_back_after_readable_ones() {
        let ctx = context();
        ctx.kv.save("journal_v1", &json!(["loose note", { "id": "j1" }]));
        let mut store: ListStore<Record> = ListStore::open("journal_v1", ctx.clone());
        assert_eq!(store.len(), 1);

        store.insert(record(json!({ "id": "j2" })));
        assert_eq!(
            ctx.kv.load_value("journal_v1"),
            Some(json!([{ "id": "j1" }, { "id": "j2" }, "loose note"]))
        );
    }

    #[test]
    fn unreadable_object_blocks_persist_until_reload() {
        let ctx = context();
        ctx.kv.save("habit_categories_v1", &json!({ "legacy": true }));
        let mut store: ObjectStore<Vec<String>> =
            ObjectStore::open("habit_categories_v1", ctx.clone(), Vec::new);
        assert!(store.get().is_empty());

        store.set(vec!["Health".to_string()]);
        assert_eq!(
            ctx.kv.load_value("habit_categories_v1"),
            Some(json!({ "legacy": true }))
        );
        assert_eq!(store.export_value(), json!({ "legacy": true }));
        assert_eq!(ctx.changes.generation(), 0);

        ctx.kv.save("habit_categories_v1", &json!(["Focus"]));
        store.reload();
        store.set(vec!["Focus".to_string(), "Health".to_string()]);
        assert_eq!(
            ctx.kv.load_value("habit_categories_v1"),
            Some(json!(["Focus", "Health"]))
        );
    }

    #[test]
    fn object_store_falls_back_to_default() {
        let ctx = context();
        let mut store = ObjectStore::open("finance_currency_v1", ctx.clone(), || json!("USD"));
        assert_eq!(store.get(), &json!("USD"));
        store.set(json!("EUR"));
        assert_eq!(ctx.kv.load_value("finance_currency_v1"), Some(json!("EUR")));
    }
}
