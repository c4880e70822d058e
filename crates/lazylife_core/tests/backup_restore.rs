use lazylife_core::backup::{
    assemble, deserialize, serialize_pretty, validate, ImportError, RestoreEngine, DOMAIN_TABLE,
};
use lazylife_core::clock::ManualClock;
use lazylife_core::domain::DomainStores;
use lazylife_core::model::habit::NewHabit;
use lazylife_core::model::task::NewTask;
use lazylife_core::storage::{keys, KeyValueStore};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const JAN_1_2024_MS: i64 = 1_704_067_200_000;

fn populated_stores(clock: Arc<ManualClock>) -> DomainStores {
    let mut stores = DomainStores::open(KeyValueStore::open_in_memory().unwrap(), clock);
    let habit = stores.habits.add(NewHabit::named("Read")).unwrap();
    stores.habits.toggle_on(&habit.id, "2024-01-01").unwrap();
    stores.habits.add_category("Reading");
    stores.tasks.add(NewTask {
        subtasks: vec!["Outline".to_string()],
        ..NewTask::titled("Write report")
    });
    let mut entry = Map::new();
    entry.insert("content".to_string(), json!("First entry"));
    stores.journal.add(entry);
    stores
        .sleep
        .settings
        .set(json!({ "targetHours": 7, "bedtime": "22:30", "wakeTime": "05:30" }));
    stores
}

#[test]
fn snapshot_survives_replace_into_an_empty_store() {
    let clock = Arc::new(ManualClock::new(JAN_1_2024_MS));
    let source = populated_stores(clock.clone());
    let exported = serialize_pretty(&assemble(&source, clock.as_ref()));

    let target_kv = KeyValueStore::open_in_memory().unwrap();
    let imported = deserialize(&exported).unwrap();
    RestoreEngine::new(target_kv.clone())
        .replace(&imported)
        .unwrap();

    let restored = DomainStores::open(target_kv, clock.clone());
    let before = assemble(&source, clock.as_ref());
    let after = assemble(&restored, clock.as_ref());
    for spec in DOMAIN_TABLE {
        assert_eq!(before.domain(spec), after.domain(spec), "{}", spec.name());
    }
    assert_eq!(restored.habits.all().len(), 1);
    assert_eq!(restored.habits.categories().len(), 5);
    assert_eq!(
        restored.habits.categories().last().map(String::as_str),
        Some("Reading")
    );
}

#[test]
fn merging_the_same_snapshot_twice_adds_nothing_the_second_time() {
    let clock = Arc::new(ManualClock::new(JAN_1_2024_MS));
    let source = populated_stores(clock.clone());
    let snapshot = assemble(&source, clock.as_ref());

    let target_kv = KeyValueStore::open_in_memory().unwrap();
    let engine = RestoreEngine::new(target_kv.clone());
    let first = engine.merge(&snapshot).unwrap();
    assert_eq!(first.habits_added(), 1);
    assert_eq!(first.tasks_added(), 1);
    assert_eq!(first.added_for("journal"), 1);

    let habits_after_first = target_kv.load_value(keys::HABITS);
    let second = engine.merge(&snapshot).unwrap();
    assert_eq!(second.total_added(), 0);
    assert_eq!(target_kv.load_value(keys::HABITS), habits_after_first);
}

#[test]
fn merge_keeps_local_versions_and_adds_unknown_ids() {
    let kv = KeyValueStore::open_in_memory().unwrap();
    kv.save(keys::TASKS, &json!([{ "id": "t1", "title": "A" }]));
    let snapshot = validate(&json!({
        "version": "2.0.0",
        "settings": {},
        "habits": [],
        "tasks": [
            { "id": "t1", "title": "B" },
            { "id": "t2", "title": "C" }
        ]
    }))
    .unwrap();

    let report = RestoreEngine::new(kv.clone()).merge(&snapshot).unwrap();

    assert_eq!(report.tasks_added(), 1);
    assert_eq!(
        kv.load_value(keys::TASKS),
        Some(json!([
            { "id": "t1", "title": "A" },
            { "id": "t2", "title": "C" }
        ]))
    );
}

#[test]
fn replace_leaves_domains_missing_from_the_backup_untouched() {
    let kv = KeyValueStore::open_in_memory().unwrap();
    let journal = json!([{ "id": "j1", "content": "keep me" }]);
    kv.save(keys::JOURNAL, &journal);
    kv.save(keys::HABITS, &json!([{ "id": "old", "name": "Old" }]));
    let snapshot = validate(&json!({
        "version": "2.0.0",
        "settings": { "userName": "Sam" },
        "habits": [{ "id": "h1", "name": "Walk" }],
        "tasks": []
    }))
    .unwrap();

    let report = RestoreEngine::new(kv.clone()).replace(&snapshot).unwrap();

    assert_eq!(report.written, vec![keys::SETTINGS, keys::HABITS, keys::TASKS]);
    assert_eq!(kv.load_value(keys::JOURNAL), Some(journal));
    assert_eq!(
        kv.load_value(keys::HABITS),
        Some(json!([{ "id": "h1", "name": "Walk" }]))
    );
}

#[test]
fn invalid_file_is_rejected_before_any_write() {
    let kv = KeyValueStore::open_in_memory().unwrap();
    kv.save(keys::TASKS, &json!([{ "id": "t1", "title": "A" }]));
    let keys_before = kv.keys();

    let err = deserialize(r#"{"foo":1}"#).unwrap_err();
    assert!(matches!(err, ImportError::Validation(_)));

    let err = deserialize("{ not json").unwrap_err();
    assert!(matches!(err, ImportError::Parse(_)));

    assert_eq!(kv.keys(), keys_before);
    assert_eq!(
        kv.load_value(keys::TASKS),
        Some(json!([{ "id": "t1", "title": "A" }]))
    );
}

#[test]
fn assembled_snapshot_from_empty_store_validates() {
    let clock = Arc::new(ManualClock::new(JAN_1_2024_MS));
    let stores = DomainStores::open(KeyValueStore::open_in_memory().unwrap(), clock.clone());
    let value = assemble(&stores, clock.as_ref()).into_value();

    let snapshot = validate(&value).unwrap();
    assert_eq!(snapshot.version(), Some("2.0.0"));
    assert_eq!(snapshot.export_date(), Some("2024-01-01T00:00:00.000Z"));
    assert_eq!(value["habits"], Value::Array(Vec::new()));
    assert!(value["finance"].is_object());
}
