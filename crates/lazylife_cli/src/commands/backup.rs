use crate::cli::StrategyArg;
use lazylife_core::backup::{
    assemble, backup_file_name, deserialize, factory_reset, serialize_pretty, AutoBackupConfig,
    AutoBackups, BackupData, RestoreEngine,
};
use lazylife_core::clock::{Clock, SystemClock};
use lazylife_core::domain::DomainStores;
use lazylife_core::storage::KeyValueStore;
use std::path::Path;
use std::sync::Arc;

pub fn open_kv(db: &Path) -> Result<KeyValueStore, String> {
    KeyValueStore::open(db).map_err(|err| format!("cannot open `{}`: {err}", db.display()))
}

pub fn open_stores(db: &Path) -> Result<DomainStores, String> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Ok(DomainStores::open(open_kv(db)?, clock))
}

pub fn run_export(db: &Path, out_dir: &Path) -> Result<(), String> {
    let stores = open_stores(db)?;
    let clock = stores.clock().clone();
    let snapshot = assemble(&stores, clock.as_ref());
    std::fs::create_dir_all(out_dir)
        .map_err(|err| format!("cannot create `{}`: {err}", out_dir.display()))?;
    let target = out_dir.join(backup_file_name(clock.as_ref()));
    std::fs::write(&target, serialize_pretty(&snapshot))
        .map_err(|err| format!("cannot write `{}`: {err}", target.display()))?;
    println!("backup written: {}", target.display());
    Ok(())
}

pub fn run_import(db: &Path, file: &Path, strategy: StrategyArg, yes: bool) -> Result<(), String> {
    require_confirmation(strategy, yes)?;
    let text = std::fs::read_to_string(file)
        .map_err(|err| format!("cannot read `{}`: {err}", file.display()))?;
    let snapshot = deserialize(&text).map_err(|err| format!("invalid backup file: {err}"))?;
    restore(open_kv(db)?, &snapshot, strategy)
}

pub fn run_list(db: &Path) -> Result<(), String> {
    let entries = AutoBackups::new(open_kv(db)?, AutoBackupConfig::default()).entries();
    if entries.is_empty() {
        println!("no auto backups");
    }
    for (index, entry) in entries.iter().enumerate() {
        println!("{index}\t{}", entry.created_at);
    }
    Ok(())
}

pub fn run_auto(db: &Path) -> Result<(), String> {
    let stores = open_stores(db)?;
    let backups = AutoBackups::new(stores.kv().clone(), AutoBackupConfig::default());
    match backups.run_if_due(&stores) {
        Some(entry) => println!("auto backup saved at {}", entry.created_at),
        None => println!("auto backup skipped (disabled or not due)"),
    }
    Ok(())
}

pub fn run_restore_auto(
    db: &Path,
    index: usize,
    strategy: StrategyArg,
    yes: bool,
) -> Result<(), String> {
    require_confirmation(strategy, yes)?;
    let kv = open_kv(db)?;
    let snapshot = AutoBackups::new(kv.clone(), AutoBackupConfig::default())
        .snapshot_at(index)
        .ok_or_else(|| format!("no auto backup at position {index}"))?;
    restore(kv, &snapshot, strategy)
}

pub fn run_reset(db: &Path, confirm: &str) -> Result<(), String> {
    factory_reset(&open_kv(db)?, confirm).map_err(|err| err.to_string())?;
    println!("all data deleted");
    Ok(())
}

fn require_confirmation(strategy: StrategyArg, yes: bool) -> Result<(), String> {
    if strategy == StrategyArg::Replace && !yes {
        return Err("replace overwrites local data; pass --yes to continue".to_string());
    }
    Ok(())
}

fn restore(kv: KeyValueStore, snapshot: &BackupData, strategy: StrategyArg) -> Result<(), String> {
    let engine = RestoreEngine::new(kv);
    match strategy {
        StrategyArg::Replace => {
            let report = engine
                .replace(snapshot)
                .map_err(|err| format!("restore failed: {err}"))?;
            println!("replaced {} data sets", report.written.len());
        }
        StrategyArg::Merge => {
            let report = engine
                .merge(snapshot)
                .map_err(|err| format!("restore failed: {err}"))?;
            println!(
                "merged: {} habits, {} tasks, {} items in total",
                report.habits_added(),
                report.tasks_added(),
                report.total_added()
            );
            if report.skipped_without_id > 0 {
                println!("skipped {} items without an id", report.skipped_without_id);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run_export, run_import, run_reset};
    use crate::cli::StrategyArg;
    use lazylife_core::storage::{keys, KeyValueStore};
    use serde_json::json;

    #[test]
    fn replace_without_yes_is_refused_before_reading_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("cli.sqlite3");
        let err = run_import(&db, &dir.path().join("missing.json"), StrategyArg::Replace, false)
            .expect_err("needs --yes");
        assert!(err.contains("--yes"));
    }

    #[test]
    fn export_then_merge_import_into_another_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("source.sqlite3");
        KeyValueStore::open(&source)
            .expect("open source")
            .save(keys::TASKS, &json!([{ "id": "t1", "title": "carry over" }]));

        let out_dir = dir.path().join("out");
        run_export(&source, &out_dir).expect("export");
        let file = std::fs::read_dir(&out_dir)
            .expect("list out dir")
            .next()
            .expect("one backup file")
            .expect("dir entry")
            .path();

        let target = dir.path().join("target.sqlite3");
        run_import(&target, &file, StrategyArg::Merge, false).expect("import");
        let tasks = KeyValueStore::open(&target)
            .expect("open target")
            .load_value(keys::TASKS)
            .expect("tasks written");
        assert_eq!(tasks[0]["id"], "t1");
    }

    #[test]
    fn reset_with_wrong_phrase_keeps_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = dir.path().join("cli.sqlite3");
        KeyValueStore::open(&db)
            .expect("open")
            .save(keys::HABITS, &json!([]));
        assert!(run_reset(&db, "yes").is_err());
        assert!(KeyValueStore::open(&db).expect("open").contains(keys::HABITS));
    }
}
