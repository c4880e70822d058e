//! Maintenance CLI for a LazyLife database.
//!
//! # Responsibility
//! - Export, import and auto-backup management outside the app.
//! - Guard destructive operations behind explicit confirmation.

mod cli;
mod commands {
    pub mod backup;
    pub mod sync;
}

use clap::Parser;
use cli::{BackupsCmd, Cli, Command};
use lazylife_core::{default_log_level, init_logging};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

const DB_FILE_NAME: &str = "lazylife.sqlite3";

fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    match std::env::var("LAZYLIFE_DB_PATH") {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ => std::env::temp_dir().join(DB_FILE_NAME),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = init_logging(default_log_level(), log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let db = resolve_db_path(cli.db);
    let command = command_name(&cli.cmd);
    let result = match cli.cmd {
        Command::Ping => {
            println!("lazylife_core ping={}", lazylife_core::ping());
            println!("lazylife_core version={}", lazylife_core::core_version());
            Ok(())
        }
        Command::Export { out_dir } => commands::backup::run_export(&db, &out_dir),
        Command::Import {
            file,
            strategy,
            yes,
        } => commands::backup::run_import(&db, &file, strategy, yes),
        Command::Backups { cmd } => match cmd {
            BackupsCmd::List => commands::backup::run_list(&db),
            BackupsCmd::Run => commands::backup::run_auto(&db),
            BackupsCmd::Restore {
                index,
                strategy,
                yes,
            } => commands::backup::run_restore_auto(&db, index, strategy, yes),
        },
        Command::Reset { confirm } => commands::backup::run_reset(&db, &confirm),
        Command::Sync { folder } => commands::sync::run_once(&db, &folder),
    };

    match result {
        Ok(()) => {
            info!("event=cli_run module=cli status=ok command={command}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!("event=cli_run module=cli status=error command={command}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn command_name(cmd: &Command) -> &'static str {
    match cmd {
        Command::Ping => "ping",
        Command::Export { .. } => "export",
        Command::Import { .. } => "import",
        Command::Backups { .. } => "backups",
        Command::Reset { .. } => "reset",
        Command::Sync { .. } => "sync",
    }
}
