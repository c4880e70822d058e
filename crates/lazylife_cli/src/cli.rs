use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lazylife")]
#[command(about = "LazyLife local data maintenance")]
pub struct Cli {
    /// SQLite database file. Falls back to `LAZYLIFE_DB_PATH`, then the temp dir.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Write rolling logs into this absolute directory.
    #[arg(long = "log-dir", global = true)]
    pub log_dir: Option<String>,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Prints core linkage information.
    Ping,
    /// Writes a full backup file.
    Export {
        #[arg(long = "out-dir", default_value = ".")]
        out_dir: PathBuf,
    },
    /// Restores a backup file.
    Import {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = StrategyArg::Merge)]
        strategy: StrategyArg,
        /// Required for `replace`, which overwrites local data.
        #[arg(long)]
        yes: bool,
    },
    /// Lists or restores automatic backups.
    Backups {
        #[command(subcommand)]
        cmd: BackupsCmd,
    },
    /// Deletes every stored key.
    Reset {
        /// Must be exactly `DELETE ALL DATA`.
        #[arg(long)]
        confirm: String,
    },
    /// One sync round against a shared folder: pull, then push if nothing arrived.
    Sync {
        #[arg(long)]
        folder: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum BackupsCmd {
    List,
    /// Takes an automatic backup now if one is due.
    Run,
    Restore {
        #[arg(long)]
        index: usize,
        #[arg(long, value_enum, default_value_t = StrategyArg::Merge)]
        strategy: StrategyArg,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Merge,
    Replace,
}
