//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `splitledger_core` linkage.
//! - Print a one-shot summary of a ledger database when asked.
//!
//! Usage: `splitledger_cli [--config <file.json>] [<ledger.db>]`

use clap::Parser;
use log::{error, info};
use splitledger_core::db::open_db;
use splitledger_core::service::ledger::SystemTimeSource;
use splitledger_core::{
    init_logging_from_config, AppConfig, LedgerStore, SqliteKeyValueRepository,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Linkage probe and ledger summary for splitledger.
#[derive(Debug, Parser)]
#[command(name = "splitledger_cli", version)]
struct Args {
    /// JSON config file (log level/dir, db path, bridge knobs).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ledger database to summarize; overrides `db_path` from the config.
    db: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    println!("splitledger_core ping={}", splitledger_core::ping());
    println!("splitledger_core version={}", splitledger_core::core_version());

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_run module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => AppConfig::load(path).map_err(|err| err.to_string())?,
        None => AppConfig::default(),
    };

    init_logging_from_config(&config)?;

    let Some(path) = args.db.or_else(|| config.db_path.as_ref().map(PathBuf::from)) else {
        return Ok(());
    };

    let conn = open_db(&path).map_err(|err| err.to_string())?;
    let repo = SqliteKeyValueRepository::new(&conn);
    let store = LedgerStore::load(repo, SystemTimeSource).map_err(|err| err.to_string())?;
    let summary = store.summary();

    info!(
        "event=cli_summary module=cli status=ok friends={} splits={}",
        summary.friends,
        summary.active_splits + summary.settled_splits
    );
    println!("friends={}", summary.friends);
    println!("active_splits={}", summary.active_splits);
    println!("settled_splits={}", summary.settled_splits);
    println!("outstanding={}", summary.outstanding);
    println!("points={}", summary.points);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn parses_config_and_db_path() {
        let args = Args::try_parse_from(["splitledger_cli", "--config", "app.json", "ledger.db"])
            .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("app.json")));
        assert_eq!(args.db, Some(PathBuf::from("ledger.db")));
    }

    #[test]
    fn unknown_flags_are_rejected_not_opened() {
        assert!(Args::try_parse_from(["splitledger_cli", "--verbose"]).is_err());
    }

    #[test]
    fn help_is_not_a_db_path() {
        let err = Args::try_parse_from(["splitledger_cli", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
