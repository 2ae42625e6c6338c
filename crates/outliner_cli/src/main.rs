//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `outliner_core` linkage, configuration and store bootstrap.
//! - Keep output deterministic for quick local sanity checks.

use log::info;
use outliner_core::db::open_db;
use outliner_core::{CoreConfig, NoteRepository, SqliteNoteRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("outliner_core ping={}", outliner_core::ping());
    println!("outliner_core version={}", outliner_core::core_version());

    let config = CoreConfig::from_env();
    match outliner_core::init_from_config(&config) {
        Ok(true) => println!("logging level={}", config.log_level),
        Ok(false) => println!("logging disabled"),
        Err(err) => {
            eprintln!("logging init failed: {err}");
            return ExitCode::FAILURE;
        }
    }

    match report_store(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn report_store(config: &CoreConfig) -> Result<(), String> {
    let conn = open_db(&config.db_path).map_err(|err| format!("store open failed: {err}"))?;
    let repo =
        SqliteNoteRepository::try_new(&conn).map_err(|err| format!("store init failed: {err}"))?;
    let revision = repo.store_id().map_err(|err| err.to_string())?;
    let notes = repo.note_count().map_err(|err| err.to_string())?;

    info!("event=cli_probe module=cli status=ok revision={revision} notes={notes}");
    println!("store path={}", config.db_path.display());
    println!("store revision={revision} notes={notes}");
    Ok(())
}
