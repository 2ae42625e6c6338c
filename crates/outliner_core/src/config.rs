//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve store, logging and session file locations once at startup.
//!
//! # Invariants
//! - Blank or whitespace-only values fall back to defaults.
//! - Resolution never fails; an unsupported log level is reported later by
//!   `init_logging`.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "OUTLINER_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "OUTLINER_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "OUTLINER_LOG_DIR";
pub const SESSION_PATH_ENV: &str = "OUTLINER_SESSION_PATH";

const DEFAULT_DB_FILE_NAME: &str = "outliner.sqlite3";
const DEFAULT_SESSION_FILE_NAME: &str = "outliner_session.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub session_path: PathBuf,
}

impl CoreConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        Self {
            db_path: value(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level: value(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: value(LOG_DIR_ENV).map(PathBuf::from),
            session_path: value(SESSION_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_SESSION_FILE_NAME)),
        }
    }
}
