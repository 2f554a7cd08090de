// Storage configuration
// Database locations and connection probe settings, loaded from JSON with env overrides

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::database::{StorageError, StorageResult};

pub const LOCAL_DB_ENV: &str = "WEATHER_DBMS_LOCAL_DB";
pub const SHARED_DB_ENV: &str = "WEATHER_DBMS_SHARED_DB";
pub const PROBE_TIMEOUT_ENV: &str = "WEATHER_DBMS_PROBE_TIMEOUT";
pub const LOG_LEVEL_ENV: &str = "WEATHER_DBMS_LOG_LEVEL";

pub(crate) const LOCAL_DB_FILE: &str = "weather.db";
const SHARED_DB_FILE: &str = "weather_shared.db";

/// Where the two databases live and how long a liveness probe may block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Institutional database: users, courses, bookmarks, resources...
    pub local_db_path: PathBuf,
    /// Shared database holding release versions
    pub shared_db_path: PathBuf,
    pub probe_timeout_secs: u64,
    pub log_level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_data_dir().unwrap_or_else(|_| std::env::temp_dir());
        Self {
            local_db_path: data_dir.join(LOCAL_DB_FILE),
            shared_db_path: data_dir.join(SHARED_DB_FILE),
            probe_timeout_secs: 4,
            log_level: "info".to_string(),
        }
    }
}

impl StorageConfig {
    /// Config pointing both databases at explicit paths
    pub fn with_paths(local: impl Into<PathBuf>, shared: impl Into<PathBuf>) -> Self {
        Self {
            local_db_path: local.into(),
            shared_db_path: shared.into(),
            ..Self::default()
        }
    }

    /// Read a JSON config file. Keys left out keep their defaults.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| StorageError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply `WEATHER_DBMS_*` environment overrides
    pub fn apply_env(mut self) -> StorageResult<Self> {
        if let Ok(path) = std::env::var(LOCAL_DB_ENV) {
            self.local_db_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(SHARED_DB_ENV) {
            self.shared_db_path = PathBuf::from(path);
        }
        if let Ok(secs) = std::env::var(PROBE_TIMEOUT_ENV) {
            self.probe_timeout_secs = secs.trim().parse().map_err(|_| {
                StorageError::Config(format!("{} must be a whole number of seconds, got {:?}", PROBE_TIMEOUT_ENV, secs))
            })?;
        }
        if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
            self.log_level = level;
        }
        Ok(self)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn log_level_filter(&self) -> StorageResult<log::LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| StorageError::Config(format!("unknown log level {:?}", self.log_level)))
    }
}

pub(crate) fn default_data_dir() -> StorageResult<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("edu", "weather", "weather-dbms")
        .ok_or(StorageError::AppDataDir)?;
    Ok(proj_dirs.data_dir().to_path_buf())
}
