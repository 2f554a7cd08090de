// Data-access layer for the weather observation teaching system

pub mod logging;
pub mod storage;

pub use storage::{DatabaseManager, StorageConfig, StorageError, StorageResult};

/// Load configuration (file if given, then environment), install the logger
/// at the configured level and open both databases.
pub fn open(config_path: Option<&std::path::Path>) -> StorageResult<DatabaseManager> {
    let config = match config_path {
        Some(path) => StorageConfig::load(path)?,
        None => StorageConfig::default(),
    }
    .apply_env()?;

    let level = config.log_level_filter()?;
    if logging::init_logger(level).is_err() {
        log::debug!("logger already installed");
    }

    DatabaseManager::new(&config)
}
