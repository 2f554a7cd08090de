// Connection provider for the institutional and shared SQLite databases
// Owns both handles, probes them before every use and reopens on failure

use log::{debug, info, warn};
use rusqlite::{Connection, ErrorCode, Result as SqliteResult};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use thiserror::Error;

use super::config::{default_data_dir, StorageConfig, LOCAL_DB_FILE};
use super::resources::ResourceChangeListener;
use super::schema;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },
    #[error("Database unavailable: {0}")]
    Connectivity(String),
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to get app data directory")]
    AppDataDir,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Connectivity,
    ConstraintViolation,
    InvalidArgument,
    Database,
    Io,
    Config,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => match err.code {
                ErrorCode::ConstraintViolation => ErrorKind::ConstraintViolation,
                ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked => ErrorKind::Connectivity,
                _ => ErrorKind::Database,
            },
            StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows) => ErrorKind::NotFound,
            StorageError::Sqlite(_) => ErrorKind::Database,
            StorageError::NotFound { .. } => ErrorKind::NotFound,
            StorageError::Connectivity(_) => ErrorKind::Connectivity,
            StorageError::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            StorageError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StorageError::Io(_) => ErrorKind::Io,
            StorageError::AppDataDir | StorageError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        StorageError::InvalidArgument(message.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Which schema a handle carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Local,
    Shared,
}

impl Role {
    fn label(&self) -> &'static str {
        match self {
            Role::Local => "local",
            Role::Shared => "shared",
        }
    }
}

/// A lazily reopened connection. The mutex makes probe-then-reconnect atomic.
struct Handle {
    role: Role,
    path: PathBuf,
    busy_timeout: Duration,
    connection: Mutex<Option<Connection>>,
}

impl Handle {
    fn new(role: Role, path: PathBuf, busy_timeout: Duration) -> Self {
        Self {
            role,
            path,
            busy_timeout,
            connection: Mutex::new(None),
        }
    }

    fn open(&self) -> StorageResult<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)
            .map_err(|e| StorageError::Connectivity(format!("{}: {}", self.path.display(), e)))?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Option<Connection>>> {
        self.connection
            .lock()
            .map_err(|_| StorageError::Connectivity(format!("{} connection lock poisoned", self.role.label())))
    }

    /// Lock the handle, reopening it when absent or when the probe fails.
    /// A replaced connection is closed before the new one is stored.
    fn acquire(&self) -> StorageResult<MutexGuard<'_, Option<Connection>>> {
        let mut guard = self.lock()?;
        let alive = guard.as_ref().map(is_alive).unwrap_or(false);
        if !alive {
            if let Some(stale) = guard.take() {
                warn!("{} connection failed liveness probe, reconnecting", self.role.label());
                if let Err((_, e)) = stale.close() {
                    warn!("closing stale {} connection failed: {}", self.role.label(), e);
                }
            }
            debug!("opening {} database at {}", self.role.label(), self.path.display());
            *guard = Some(self.open()?);
        }
        Ok(guard)
    }

    fn close(&self) -> StorageResult<()> {
        let mut guard = self.lock()?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StorageError::from(e))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        match self.lock() {
            Ok(guard) => guard.as_ref().map(is_alive).unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Waits at most the busy timeout set when the handle was opened
fn is_alive(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)).is_ok()
}

/// Database manager for the weather system's relational storage.
///
/// Every entity manager is an `impl DatabaseManager` block in its own module,
/// so this value is also the registry through which all of them are reached.
pub struct DatabaseManager {
    local: Handle,
    shared: Handle,
    pub(crate) listeners: RwLock<Vec<Arc<dyn ResourceChangeListener>>>,
}

impl DatabaseManager {
    /// Open (creating if needed) both databases and initialize their schemas
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let manager = Self {
            local: Handle::new(Role::Local, config.local_db_path.clone(), config.probe_timeout()),
            shared: Handle::new(Role::Shared, config.shared_db_path.clone(), config.probe_timeout()),
            listeners: RwLock::new(Vec::new()),
        };

        manager.with_connection(schema::init_local_schema)?;
        manager.with_shared_connection(schema::init_shared_schema)?;
        info!(
            "storage ready (local: {}, shared: {})",
            config.local_db_path.display(),
            config.shared_db_path.display()
        );

        Ok(manager)
    }

    /// Shorthand for `new` with explicit paths and default probe settings
    pub fn open(local_db_path: PathBuf, shared_db_path: PathBuf) -> StorageResult<Self> {
        Self::new(&StorageConfig::with_paths(local_db_path, shared_db_path))
    }

    pub fn db_path(&self) -> &Path {
        &self.local.path
    }

    pub fn shared_db_path(&self) -> &Path {
        &self.shared.path
    }

    /// Execute a function with the institutional database connection
    pub fn with_connection<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let guard = self.local.acquire()?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| StorageError::Connectivity("local connection unavailable".into()))?;
        f(conn).map_err(StorageError::from)
    }

    /// Execute a function with mutable access, needed for transactions
    pub fn with_connection_mut<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> SqliteResult<T>,
    {
        let mut guard = self.local.acquire()?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| StorageError::Connectivity("local connection unavailable".into()))?;
        f(conn).map_err(StorageError::from)
    }

    /// Execute a function with the shared database connection
    pub fn with_shared_connection<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let guard = self.shared.acquire()?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| StorageError::Connectivity("shared connection unavailable".into()))?;
        f(conn).map_err(StorageError::from)
    }

    /// Drop both handles and open fresh ones
    pub fn reconnect(&self) -> StorageResult<()> {
        self.close_connections()?;
        drop(self.local.acquire()?);
        drop(self.shared.acquire()?);
        Ok(())
    }

    /// Close both handles; the next access reopens them
    pub fn close_connections(&self) -> StorageResult<()> {
        self.local.close()?;
        self.shared.close()?;
        debug!("database connections closed");
        Ok(())
    }

    pub fn is_local_connection_open(&self) -> bool {
        self.local.is_open()
    }

    pub fn is_shared_connection_open(&self) -> bool {
        self.shared.is_open()
    }
}

/// Get the default database paths in the app data directory
pub fn get_default_db_path() -> StorageResult<PathBuf> {
    Ok(default_data_dir()?.join(LOCAL_DB_FILE))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    /// Fresh database pair in the temp dir; returns paths for cleanup
    pub fn create_test_db() -> (DatabaseManager, Vec<PathBuf>) {
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir();
        let local = dir.join(format!("weather_test_{}_{}.db", std::process::id(), id));
        let shared = dir.join(format!("weather_test_shared_{}_{}.db", std::process::id(), id));
        let _ = std::fs::remove_file(&local);
        let _ = std::fs::remove_file(&shared);
        let manager = DatabaseManager::open(local.clone(), shared.clone()).unwrap();
        (manager, vec![local, shared])
    }

    pub fn cleanup(manager: DatabaseManager, paths: Vec<PathBuf>) {
        drop(manager);
        for path in paths {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_database_creation() {
        let (manager, paths) = create_test_db();

        assert!(paths[0].exists());
        assert!(paths[1].exists());
        assert_eq!(manager.db_path(), paths[0].as_path());
        assert!(manager.is_local_connection_open());
        assert!(manager.is_shared_connection_open());

        cleanup(manager, paths);
    }

    #[test]
    fn test_schema_initialization() {
        let (manager, paths) = create_test_db();

        manager
            .with_connection(|conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                     ('users', 'courses', 'enrollment', 'bookmarks', 'bookmark_categories', 'bookmark_types')",
                    [],
                    |row| row.get(0),
                )?;
                assert_eq!(count, 6);
                Ok(())
            })
            .unwrap();

        manager
            .with_shared_connection(|conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = 'versions'",
                    [],
                    |row| row.get(0),
                )?;
                assert_eq!(count, 1);
                Ok(())
            })
            .unwrap();

        cleanup(manager, paths);
    }

    #[test]
    fn test_closed_connection_reopens_on_next_use() {
        let (manager, paths) = create_test_db();

        manager.close_connections().unwrap();
        assert!(!manager.is_local_connection_open());
        assert!(!manager.is_shared_connection_open());

        let one: i64 = manager
            .with_connection(|conn| conn.query_row("SELECT 1", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(one, 1);
        assert!(manager.is_local_connection_open());

        manager.reconnect().unwrap();
        assert!(manager.is_shared_connection_open());

        cleanup(manager, paths);
    }

    #[test]
    fn test_busy_timeout_is_set_once_per_open() {
        let (manager, paths) = create_test_db();
        let busy_ms = |m: &DatabaseManager| -> i64 {
            m.with_connection(|conn| conn.query_row("PRAGMA busy_timeout", [], |row| row.get(0)))
                .unwrap()
        };

        assert_eq!(busy_ms(&manager), 4000);

        // the liveness probe on later accesses leaves a caller's setting alone
        manager
            .with_connection(|conn| conn.busy_timeout(Duration::from_millis(250)))
            .unwrap();
        assert_eq!(busy_ms(&manager), 250);
        assert_eq!(busy_ms(&manager), 250);

        manager.reconnect().unwrap();
        assert!(manager.is_local_connection_open());
        assert_eq!(busy_ms(&manager), 4000);

        cleanup(manager, paths);
    }

    #[test]
    fn test_error_kind_classification() {
        let (manager, paths) = create_test_db();

        let err = manager
            .with_connection(|conn| {
                conn.execute("INSERT INTO enrollment (userNumber, courseNumber) VALUES (1, 1)", [])?;
                conn.execute("INSERT INTO enrollment (userNumber, courseNumber) VALUES (1, 1)", [])
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

        assert_eq!(StorageError::invalid("x").kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            StorageError::from(rusqlite::Error::QueryReturnedNoRows).kind(),
            ErrorKind::NotFound
        );

        cleanup(manager, paths);
    }
}
