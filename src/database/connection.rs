/*!
 * Database connection management.
 *
 * This module handles SQLite connection creation and provides async-safe
 * access patterns using tokio's spawn_blocking.
 */

use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::StoreError;

/// How long SQLite waits on a locked database file before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper with thread-safe access
#[derive(Clone)]
pub struct DatabaseConnection {
    /// Path to the database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open an existing database file.
    ///
    /// The file must already exist; the row store never creates tables.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();

        if !db_path.exists() {
            return Err(StoreError::Connection(format!(
                "Database file does not exist: {:?}",
                db_path
            )));
        }

        info!("Opening database at: {:?}", db_path);

        let conn = Connection::open(&db_path)
            .map_err(|e| StoreError::Connection(format!("Failed to open database {:?}: {}", db_path, e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, StoreError> {
        debug!("Creating in-memory database");

        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connection(format!("Failed to create in-memory database: {}", e)))?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a database operation with the connection
    ///
    /// This method acquires the mutex lock and executes the provided closure
    /// with access to the connection. For async contexts, use `execute_async`.
    pub fn execute<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self
            .connection
            .lock()
            .map_err(|e| StoreError::Connection(format!("Failed to acquire database lock: {}", e)))?;

        f(&conn)
    }

    /// Execute a database operation asynchronously using spawn_blocking
    ///
    /// This is the preferred method for async contexts as it prevents
    /// blocking the async runtime.
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Connection(format!("Failed to acquire database lock: {}", e)))?;

            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Connection(format!("Database task panicked: {}", e)))?
    }
}
