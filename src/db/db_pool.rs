use crate::config::DatabaseConfig;
use crate::db::DbError;
use duckdb::{AccessMode, Config, Connection};
use r2d2::{ManageConnection, Pool, PooledConnection};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

/// Hands out clones of one DuckDB connection so every pooled connection sees
/// the same database instance, including `:memory:` databases.
#[derive(Debug)]
pub struct DuckDBConnectionManager {
    connection: Arc<Mutex<Connection>>,
}

impl DuckDBConnectionManager {
    pub fn open(connection_string: &str, read_only: bool) -> Result<Self, duckdb::Error> {
        let mut config = Config::default();
        if read_only {
            config = config.access_mode(AccessMode::ReadOnly)?;
        }

        let connection = if connection_string == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(connection_string, config)?
        };

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_clone()
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

pub fn build_pool(config: &DatabaseConfig) -> Result<Pool<DuckDBConnectionManager>, DbError> {
    info!(
        "Opening DuckDB database {} (read_only: {})",
        config.connection_string, config.read_only
    );
    // Only existing files are opened; DuckDB would otherwise create an empty one
    if config.connection_string != ":memory:" && !Path::new(&config.connection_string).is_file() {
        return Err(DbError::NotFound(config.connection_string.clone()));
    }
    let manager = DuckDBConnectionManager::open(&config.connection_string, config.read_only)?;
    let pool = Pool::builder()
        .max_size(config.pool_size)
        .build(manager)?;
    Ok(pool)
}

/// Connection pool, or the reason the database could not be opened. An open
/// failure is reported to whoever asks for a connection.
#[derive(Clone)]
pub struct Database {
    pool: Result<Pool<DuckDBConnectionManager>, Arc<str>>,
}

impl Database {
    pub fn open(config: &DatabaseConfig) -> Self {
        match build_pool(config) {
            Ok(pool) => Self::from(pool),
            Err(e) => {
                error!("Failed to open database {}: {}", config.connection_string, e);
                Self {
                    pool: Err(e.to_string().into()),
                }
            }
        }
    }

    pub fn get(&self) -> Result<PooledConnection<DuckDBConnectionManager>, DbError> {
        match &self.pool {
            Ok(pool) => Ok(pool.get()?),
            Err(reason) => Err(DbError::Unavailable(reason.to_string())),
        }
    }
}

impl From<Pool<DuckDBConnectionManager>> for Database {
    fn from(pool: Pool<DuckDBConnectionManager>) -> Self {
        Self { pool: Ok(pool) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn file_config(path: &Path, read_only: bool) -> DatabaseConfig {
        DatabaseConfig {
            connection_string: path.to_string_lossy().into_owned(),
            read_only,
            ..AppConfig::default().database
        }
    }

    #[test]
    fn missing_file_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.duckdb");

        let err = build_pool(&file_config(&path, false)).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
        assert!(!path.exists());
    }

    #[test]
    fn failed_open_is_reported_on_use() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&file_config(&dir.path().join("missing.duckdb"), true));

        let err = db.get().err().unwrap();
        assert!(matches!(err, DbError::Unavailable(_)));
        assert!(err.to_string().contains("missing.duckdb"));
    }

    #[test]
    fn opens_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("company.duckdb");
        duckdb::Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE t (x INTEGER);")
            .unwrap();

        let db = Database::open(&file_config(&path, true));
        let count: i64 = db
            .get()
            .unwrap()
            .query_row("SELECT count(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
