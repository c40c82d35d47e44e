pub mod db_pool;
pub mod executor;
pub mod schema;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    DuckDb(#[from] duckdb::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("could not render value: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("database file not found: {0}")]
    NotFound(String),
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
