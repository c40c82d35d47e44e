use crate::db::DbError;
use crate::db::db_pool::Database;
use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use std::time::Instant;
use tracing::{debug, info};

/// Column names plus stringified rows of one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub struct QueryExecutor {
    db: Database,
}

impl QueryExecutor {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Runs `sql` as given. The statement kind is not checked.
    pub async fn execute(&self, sql: &str) -> Result<ResultSet, DbError> {
        let db = self.db.clone();
        let sql = sql.to_string();
        info!("Executing SQL query: {}", sql);

        tokio::task::spawn_blocking(move || -> Result<ResultSet, DbError> {
            let start_time = Instant::now();
            let conn = db.get()?;
            let mut stmt = conn.prepare(&sql)?;
            let arrow_batch = stmt.query_arrow([])?;

            let columns = arrow_batch
                .get_schema()
                .fields()
                .iter()
                .map(|field| field.name().clone())
                .collect::<Vec<String>>();

            let mut rows = Vec::new();
            for batch in arrow_batch {
                for row in 0..batch.num_rows() {
                    let values = batch
                        .columns()
                        .iter()
                        .map(|column| render_cell(column.as_ref(), row))
                        .collect::<Result<Vec<_>, _>>()?;
                    rows.push(values);
                }
            }

            debug!(
                "Query returned {} rows in {}ms",
                rows.len(),
                start_time.elapsed().as_millis()
            );
            Ok(ResultSet { columns, rows })
        })
        .await?
    }
}

fn render_cell(column: &dyn Array, row: usize) -> Result<String, arrow::error::ArrowError> {
    if column.is_null(row) {
        return Ok("NULL".to_string());
    }
    array_value_to_string(column, row)
}
