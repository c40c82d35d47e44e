use crate::db::DbError;
use crate::db::db_pool::Database;
use duckdb::Connection;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

/// Plain-text schema handed to the model, one line per table header and
/// column. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct SchemaDescription {
    lines: Vec<String>,
}

impl SchemaDescription {
    pub fn from_tables(tables: &[TableSchema]) -> Self {
        let mut lines = Vec::new();
        for table in tables {
            lines.push(String::new());
            lines.push(format!("Table: {}", table.name));
            for col in &table.columns {
                let key = if col.primary_key { " PRIMARY KEY" } else { "" };
                lines.push(format!("  - {} ({}){}", col.name, col.data_type, key));
            }
        }
        Self { lines }
    }

    /// Stand-in used when introspection fails, so questions can still be asked.
    pub fn unavailable(err: &DbError) -> Self {
        Self {
            lines: vec![format!("Error getting schema: {}", err)],
        }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Reads every table and its columns through `SHOW TABLES` and `DESCRIBE`.
pub async fn introspect(db: &Database) -> Result<Vec<TableSchema>, DbError> {
    let db = db.clone();
    let tables = tokio::task::spawn_blocking(move || -> Result<Vec<TableSchema>, DbError> {
        let conn = db.get()?;
        read_tables(&conn)
    })
    .await??;

    info!("Found {} tables", tables.len());
    Ok(tables)
}

fn read_tables(conn: &Connection) -> Result<Vec<TableSchema>, DbError> {
    let mut stmt = conn.prepare("SHOW TABLES")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let mut describe = conn.prepare(&format!("DESCRIBE {}", quote_ident(&name)))?;
        let columns = describe
            .query_map([], |row| {
                Ok(ColumnSchema {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                    primary_key: row.get::<_, Option<String>>(3)?.as_deref() == Some("PRI"),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Table {} has {} columns", name, columns.len());
        tables.push(TableSchema { name, columns });
    }

    Ok(tables)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
