//! External analytical database boundary.
//!
//! The embedded engine is consumed, never implemented: the core hands it
//! SQL text and gets back rows as column-to-value maps plus an optional
//! result schema. Errors stay generic - the core never inspects
//! engine-specific error codes.

use async_trait::async_trait;
use serde_json::Value;

use crate::rfm::{ColumnMeta, TableSchema};

/// Generic query-failure condition from the engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DbError {
    #[error("query failed: {0}")]
    QueryFailed(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// One result row: column name to value.
pub type Row = serde_json::Map<String, Value>;

/// Result-column description, when the engine reports one.
#[derive(Debug, Clone)]
pub struct ResultColumn {
    pub name: String,
    pub data_type: String,
}

/// A query result.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub schema: Option<Vec<ResultColumn>>,
}

/// Boundary trait for the embedded analytical engine. The engine must
/// support `DESCRIBE`, `information_schema.columns`, CTEs, `CAST`,
/// `RANDOM()` and date arithmetic.
#[async_trait]
pub trait Database: Send + Sync {
    async fn execute(&self, sql: &str) -> DbResult<QueryResult>;
}

/// Fetch a table's column metadata via `DESCRIBE`.
///
/// Engines differ in how they name the describe columns; `column_name`
/// (DuckDB), `name` and `Field` are all accepted. The table name must
/// already have passed the identifier gate.
pub async fn fetch_table_columns(db: &dyn Database, table: &str) -> DbResult<TableSchema> {
    let result = db.execute(&format!("DESCRIBE {}", table)).await?;

    let columns = result
        .rows
        .iter()
        .filter_map(|row| {
            let name = ["column_name", "name", "Field"]
                .iter()
                .find_map(|key| row.get(*key).and_then(Value::as_str))?;
            let data_type = ["column_type", "type", "Type"]
                .iter()
                .find_map(|key| row.get(*key).and_then(Value::as_str))
                .map(String::from);
            Some(ColumnMeta {
                name: name.to_string(),
                data_type,
            })
        })
        .collect();

    Ok(TableSchema {
        table: table.to_string(),
        columns,
    })
}

/// Pull a numeric cell out of a row, tolerating engines that return
/// numbers as strings.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pull a count cell out of a row.
pub fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render a cell as a customer-id string.
pub fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
