//! DuckDB-backed relational store for the tabletalk pipeline

use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod loader;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("table '{0}' not found in store")]
    UnknownTable(String),
}

/// Column metadata as reported by `information_schema.columns`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// Raw result of executing one SQL statement
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

impl QueryResult {
    /// Object form (`{"columns": .., "rows": [{col: val, ..}, ..], "row_count": ..}`)
    /// used for the answer-synthesis prompt and for printing.
    pub fn to_json(&self) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (i, col) in self.columns.iter().enumerate() {
                    let value = row.get(i).cloned().unwrap_or(serde_json::Value::Null);
                    obj.insert(col.clone(), value);
                }
                serde_json::Value::Object(obj)
            })
            .collect();

        serde_json::json!({
            "columns": self.columns,
            "rows": rows,
            "row_count": self.row_count,
        })
    }
}

/// Handle on the relational store. Wraps a single DuckDB connection; the
/// connection is not shared across threads, matching the one-query-at-a-time
/// call chain of the pipeline.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute one SQL statement and collect the full result set.
    pub fn execute(&self, sql: &str) -> Result<QueryResult, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        let mut columns: Vec<String> = Vec::new();
        let mut result_rows: Vec<Vec<serde_json::Value>> = Vec::new();

        // Column names come off the first row; an empty result set has no
        // column metadata to report.
        while let Some(row) = rows.next()? {
            if columns.is_empty() {
                let col_count = row.as_ref().column_count();
                for i in 0..col_count {
                    columns.push(row.as_ref().column_name(i)?.to_string());
                }
            }

            let mut json_row = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                json_row.push(value_ref_to_json(row.get_ref(i)?));
            }
            result_rows.push(json_row);
        }

        let row_count = result_rows.len();
        Ok(QueryResult {
            columns,
            rows: result_rows,
            row_count,
        })
    }

    /// Column metadata for one table, in ordinal position order.
    pub fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name, data_type, is_nullable \
             FROM information_schema.columns \
             WHERE table_name = ? \
             ORDER BY ordinal_position",
        )?;

        let columns: Vec<ColumnInfo> = stmt
            .query_map([table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    data_type: row.get(1)?,
                    is_nullable: row.get::<_, String>(2)? == "YES",
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        if columns.is_empty() {
            return Err(StoreError::UnknownTable(table.to_string()));
        }

        Ok(columns)
    }

    /// Names of all tables in the main schema.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'main' ORDER BY table_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<duckdb::Result<Vec<String>>>()?;
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Quote an identifier for interpolation into SQL text.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn value_ref_to_json(value: duckdb::types::ValueRef<'_>) -> serde_json::Value {
    use duckdb::types::ValueRef;

    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(i) => serde_json::json!(i),
        ValueRef::SmallInt(i) => serde_json::json!(i),
        ValueRef::Int(i) => serde_json::json!(i),
        ValueRef::BigInt(i) => serde_json::json!(i),
        ValueRef::HugeInt(i) => serde_json::json!(i),
        ValueRef::UTinyInt(i) => serde_json::json!(i),
        ValueRef::USmallInt(i) => serde_json::json!(i),
        ValueRef::UInt(i) => serde_json::json!(i),
        ValueRef::UBigInt(i) => serde_json::json!(i),
        ValueRef::Float(f) => serde_json::json!(f),
        ValueRef::Double(f) => serde_json::json!(f),
        ValueRef::Text(s) => serde_json::Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => serde_json::Value::String(format!("<blob {} bytes>", b.len())),
        other => serde_json::Value::String(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "CREATE TABLE players (id INTEGER, name VARCHAR, goals INTEGER);
                 INSERT INTO players VALUES (1, 'Alice', 12), (2, 'Bob', 7);",
            )
            .unwrap();
        store
    }

    #[test]
    fn execute_collects_columns_and_rows() {
        let store = seeded_store();
        let result = store
            .execute("SELECT name, goals FROM players ORDER BY goals DESC")
            .unwrap();

        assert_eq!(result.columns, vec!["name", "goals"]);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.rows[0][0], serde_json::json!("Alice"));
        assert_eq!(result.rows[1][1], serde_json::json!(7));
    }

    #[test]
    fn execute_empty_result_has_no_rows() {
        let store = seeded_store();
        let result = store.execute("SELECT * FROM players WHERE id = 99").unwrap();
        assert_eq!(result.row_count, 0);
        assert!(result.rows.is_empty());
    }

    #[test]
    fn execute_aggregate_sums() {
        let store = seeded_store();
        let result = store.execute("SELECT SUM(goals) AS total FROM players").unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.rows[0][0], serde_json::json!(19));
    }

    #[test]
    fn table_columns_reports_schema() {
        let store = seeded_store();
        let columns = store.table_columns("players").unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[1].name, "name");
        assert!(columns[1].data_type.contains("VARCHAR"));
    }

    #[test]
    fn table_columns_unknown_table_errors() {
        let store = seeded_store();
        let err = store.table_columns("missing").unwrap_err();
        assert!(matches!(err, StoreError::UnknownTable(name) if name == "missing"));
    }

    #[test]
    fn row_count_counts() {
        let store = seeded_store();
        assert_eq!(store.row_count("players").unwrap(), 2);
    }

    #[test]
    fn to_json_pairs_columns_with_values() {
        let store = seeded_store();
        let result = store.execute("SELECT name FROM players ORDER BY id").unwrap();
        let json = result.to_json();
        assert_eq!(json["row_count"], 2);
        assert_eq!(json["rows"][0]["name"], "Alice");
    }
}
