//! Read-only SQL window over the demo store
//!
//! The governance guardrail lives here, at the data-store boundary: only
//! statements that start with SELECT are ever executed, anything else is a
//! hard failure for that call.

use rusqlite::types::ValueRef;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::ToolError;

/// SQLite-backed demo store
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Run a SELECT and return rows as JSON objects keyed by column name
    ///
    /// Non-SELECT statements fail the guardrail before a connection is
    /// opened. Each call opens its own connection, so the store is freely
    /// shareable across tasks.
    pub async fn run_select(&self, sql: &str) -> Result<Vec<Value>, ToolError> {
        if !sql.trim().to_lowercase().starts_with("select") {
            return Err(ToolError::Guardrail(
                "Only SELECT queries are allowed".to_string(),
            ));
        }

        let path = self.path.clone();
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || query_rows(&path, &sql))
            .await
            .map_err(|e| ToolError::Execution(format!("DB task failed: {}", e)))?
    }

    /// Seed the demo database from a SQL script file
    ///
    /// No-op when the file does not exist, so a missing seed is not fatal
    /// for the demo harness.
    pub async fn seed_from_file(&self, path: impl AsRef<Path>) -> Result<bool, ToolError> {
        let path = path.as_ref();
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no seed script found");
            return Ok(false);
        }

        let script = std::fs::read_to_string(path)
            .map_err(|e| ToolError::Execution(format!("Failed to read seed script: {}", e)))?;
        self.execute_script(&script).await?;

        tracing::info!(path = %path.display(), "demo database seeded");
        Ok(true)
    }

    /// Run a SQL script, used to seed the demo database
    pub async fn execute_script(&self, script: &str) -> Result<(), ToolError> {
        let path = self.path.clone();
        let script = script.to_string();

        tokio::task::spawn_blocking(move || {
            let conn =
                rusqlite::Connection::open(&path).map_err(|e| ToolError::Execution(e.to_string()))?;
            conn.execute_batch(&script)
                .map_err(|e| ToolError::Execution(e.to_string()))
        })
        .await
        .map_err(|e| ToolError::Execution(format!("DB task failed: {}", e)))?
    }
}

fn query_rows(path: &Path, sql: &str) -> Result<Vec<Value>, ToolError> {
    let conn = rusqlite::Connection::open(path).map_err(|e| ToolError::Execution(e.to_string()))?;

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ToolError::Execution(e.to_string()))?;

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt
        .query([])
        .map_err(|e| ToolError::Execution(e.to_string()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| ToolError::Execution(e.to_string()))? {
        let mut object = Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            let value = match row
                .get_ref(i)
                .map_err(|e| ToolError::Execution(e.to_string()))?
            {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(n) => Value::from(n),
                ValueRef::Real(f) => Value::from(f),
                ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(_) => Value::Null,
            };
            object.insert(name.clone(), value);
        }
        out.push(Value::Object(object));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("retail.db"));
        store
            .execute_script(
                "CREATE TABLE orders (id TEXT, status TEXT, total_cents INTEGER);\n\
                 INSERT INTO orders VALUES ('ORD-1001', 'ready_for_pickup', 4599);\n\
                 INSERT INTO orders VALUES ('ORD-1002', 'shipped', 12999);",
            )
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_select_returns_rows() {
        let (_dir, store) = seeded_store().await;

        let rows = store
            .run_select("SELECT id, status FROM orders ORDER BY id")
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], "ORD-1001");
        assert_eq!(rows[0]["status"], "ready_for_pickup");
    }

    #[tokio::test]
    async fn test_guardrail_rejects_non_select() {
        let (_dir, store) = seeded_store().await;

        let err = store.run_select("DROP TABLE orders").await.unwrap_err();
        assert!(matches!(err, ToolError::Guardrail(_)));

        // Table must still exist
        let rows = store.run_select("SELECT count(*) AS n FROM orders").await.unwrap();
        assert_eq!(rows[0]["n"], 2);
    }

    #[tokio::test]
    async fn test_guardrail_is_case_and_whitespace_insensitive() {
        let (_dir, store) = seeded_store().await;

        assert!(store.run_select("  select 1").await.is_ok());
        assert!(store.run_select("SELECT 1").await.is_ok());
        assert!(store.run_select("  DELETE FROM orders").await.is_err());
    }

    #[tokio::test]
    async fn test_seed_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let sql = dir.path().join("seed.sql");
        std::fs::write(
            &sql,
            "CREATE TABLE orders (id TEXT);\nINSERT INTO orders VALUES ('ORD-1001');",
        )
        .unwrap();

        let store = SqliteStore::new(dir.path().join("retail.db"));
        assert!(store.seed_from_file(&sql).await.unwrap());

        let rows = store.run_select("SELECT id FROM orders").await.unwrap();
        assert_eq!(rows[0]["id"], "ORD-1001");
    }

    #[tokio::test]
    async fn test_seed_from_missing_file_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("retail.db"));
        assert!(!store.seed_from_file(dir.path().join("nope.sql")).await.unwrap());
    }
}
