use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use tracing::{debug, warn};

use crate::common::error::{Result, StoreError};
use crate::domain::{CellValue, RowFailure};
use crate::storage::traits::{BatchReport, InsertBatch, Warehouse};

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

/// SQLite rendition of the analysis warehouse. The connection is held behind
/// a mutex so one batch uses it exclusively from first attempt to commit.
pub struct SqliteWarehouse {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS Cliente (
    IdCliente TEXT PRIMARY KEY,
    Nombre    TEXT NOT NULL,
    Email     TEXT
);
CREATE TABLE IF NOT EXISTS Producto (
    IdProducto TEXT PRIMARY KEY,
    Nombre     TEXT NOT NULL,
    Categoria  TEXT
);
CREATE TABLE IF NOT EXISTS Fuente_De_Datos (
    IdFuente INTEGER PRIMARY KEY AUTOINCREMENT,
    Nombre   TEXT NOT NULL,
    Tipo     TEXT,
    Url      TEXT
);
CREATE TABLE IF NOT EXISTS Encuestas (
    IdOpinion           INTEGER PRIMARY KEY AUTOINCREMENT,
    IdCliente           TEXT NOT NULL REFERENCES Cliente(IdCliente),
    IdProducto          TEXT REFERENCES Producto(IdProducto),
    Fecha               TEXT,
    PuntajeSatisfaccion INTEGER CHECK (PuntajeSatisfaccion BETWEEN 1 AND 5),
    Comentario          TEXT
);
CREATE TABLE IF NOT EXISTS Comentarios_Sociales (
    IdComment     INTEGER PRIMARY KEY AUTOINCREMENT,
    IdCliente     TEXT REFERENCES Cliente(IdCliente),
    IdProducto    TEXT NOT NULL REFERENCES Producto(IdProducto),
    Fecha         TEXT,
    Plataforma    TEXT,
    Comentario    TEXT,
    Clasificacion TEXT
);
CREATE TABLE IF NOT EXISTS Review (
    IdReview   INTEGER PRIMARY KEY AUTOINCREMENT,
    IdCliente  TEXT NOT NULL REFERENCES Cliente(IdCliente),
    IdProducto TEXT NOT NULL REFERENCES Producto(IdProducto),
    Fecha      TEXT,
    Puntuacion INTEGER,
    Comentario TEXT,
    Categoria  TEXT
);
"#;

impl SqliteWarehouse {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref()).map_err(|e| StoreError::Connection {
            message: format!("cannot open database {}: {e}", path.as_ref().display()),
        })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Connection {
            message: format!("cannot open in-memory database: {e}"),
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| StoreError::Connection {
                message: format!("cannot enable foreign keys: {e}"),
            })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Bracket an identifier so embedded spaces or special characters in
    /// table/column names survive.
    fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn insert_sql(table: &str, columns: &[String]) -> String {
        let column_list = columns
            .iter()
            .map(|c| Self::quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            Self::quote_ident(table),
            column_list,
            placeholders
        )
    }

    fn db_err(e: rusqlite::Error) -> StoreError {
        StoreError::Database {
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl Warehouse for SqliteWarehouse {
    async fn insert_batch(&self, batch: InsertBatch) -> Result<BatchReport> {
        let mut conn = self.conn.lock().map_err(|e| StoreError::Connection {
            message: format!("connection mutex poisoned: {e}"),
        })?;
        let tx = conn.transaction().map_err(Self::db_err)?;

        let sql = Self::insert_sql(&batch.table, &batch.columns);
        let mut report = BatchReport {
            attempted: batch.rows.len(),
            ..Default::default()
        };

        match tx.prepare(&sql) {
            Ok(mut stmt) => {
                for (index, row) in batch.rows.iter().enumerate() {
                    match stmt.execute(params_from_iter(row.iter())) {
                        Ok(_) => report.inserted += 1,
                        Err(e) => {
                            warn!(
                                "Row {} failed for table {}: {}",
                                index, batch.table, e
                            );
                            report.failures.push(RowFailure {
                                row_index: index,
                                cause: e.to_string(),
                            });
                        }
                    }
                }
            }
            Err(e) => {
                // Statement-level problem (unknown table/column): every row
                // fails for the same reason, but it stays a structured outcome.
                warn!("Cannot prepare insert for table {}: {}", batch.table, e);
                for index in 0..batch.rows.len() {
                    report.failures.push(RowFailure {
                        row_index: index,
                        cause: e.to_string(),
                    });
                }
            }
        }

        tx.commit().map_err(Self::db_err)?;
        debug!(
            "Committed batch for {}: {}/{} rows inserted",
            batch.table, report.inserted, report.attempted
        );
        Ok(report)
    }

    async fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| StoreError::Connection {
            message: format!("connection mutex poisoned: {e}"),
        })?;
        conn.execute_batch(SCHEMA).map_err(Self::db_err)?;
        debug!("Warehouse schema ensured");
        Ok(())
    }

    async fn table_count(&self, table: &str) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| StoreError::Connection {
            message: format!("connection mutex poisoned: {e}"),
        })?;
        let sql = format!("SELECT COUNT(*) FROM {}", Self::quote_ident(table));
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(Self::db_err)?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer_batch(keys: &[&str]) -> InsertBatch {
        InsertBatch {
            table: "Cliente".to_string(),
            columns: vec![
                "IdCliente".to_string(),
                "Nombre".to_string(),
                "Email".to_string(),
            ],
            rows: keys
                .iter()
                .map(|k| crate::domain::SyntheticEntity::customer(k).into_row())
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_insert_batch_commits_all_rows() {
        let warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse.ensure_schema().await.unwrap();

        let report = warehouse
            .insert_batch(customer_batch(&["C1", "C2", "C3"]))
            .await
            .unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.inserted, 3);
        assert!(report.failures.is_empty());
        assert_eq!(warehouse.table_count("Cliente").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_key_isolated_and_survivors_commit() {
        let warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse.ensure_schema().await.unwrap();

        // C2 appears twice; only the duplicate fails.
        let report = warehouse
            .insert_batch(customer_batch(&["C1", "C2", "C2", "C3"]))
            .await
            .unwrap();
        assert_eq!(report.attempted, 4);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].row_index, 2);
        assert_eq!(warehouse.table_count("Cliente").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unknown_column_fails_every_row_without_error() {
        let warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse.ensure_schema().await.unwrap();

        let batch = InsertBatch {
            table: "Cliente".to_string(),
            columns: vec!["NoSuchColumn".to_string()],
            rows: vec![
                vec![CellValue::Text("a".to_string())],
                vec![CellValue::Text("b".to_string())],
            ],
        };
        let report = warehouse.insert_batch(batch).await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_foreign_key_violation_is_row_level() {
        let warehouse = SqliteWarehouse::open_in_memory().unwrap();
        warehouse.ensure_schema().await.unwrap();
        warehouse
            .insert_batch(customer_batch(&["C1"]))
            .await
            .unwrap();

        let batch = InsertBatch {
            table: "Encuestas".to_string(),
            columns: vec![
                "IdCliente".to_string(),
                "PuntajeSatisfaccion".to_string(),
            ],
            rows: vec![
                vec![CellValue::Text("C1".to_string()), CellValue::Integer(5)],
                // Unknown customer: FK rejects only this row.
                vec![CellValue::Text("C9999".to_string()), CellValue::Integer(4)],
            ],
        };
        let report = warehouse.insert_batch(batch).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].row_index, 1);
        assert_eq!(warehouse.table_count("Encuestas").await.unwrap(), 1);
    }

    #[test]
    fn test_insert_sql_brackets_identifiers() {
        let sql = SqliteWarehouse::insert_sql(
            "Review",
            &["IdCliente".to_string(), "Column With Space".to_string()],
        );
        assert_eq!(
            sql,
            "INSERT INTO \"Review\" (\"IdCliente\", \"Column With Space\") VALUES (?1, ?2)"
        );
    }
}
