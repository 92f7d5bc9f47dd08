//! In-memory SQLite stand-in for a MySQL session

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use sqlbridge_connection::{ConnectionFactory, ConnectionPool, PoolConfig};
use sqlbridge_core::{
    ColumnMeta, Connection, DatabaseConfig, DbError, QueryResult, Result, Row, StatementResult,
    Value,
};

use crate::ToolContext;
use crate::sql::{DATABASE_INFO, SHOW_TABLES};

const SQLITE_SHOW_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";
const SQLITE_DATABASE_INFO: &str = "SELECT sqlite_version(), 'main'";

/// Translate the few MySQL-only statements the tools issue
fn translate(sql: &str) -> &str {
    match sql {
        SHOW_TABLES => SQLITE_SHOW_TABLES,
        DATABASE_INFO => SQLITE_DATABASE_INFO,
        other => other,
    }
}

fn to_sqlite(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(v) => SqlValue::Integer(i64::from(*v)),
        Value::Int64(v) => SqlValue::Integer(*v),
        Value::UInt64(v) => i64::try_from(*v)
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::Text(v.to_string())),
        Value::Float64(v) => SqlValue::Real(*v),
        Value::Bytes(v) => SqlValue::Blob(v.clone()),
        Value::Json(v) => SqlValue::Text(v.to_string()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

fn statement_error(err: rusqlite::Error) -> DbError {
    DbError::Statement(err.to_string())
}

/// A [`Connection`] over a shared in-memory SQLite database
pub(crate) struct SqliteConnection {
    db: Arc<Mutex<rusqlite::Connection>>,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let db = self.db.lock();
        let affected = db
            .execute(
                translate(sql),
                rusqlite::params_from_iter(params.iter().map(to_sqlite)),
            )
            .map_err(statement_error)?;
        let rowid = db.last_insert_rowid();
        Ok(StatementResult {
            affected_rows: affected as u64,
            last_insert_id: u64::try_from(rowid).ok().filter(|id| *id > 0),
        })
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let db = self.db.lock();
        let mut stmt = db.prepare(translate(sql)).map_err(statement_error)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let columns = names
            .iter()
            .enumerate()
            .map(|(ordinal, name)| ColumnMeta {
                name: name.clone(),
                data_type: String::new(),
                ordinal,
            })
            .collect();

        let mut rows = Vec::new();
        let mut cursor = stmt
            .query(rusqlite::params_from_iter(params.iter().map(to_sqlite)))
            .map_err(statement_error)?;
        while let Some(row) = cursor.next().map_err(statement_error)? {
            let mut values = Vec::with_capacity(names.len());
            for idx in 0..names.len() {
                values.push(from_sqlite(row.get_ref(idx).map_err(statement_error)?));
            }
            rows.push(Row::new(names.clone(), values));
        }

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms: 0,
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Hands out sessions on one shared in-memory database
pub(crate) struct SqliteFactory {
    db: Arc<Mutex<rusqlite::Connection>>,
    pub(crate) connects: AtomicUsize,
    pub(crate) reject: AtomicBool,
}

impl SqliteFactory {
    pub(crate) fn new() -> Self {
        let db = rusqlite::Connection::open_in_memory().expect("open in-memory sqlite");
        Self {
            db: Arc::new(Mutex::new(db)),
            connects: AtomicUsize::new(0),
            reject: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ConnectionFactory for SqliteFactory {
    async fn connect(&self) -> Result<Arc<dyn Connection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) {
            return Err(DbError::Connection(
                "Access denied for user 'root'@'localhost' (using password: YES)".into(),
            ));
        }
        Ok(Arc::new(SqliteConnection {
            db: self.db.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

pub(crate) const TEST_PASSWORD: &str = "s3cr3t-pa55";

/// A tool context backed by a fresh in-memory database
pub(crate) fn sqlite_context() -> (ToolContext, Arc<SqliteFactory>) {
    let factory = Arc::new(SqliteFactory::new());
    let pool = ConnectionPool::new(PoolConfig::new(1, 2), factory.clone());
    let config = DatabaseConfig::new().with_password(TEST_PASSWORD);
    (ToolContext::new(Arc::new(pool), config), factory)
}
