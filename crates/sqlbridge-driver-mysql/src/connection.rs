//! MySQL connection implementation

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use mysql_async::{Conn, Opts, OptsBuilder, Params, Row as MySqlRow, consts::ColumnType, prelude::*};
use sqlbridge_core::{
    ColumnMeta, Connection, DatabaseConfig, DbError, QueryResult, Result, Row, StatementResult,
    Value,
};
use tokio::sync::Mutex;

/// A single MySQL server session
pub struct MySqlConnection {
    /// `None` once the session has been disconnected
    conn: Mutex<Option<Conn>>,
    closed: AtomicBool,
}

impl MySqlConnection {
    /// Open a session using the given parameters
    #[tracing::instrument(skip(config), fields(host = config.host(), port = config.port(), database = config.database()))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let opts = build_opts(config);
        let conn = Conn::new(opts).await.map_err(|e| {
            DbError::Connection(format!("Failed to connect to MySQL: {}", e))
        })?;

        tracing::debug!(connection_id = conn.id(), "MySQL session established");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            closed: AtomicBool::new(false),
        })
    }

    /// Flag the session as unusable after a transport failure
    fn observe_error(&self, err: &mysql_async::Error) {
        if matches!(err, mysql_async::Error::Io(_)) {
            tracing::warn!(error = %err, "MySQL session lost, marking connection closed");
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}

/// Build driver options. Every new session runs the charset and autocommit
/// setup statements before it is handed out. Affected-row counts report
/// matched rows, not only changed ones.
pub(crate) fn build_opts(config: &DatabaseConfig) -> Opts {
    let init = vec![
        format!("SET NAMES {}", config.charset()),
        format!("SET autocommit={}", if config.autocommit() { 1 } else { 0 }),
    ];

    OptsBuilder::default()
        .ip_or_hostname(config.host())
        .tcp_port(config.port())
        .user(Some(config.user()))
        .pass(Some(config.password()))
        .db_name(Some(config.database()))
        .init(init)
        .client_found_rows(true)
        .into()
}

fn to_params(params: &[Value]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(value_to_mysql).collect())
    }
}

/// Convert a bound parameter into the driver's value type
fn value_to_mysql(value: &Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(v) => mysql_async::Value::Int(i64::from(*v)),
        Value::Int64(v) => mysql_async::Value::Int(*v),
        Value::UInt64(v) => mysql_async::Value::UInt(*v),
        Value::Float64(v) => mysql_async::Value::Double(*v),
        Value::Decimal(v) | Value::String(v) => mysql_async::Value::Bytes(v.as_bytes().to_vec()),
        Value::Bytes(v) => mysql_async::Value::Bytes(v.clone()),
        Value::Date(d) => mysql_async::Value::Date(
            d.year() as u16,
            d.month() as u8,
            d.day() as u8,
            0,
            0,
            0,
            0,
        ),
        Value::DateTime(dt) => mysql_async::Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1_000,
        ),
        Value::Json(v) => mysql_async::Value::Bytes(v.to_string().into_bytes()),
    }
}

/// Convert a driver value to ours, using column type metadata to interpret
/// byte strings from the text protocol.
fn mysql_value_to_value(val: mysql_async::Value, col_type: ColumnType) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => s
                    .parse::<i64>()
                    .map(Value::Int64)
                    .or_else(|_| s.parse::<u64>().map(Value::UInt64))
                    .unwrap_or(Value::String(s)),
                ColumnType::MYSQL_TYPE_FLOAT | ColumnType::MYSQL_TYPE_DOUBLE => {
                    s.parse::<f64>().map(Value::Float64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    Value::Decimal(s)
                }
                _ => Value::String(s),
            },
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => Value::Int64(i),
            Err(_) => Value::UInt64(u),
        },
        mysql_async::Value::Float(f) => Value::Float64(f64::from(f)),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let date = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32);
            if hour == 0 && min == 0 && sec == 0 && micro == 0 {
                match date {
                    Some(date) => Value::Date(date),
                    None => Value::String(format!("{:04}-{:02}-{:02}", year, month, day)),
                }
            } else {
                match date.and_then(|d| d.and_hms_micro_opt(hour as u32, min as u32, sec as u32, micro)) {
                    Some(dt) => Value::DateTime(dt),
                    None => Value::String(format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                        year, month, day, hour, min, sec
                    )),
                }
            }
        }
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            let total_hours = days * 24 + u32::from(hours);
            let sign = if negative { "-" } else { "" };
            if micros == 0 {
                Value::String(format!("{}{:02}:{:02}:{:02}", sign, total_hours, mins, secs))
            } else {
                Value::String(format!(
                    "{}{:02}:{:02}:{:02}.{:06}",
                    sign, total_hours, mins, secs, micros
                ))
            }
        }
    }
}

fn convert_rows(mysql_rows: Vec<MySqlRow>) -> (Vec<ColumnMeta>, Vec<Row>) {
    let Some(first) = mysql_rows.first() else {
        return (Vec::new(), Vec::new());
    };

    let columns: Vec<ColumnMeta> = first
        .columns_ref()
        .iter()
        .enumerate()
        .map(|(ordinal, col)| ColumnMeta {
            name: col.name_str().to_string(),
            data_type: format!("{:?}", col.column_type()),
            ordinal,
        })
        .collect();
    let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let types: Vec<ColumnType> = first.columns_ref().iter().map(|c| c.column_type()).collect();

    let rows = mysql_rows
        .into_iter()
        .map(|row| {
            let values = row
                .unwrap_raw()
                .into_iter()
                .zip(types.iter())
                .map(|(val, col_type)| {
                    mysql_value_to_value(val.unwrap_or(mysql_async::Value::NULL), *col_type)
                })
                .collect();
            Row::new(names.clone(), values)
        })
        .collect();

    (columns, rows)
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>(), params = params.len()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| DbError::Connection("MySQL connection is closed".into()))?;

        let outcome = if params.is_empty() {
            conn.query_drop(sql).await
        } else {
            conn.exec_drop(sql, to_params(params)).await
        };
        outcome.map_err(|e| {
            self.observe_error(&e);
            DbError::Statement(e.to_string())
        })?;

        let result = StatementResult {
            affected_rows: conn.affected_rows(),
            last_insert_id: conn.last_insert_id().filter(|id| *id > 0),
        };
        tracing::debug!(affected_rows = result.affected_rows, "statement executed");
        Ok(result)
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>(), params = params.len()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| DbError::Connection("MySQL connection is closed".into()))?;

        let outcome: std::result::Result<Vec<MySqlRow>, _> = if params.is_empty() {
            conn.query(sql).await
        } else {
            conn.exec(sql, to_params(params)).await
        };
        let mysql_rows = outcome.map_err(|e| {
            self.observe_error(&e);
            DbError::Statement(e.to_string())
        })?;

        let (columns, rows) = convert_rows(mysql_rows);
        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn ping(&self) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or_else(|| DbError::Connection("MySQL connection is closed".into()))?;
        conn.ping().await.map_err(|e| {
            self.observe_error(&e);
            DbError::Connection(format!("MySQL ping failed: {}", e))
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let Some(conn) = self.conn.lock().await.take() else {
            return Ok(());
        };

        tracing::debug!(connection_id = conn.id(), "closing MySQL session");
        conn.disconnect()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to close MySQL connection: {}", e)))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_opts_carry_session_setup() {
        let config = DatabaseConfig::new()
            .with_host("db.internal")
            .with_port(3307)
            .with_user("app")
            .with_database("inventory")
            .with_charset("latin1")
            .with_autocommit(false);

        let opts = build_opts(&config);
        assert_eq!(opts.ip_or_hostname(), "db.internal");
        assert_eq!(opts.tcp_port(), 3307);
        assert_eq!(opts.user(), Some("app"));
        assert_eq!(opts.db_name(), Some("inventory"));
        assert_eq!(
            opts.init().to_vec(),
            vec!["SET NAMES latin1".to_string(), "SET autocommit=0".to_string()]
        );
        assert!(opts.client_found_rows());
    }

    #[test]
    fn test_text_protocol_values_follow_column_type() {
        let int = mysql_value_to_value(
            mysql_async::Value::Bytes(b"42".to_vec()),
            ColumnType::MYSQL_TYPE_LONG,
        );
        assert_eq!(int, Value::Int64(42));

        let unsigned = mysql_value_to_value(
            mysql_async::Value::Bytes(b"18446744073709551615".to_vec()),
            ColumnType::MYSQL_TYPE_LONGLONG,
        );
        assert_eq!(unsigned, Value::UInt64(u64::MAX));

        let decimal = mysql_value_to_value(
            mysql_async::Value::Bytes(b"10.50".to_vec()),
            ColumnType::MYSQL_TYPE_NEWDECIMAL,
        );
        assert_eq!(decimal, Value::Decimal("10.50".into()));

        let text = mysql_value_to_value(
            mysql_async::Value::Bytes(b"hello".to_vec()),
            ColumnType::MYSQL_TYPE_VAR_STRING,
        );
        assert_eq!(text, Value::String("hello".into()));
    }

    #[test]
    fn test_binary_protocol_temporal_values() {
        let date = mysql_value_to_value(
            mysql_async::Value::Date(2024, 2, 29, 0, 0, 0, 0),
            ColumnType::MYSQL_TYPE_DATE,
        );
        assert_eq!(date.to_json(), serde_json::json!("2024-02-29"));

        let datetime = mysql_value_to_value(
            mysql_async::Value::Date(2024, 2, 29, 13, 5, 9, 0),
            ColumnType::MYSQL_TYPE_DATETIME,
        );
        assert_eq!(datetime.to_json(), serde_json::json!("2024-02-29 13:05:09"));

        let time = mysql_value_to_value(
            mysql_async::Value::Time(true, 1, 2, 3, 4, 0),
            ColumnType::MYSQL_TYPE_TIME,
        );
        assert_eq!(time, Value::String("-26:03:04".into()));
    }

    #[test]
    fn test_parameters_bind_positionally() {
        let params = to_params(&[Value::Int64(7), Value::Null, Value::Bool(true)]);
        assert_eq!(
            params,
            Params::Positional(vec![
                mysql_async::Value::Int(7),
                mysql_async::Value::NULL,
                mysql_async::Value::Int(1),
            ])
        );
        assert_eq!(to_params(&[]), Params::Empty);
    }
}
