use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlRow, MySqlSslMode};
use sqlx::query::Query;
use sqlx::{
    Column, Connection, Either, Execute, Executor, MySql, MySqlConnection, Row, TypeInfo, ValueRef,
};

use crate::config::ConnectOptions;
use crate::error::{PluginError, Result};
use crate::traits::{BoxedConnection, ConnectionFactory, DatabaseConnection};
use crate::types::{RawQueryResult, SqlValue};

/// Opens one unpooled MySQL session per call using sqlx.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxMySqlFactory;

impl SqlxMySqlFactory {
    pub fn new() -> Self {
        Self
    }

    /// Build sqlx options from validated connect options.
    ///
    /// `Required` encrypts the session without verifying the server certificate.
    /// sqlx only requests the server's RSA key on plaintext sessions, which
    /// matches `allow_public_key_retrieval = !use_tls`.
    pub fn build_connect_options(options: &ConnectOptions) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&options.host)
            .port(options.port)
            .username(&options.username)
            .password(&options.password)
            .database(&options.database)
            .ssl_mode(Self::ssl_mode(options))
    }

    fn ssl_mode(options: &ConnectOptions) -> MySqlSslMode {
        if options.use_tls {
            MySqlSslMode::Required
        } else {
            MySqlSslMode::Disabled
        }
    }
}

#[async_trait]
impl ConnectionFactory for SqlxMySqlFactory {
    async fn create(&self, options: &ConnectOptions) -> Result<BoxedConnection> {
        let connect_options = Self::build_connect_options(options);
        let conn = tokio::time::timeout(
            options.connect_timeout,
            MySqlConnection::connect_with(&connect_options),
        )
        .await
        .map_err(|_| {
            PluginError::Driver(format!(
                "connect ETIMEDOUT after {}ms",
                options.connect_timeout.as_millis()
            ))
        })?
        .map_err(|e| PluginError::Driver(e.to_string()))?;

        Ok(Box::new(SqlxMySqlConnection { conn: Some(conn) }))
    }
}

/// A single sqlx MySQL session.
pub struct SqlxMySqlConnection {
    conn: Option<MySqlConnection>,
}

impl std::fmt::Debug for SqlxMySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxMySqlConnection")
            .field("open", &self.conn.is_some())
            .finish()
    }
}

fn bind_param<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int64(i) => query.bind(*i),
        SqlValue::UInt64(u) => query.bind(*u),
        SqlValue::Float64(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.as_str()),
        SqlValue::Json(v) => query.bind(v.to_string()),
    }
}

#[async_trait]
impl DatabaseConnection for SqlxMySqlConnection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| PluginError::Driver("connection is closed".to_string()))?;

        // Statements without parameters go through the text protocol so that
        // commands MySQL refuses to prepare still run.
        let fetched = if params.is_empty() {
            fetch(conn, sqlx::raw_sql(sql)).await
        } else {
            fetch(conn, params.iter().fold(sqlx::query(sql), bind_param)).await
        };
        let fetched = fetched.map_err(|e| PluginError::Driver(e.to_string()))?;

        if fetched.rows.is_empty() && !returns_rows(sql) {
            return Ok(RawQueryResult::ok_packet(
                fetched.affected_rows,
                fetched.insert_id,
            ));
        }

        let columns = uniform_columns(fetched.rows.iter().map(|row| {
            row.columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        }))?;
        let rows = fetched.rows.iter().map(convert_row).collect();

        Ok(RawQueryResult::new(columns, rows))
    }

    async fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn
                .close()
                .await
                .map_err(|e| PluginError::Driver(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Rows and acknowledgements collected from one statement body.
#[derive(Default)]
struct Fetched {
    rows: Vec<MySqlRow>,
    affected_rows: u64,
    insert_id: u64,
}

async fn fetch<'c, 'q: 'c, E>(
    conn: &'c mut MySqlConnection,
    query: E,
) -> std::result::Result<Fetched, sqlx::Error>
where
    E: 'q + Execute<'q, MySql>,
{
    let mut fetched = Fetched::default();
    let mut stream = conn.fetch_many(query);
    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(done) => {
                fetched.affected_rows += done.rows_affected();
                if done.last_insert_id() != 0 {
                    fetched.insert_id = done.last_insert_id();
                }
            }
            Either::Right(row) => fetched.rows.push(row),
        }
    }
    Ok(fetched)
}

/// Whether a statement produces a result set, judged by its first keyword
/// after any leading comments.
fn returns_rows(sql: &str) -> bool {
    let mut rest = sql;
    loop {
        rest = rest.trim_start().trim_start_matches('(');
        if rest.starts_with("--") || rest.starts_with('#') {
            rest = rest.find('\n').map_or("", |i| &rest[i + 1..]);
        } else if rest.starts_with("/*") {
            rest = rest.find("*/").map_or("", |i| &rest[i + 2..]);
        } else {
            break;
        }
    }
    let keyword: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(
        keyword.as_str(),
        "select" | "with" | "show" | "describe" | "desc" | "explain" | "values" | "table"
    )
}

/// Column names shared by every row. Rows from result sets with different
/// columns cannot be keyed consistently and are rejected.
fn uniform_columns<I>(row_columns: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut row_columns = row_columns.into_iter();
    let Some(columns) = row_columns.next() else {
        return Ok(Vec::new());
    };
    if row_columns.any(|other| other != columns) {
        return Err(PluginError::Driver(
            "statement returned result sets with different columns, run one query per step"
                .to_string(),
        ));
    }
    Ok(columns)
}

fn convert_row(row: &MySqlRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            match row.try_get_raw(idx) {
                Ok(raw) if raw.is_null() => return Value::Null,
                Err(_) => return Value::Null,
                _ => {}
            }
            decode_by_type(row, idx, col.type_info().name())
        })
        .collect()
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// Widens through the shortest decimal form so `1.1f32` stays `1.1`.
fn float32(value: f32) -> Value {
    value.to_string().parse::<f64>().map(float).unwrap_or(Value::Null)
}

/// DATETIME and TIMESTAMP both encode as UTC RFC 3339 with milliseconds.
fn utc_timestamp(value: DateTime<Utc>) -> Value {
    Value::String(value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Decode a cell to JSON based on its MySQL type name.
fn decode_by_type(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let decoded = match type_name {
        "BOOLEAN" | "BOOL" => row.try_get::<bool, _>(index).map(Value::Bool).ok(),

        "TINYINT" => row.try_get::<i8, _>(index).map(Value::from).ok(),
        "SMALLINT" => row.try_get::<i16, _>(index).map(Value::from).ok(),
        "MEDIUMINT" | "INT" | "INTEGER" => row.try_get::<i32, _>(index).map(Value::from).ok(),
        "BIGINT" => row.try_get::<i64, _>(index).map(Value::from).ok(),
        "YEAR" => row.try_get::<u16, _>(index).map(Value::from).ok(),

        "TINYINT UNSIGNED" => row.try_get::<u8, _>(index).map(Value::from).ok(),
        "SMALLINT UNSIGNED" => row.try_get::<u16, _>(index).map(Value::from).ok(),
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "INTEGER UNSIGNED" => {
            row.try_get::<u32, _>(index).map(Value::from).ok()
        }
        "BIGINT UNSIGNED" => row.try_get::<u64, _>(index).map(Value::from).ok(),

        "FLOAT" => row.try_get::<f32, _>(index).map(float32).ok(),
        "DOUBLE" | "DOUBLE PRECISION" | "REAL" => row.try_get::<f64, _>(index).map(float).ok(),

        // Decimals stay strings to keep their precision.
        "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => row
            .try_get::<Decimal, _>(index)
            .map(|v| Value::String(v.to_string()))
            .ok(),

        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|v| Value::String(v.to_string()))
            .ok(),
        "TIME" => row
            .try_get::<NaiveTime, _>(index)
            .map(|v| Value::String(v.to_string()))
            .ok(),
        "DATETIME" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|v| utc_timestamp(v.and_utc()))
            .ok(),
        "TIMESTAMP" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(utc_timestamp)
            .ok(),

        "JSON" => row.try_get::<serde_json::Value, _>(index).ok(),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(bytes_to_value)
            .ok(),

        _ => None,
    };
    decoded.unwrap_or_else(|| decode_fallback(row, index))
}

/// Valid UTF-8 becomes a string, anything else an array of byte values.
fn bytes_to_value(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(s) => Value::String(s),
        Err(e) => Value::Array(e.into_bytes().into_iter().map(Value::from).collect()),
    }
}

fn decode_fallback(row: &MySqlRow, index: usize) -> Value {
    if let Ok(s) = row.try_get_unchecked::<String, _>(index) {
        return Value::String(s);
    }
    if let Ok(n) = row.try_get_unchecked::<i64, _>(index) {
        return Value::from(n);
    }
    if let Ok(bytes) = row.try_get_unchecked::<Vec<u8>, _>(index) {
        return bytes_to_value(bytes);
    }
    Value::Null
}
