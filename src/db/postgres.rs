//! `PostgreSQL` Database Implementation
//!
//! Implements the [`Database`] trait over `tokio-postgres`.
//!
//! # Implementation Notes
//! - One persistent client per process: connected at startup, verified with
//!   a ping, shared by introspection and every statement, closed once
//! - Timeouts enforced via `tokio::time::timeout`
//! - Timestamps, dates, and UUIDs rendered as ISO-style text
//! - BYTEA Base64-encoded
//! - Unmapped types fall back to their text representation where the
//!   driver allows it, otherwise a `<typename>` placeholder

use std::time::Duration;

use async_trait::async_trait;
use tokio_postgres::{Client, Config, NoTls, Row};

use crate::config::ConnectionSettings;
use crate::db::{ColumnDescriptor, Database, QueryRows, SqlValue};
use crate::error::{Result, TabletalkError};

/// All public-schema columns, in the order that fixes prompt content:
/// table name first, then declaration position.
const LIST_COLUMNS_SQL: &str = "
    SELECT table_name, column_name, data_type, is_nullable
    FROM information_schema.columns
    WHERE table_schema = 'public'
    ORDER BY table_name, ordinal_position";

/// `PostgreSQL` database holding the session's one live connection
pub struct PostgresDb {
    client: Client,
    driver: tokio::task::JoinHandle<()>,
}

impl PostgresDb {
    /// Connect and verify the connection with a ping
    ///
    /// The connection driver runs on a spawned task until the client is
    /// dropped. Connection errors are not logged to prevent credential
    /// leakage.
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let mut pg_config = Config::new();
        pg_config
            .host(&settings.host)
            .port(settings.port)
            .user(&settings.user)
            .password(&settings.password)
            .dbname(&settings.database);

        let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
            TabletalkError::connection_failed(format!("Failed to connect to PostgreSQL: {e}"))
        })?;

        let driver = tokio::spawn(async move {
            let _ = connection.await;
        });

        // Ping before handing the connection to the session
        client.query_one("SELECT now()", &[]).await.map_err(|e| {
            TabletalkError::connection_failed(format!("Connection ping failed: {e}"))
        })?;

        Ok(Self { client, driver })
    }

    /// Close the connection
    ///
    /// Dropping the client terminates the wire connection; awaiting the
    /// driver task makes the release deterministic on every exit path.
    pub async fn close(self) {
        drop(self.client);
        let _ = self.driver.await;
    }
}

#[async_trait]
impl Database for PostgresDb {
    async fn query(&self, sql: &str, timeout: Duration) -> Result<QueryRows> {
        tokio::time::timeout(timeout, run_query(&self.client, sql))
            .await
            .map_err(|_| {
                TabletalkError::query_failed(format!(
                    "Query exceeded timeout of {}ms",
                    timeout.as_millis()
                ))
            })?
    }

    async fn list_columns(&self) -> Result<Vec<ColumnDescriptor>> {
        let rows = self
            .client
            .query(LIST_COLUMNS_SQL, &[])
            .await
            .map_err(|e| {
                TabletalkError::introspection_failed(format!("Failed to query columns: {e}"))
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let table: String = row.get(0);
            let name: String = row.get(1);
            let data_type: String = row.get(2);
            let is_nullable: String = row.get(3);

            columns.push(ColumnDescriptor {
                table,
                name,
                data_type,
                nullable: is_nullable == "YES",
                example: None,
            });
        }

        Ok(columns)
    }
}

/// Execute one statement and collect its rows as `SqlValue`s
async fn run_query(client: &Client, sql: &str) -> Result<QueryRows> {
    let stmt = client
        .prepare(sql)
        .await
        .map_err(|e| TabletalkError::query_failed(format!("Failed to prepare query: {e}")))?;

    let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

    let rows = client
        .query(&stmt, &[])
        .await
        .map_err(|e| TabletalkError::query_failed(format!("Failed to execute query: {e}")))?;

    let mut data = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(postgres_value(&row, idx)?);
        }
        data.push(values);
    }

    Ok(QueryRows { columns, rows: data })
}

/// Convert one `PostgreSQL` cell to a `SqlValue`
fn postgres_value(row: &Row, idx: usize) -> Result<SqlValue> {
    use tokio_postgres::types::Type;

    let col_type = row.columns()[idx].type_();

    let value = match *col_type {
        Type::BOOL => opt(row.try_get::<_, Option<bool>>(idx), "boolean")?
            .map_or(SqlValue::Null, SqlValue::Bool),

        Type::INT2 => opt(row.try_get::<_, Option<i16>>(idx), "smallint")?
            .map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        Type::INT4 => opt(row.try_get::<_, Option<i32>>(idx), "integer")?
            .map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        Type::INT8 => opt(row.try_get::<_, Option<i64>>(idx), "bigint")?
            .map_or(SqlValue::Null, SqlValue::Int),

        Type::FLOAT4 => opt(row.try_get::<_, Option<f32>>(idx), "real")?
            .map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))),
        Type::FLOAT8 => opt(row.try_get::<_, Option<f64>>(idx), "double")?
            .map_or(SqlValue::Null, SqlValue::Float),

        Type::VARCHAR | Type::TEXT | Type::BPCHAR | Type::NAME => {
            opt(row.try_get::<_, Option<String>>(idx), "text")?
                .map_or(SqlValue::Null, SqlValue::Text)
        }

        Type::JSON | Type::JSONB => {
            opt(row.try_get::<_, Option<serde_json::Value>>(idx), "json")?
                .map_or(SqlValue::Null, |v| SqlValue::Raw(v.to_string()))
        }

        Type::BYTEA => opt(row.try_get::<_, Option<Vec<u8>>>(idx), "bytea")?
            .map_or(SqlValue::Null, |v| {
                use base64::Engine;
                SqlValue::Text(base64::engine::general_purpose::STANDARD.encode(v))
            }),

        Type::TIMESTAMP => {
            opt(row.try_get::<_, Option<chrono::NaiveDateTime>>(idx), "timestamp")?
                .map_or(SqlValue::Null, |v| {
                    SqlValue::Text(v.format("%Y-%m-%dT%H:%M:%S").to_string())
                })
        }
        Type::TIMESTAMPTZ => {
            opt(
                row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx),
                "timestamptz",
            )?
            .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_rfc3339()))
        }
        Type::DATE => opt(row.try_get::<_, Option<chrono::NaiveDate>>(idx), "date")?
            .map_or(SqlValue::Null, |v| {
                SqlValue::Text(v.format("%Y-%m-%d").to_string())
            }),
        Type::TIME => opt(row.try_get::<_, Option<chrono::NaiveTime>>(idx), "time")?
            .map_or(SqlValue::Null, |v| {
                SqlValue::Text(v.format("%H:%M:%S").to_string())
            }),

        Type::UUID => opt(row.try_get::<_, Option<uuid::Uuid>>(idx), "uuid")?
            .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string())),

        // Anything else: take the text representation if the driver can
        // give one, otherwise a typename placeholder. Never fail the whole
        // statement over one exotic column.
        _ => match row.try_get::<_, Option<String>>(idx) {
            Ok(Some(s)) => SqlValue::Raw(s),
            Ok(None) => SqlValue::Null,
            Err(_) => SqlValue::Raw(format!("<{}>", col_type.name())),
        },
    };

    Ok(value)
}

/// Map a driver cell-read error into a query failure
fn opt<T>(
    value: std::result::Result<Option<T>, tokio_postgres::Error>,
    type_name: &str,
) -> Result<Option<T>> {
    value.map_err(|e| {
        TabletalkError::query_failed(format!("Failed to get {type_name} value: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Connection-dependent tests follow the same convention as the rest of
    // the suite: run with a local PostgreSQL via
    // cargo test -- --ignored

    fn local_settings() -> ConnectionSettings {
        ConnectionSettings {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            password_env: None,
        }
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_connect_and_ping() {
        let db = PostgresDb::connect(&local_settings()).await;
        assert!(db.is_ok(), "Connection failed: {:?}", db.err());
        db.unwrap().close().await;
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_query_typed_values() {
        let db = PostgresDb::connect(&local_settings()).await.unwrap();

        let result = db
            .query(
                "SELECT 1 AS num, 'test' AS str, true AS flag, NULL::text AS missing",
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["num", "str", "flag", "missing"]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][0], SqlValue::Int(1));
        assert_eq!(result.rows[0][1], SqlValue::Text("test".to_string()));
        assert_eq!(result.rows[0][2], SqlValue::Bool(true));
        assert_eq!(result.rows[0][3], SqlValue::Null);

        db.close().await;
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_query_timeout_is_an_error() {
        let db = PostgresDb::connect(&local_settings()).await.unwrap();

        let result = db
            .query("SELECT pg_sleep(5)", Duration::from_millis(50))
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("timeout"));

        db.close().await;
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_list_columns_ordering() {
        let db = PostgresDb::connect(&local_settings()).await.unwrap();

        let columns = db.list_columns().await.unwrap();
        let mut sorted = columns.clone();
        sorted.sort_by(|a, b| a.table.cmp(&b.table));

        let tables: Vec<&String> = columns.iter().map(|c| &c.table).collect();
        let sorted_tables: Vec<&String> = sorted.iter().map(|c| &c.table).collect();
        assert_eq!(tables, sorted_tables, "columns must be grouped by table name");

        db.close().await;
    }
}
