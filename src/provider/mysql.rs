//! MySQL provider over a sqlx pool. Catalog data comes from `information_schema`.

use super::{ColumnRow, ForeignKeyRow, Introspection, Row, SchemaProvider, SYSTEM_SCHEMAS};
use crate::config::ConnectionConfig;
use crate::error::{AppError, ConfigError};
use crate::schema::{AccessPolicy, FieldRef, Schema};
use crate::sql::{bind_params, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row as _, TypeInfo};
use std::collections::BTreeMap;

const MAX_CONNECTIONS: u32 = 5;

pub struct MySqlProvider {
    pool: MySqlPool,
    /// Databases to introspect; empty means all.
    databases: Vec<String>,
}

impl MySqlProvider {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, AppError> {
        let host = config.host.as_deref().ok_or(ConfigError::MissingOption("host"))?;
        let username = config.username.as_deref().ok_or(ConfigError::MissingOption("username"))?;
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(config.port())
            .username(username)
            .password(&config.password);
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                tracing::error!(host = %host, port = config.port(), error = %e, "connect failed");
                AppError::Db(e)
            })?;
        tracing::info!(host = %host, port = config.port(), "connected to mysql");
        Ok(MySqlProvider {
            pool,
            databases: config.databases.clone(),
        })
    }

    async fn introspect(&self) -> Result<Introspection, AppError> {
        let schemata: Vec<(String,)> = sqlx::query_as(
            "SELECT CAST(SCHEMA_NAME AS CHAR) FROM information_schema.SCHEMATA ORDER BY SCHEMA_NAME",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;
        let databases: Vec<String> = schemata
            .into_iter()
            .map(|(name,)| name)
            .filter(|name| !SYSTEM_SCHEMAS.contains(&name.as_str()))
            .filter(|name| self.databases.is_empty() || self.databases.contains(name))
            .collect();

        let mut out = Introspection {
            databases,
            ..Introspection::default()
        };
        for db in &out.databases {
            let tables: Vec<(String,)> = sqlx::query_as(
                "SELECT CAST(TABLE_NAME AS CHAR) FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME",
            )
            .bind(db)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;

            for (table,) in tables {
                let columns: Vec<(String, String, String, String, i64)> = sqlx::query_as(
                    "SELECT CAST(COLUMN_NAME AS CHAR), CAST(COLUMN_TYPE AS CHAR), CAST(IS_NULLABLE AS CHAR), \
                     CAST(COLUMN_KEY AS CHAR), COLUMN_DEFAULT IS NOT NULL \
                     FROM information_schema.COLUMNS WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
                     ORDER BY ORDINAL_POSITION",
                )
                .bind(db)
                .bind(&table)
                .fetch_all(&self.pool)
                .await
                .map_err(backend_error)?;
                out.columns.extend(columns.into_iter().map(
                    |(name, column_type, nullable, column_key, has_default)| ColumnRow {
                        database: db.clone(),
                        table: table.clone(),
                        name,
                        column_type,
                        nullable: nullable == "YES",
                        column_key,
                        has_default: has_default != 0,
                    },
                ));
                out.tables.push((db.clone(), table));
            }
        }

        let references: Vec<(String, String, String, String, String, String)> = sqlx::query_as(
            "SELECT CAST(TABLE_SCHEMA AS CHAR), CAST(TABLE_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR), \
             CAST(REFERENCED_TABLE_SCHEMA AS CHAR), CAST(REFERENCED_TABLE_NAME AS CHAR), \
             CAST(REFERENCED_COLUMN_NAME AS CHAR) \
             FROM information_schema.KEY_COLUMN_USAGE WHERE REFERENCED_TABLE_NAME IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;
        out.foreign_keys = references
            .into_iter()
            .map(|(db, table, column, ref_db, ref_table, ref_column)| ForeignKeyRow {
                source: FieldRef::new(db, table, column),
                target: FieldRef::new(ref_db, ref_table, ref_column),
            })
            .collect();

        tracing::debug!(
            databases = out.databases.len(),
            tables = out.tables.len(),
            columns = out.columns.len(),
            foreign_keys = out.foreign_keys.len(),
            "introspected catalog"
        );
        Ok(out)
    }
}

#[async_trait]
impl SchemaProvider for MySqlProvider {
    async fn is_valid(&self) -> bool {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await.is_ok()
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    async fn query(&self, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_params(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_error)?;
        Ok(rows.iter().map(row_values).collect())
    }

    async fn execute_all(&self, statements: &[QueryBuf]) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await.map_err(backend_error)?;
        let mut affected = 0;
        for q in statements {
            tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
            let done = bind_params(sqlx::query(&q.sql), &q.params)
                .execute(&mut *tx)
                .await
                .map_err(backend_error)?;
            affected += done.rows_affected();
        }
        tx.commit().await.map_err(backend_error)?;
        Ok(affected)
    }

    async fn get_schema(
        &self,
        policies: &[AccessPolicy],
        aliases: &BTreeMap<String, Vec<String>>,
    ) -> Result<Schema, AppError> {
        Ok(self.introspect().await?.build(policies, aliases))
    }
}

fn backend_error(e: sqlx::Error) -> AppError {
    tracing::error!(error = %e, "backend query failed");
    AppError::Db(e)
}

fn row_values(row: &MySqlRow) -> Row {
    (0..row.columns().len()).map(|i| cell_to_value(row, i)).collect()
}

fn get<'r, T>(row: &'r MySqlRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

/// How a cell is decoded, chosen from its backend type name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellKind {
    Null,
    Bool,
    Int,
    Unsigned,
    Float,
    Double,
    Date,
    Time,
    DateTime,
    Timestamp,
    Json,
    Text,
}

impl CellKind {
    fn of(type_name: &str) -> Self {
        match type_name.to_ascii_uppercase().as_str() {
            "NULL" => CellKind::Null,
            "BOOLEAN" => CellKind::Bool,
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => CellKind::Int,
            t if t.ends_with(" UNSIGNED") => CellKind::Unsigned,
            "FLOAT" => CellKind::Float,
            "DOUBLE" => CellKind::Double,
            "DATE" => CellKind::Date,
            "TIME" => CellKind::Time,
            "DATETIME" => CellKind::DateTime,
            "TIMESTAMP" => CellKind::Timestamp,
            "JSON" => CellKind::Json,
            _ => CellKind::Text,
        }
    }
}

/// Widens a FLOAT through its shortest decimal form, so `1.1` stays `1.1`.
fn float_to_value(n: f32) -> Value {
    n.to_string()
        .parse::<f64>()
        .ok()
        .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
        .unwrap_or(Value::Null)
}

/// Decodes one cell by its backend type name. NULL and undecodable cells become `null`.
fn cell_to_value(row: &MySqlRow, index: usize) -> Value {
    let value = match CellKind::of(row.column(index).type_info().name()) {
        CellKind::Null => None,
        CellKind::Bool => get::<bool>(row, index).map(Value::Bool),
        CellKind::Int => get::<i64>(row, index).map(Value::from),
        CellKind::Unsigned => get::<u64>(row, index).map(Value::from),
        CellKind::Float => get::<f32>(row, index).map(float_to_value),
        CellKind::Double => get::<f64>(row, index).map(Value::from),
        CellKind::Date => get::<chrono::NaiveDate>(row, index).map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        CellKind::Time => {
            get::<chrono::NaiveTime>(row, index).map(|t| Value::String(t.format("%H:%M:%S%.f").to_string()))
        }
        CellKind::DateTime => get::<chrono::NaiveDateTime>(row, index)
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        CellKind::Timestamp => get::<chrono::DateTime<chrono::Utc>>(row, index).map(|d| Value::String(d.to_rfc3339())),
        CellKind::Json => get::<Value>(row, index),
        CellKind::Text => get::<String>(row, index).map(Value::String),
    };
    // DECIMAL, YEAR, BIT and binary strings arrive as text or bytes.
    value
        .or_else(|| {
            row.try_get_unchecked::<Option<String>, _>(index)
                .ok()
                .flatten()
                .map(Value::String)
        })
        .or_else(|| {
            row.try_get_unchecked::<Option<Vec<u8>>, _>(index)
                .ok()
                .flatten()
                .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned()))
        })
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_columns_decode_as_strings() {
        for name in ["VARCHAR", "char", "TEXT", "ENUM", "DECIMAL"] {
            assert_eq!(CellKind::of(name), CellKind::Text, "{}", name);
        }
    }

    #[test]
    fn numeric_type_names() {
        assert_eq!(CellKind::of("SMALLINT"), CellKind::Int);
        assert_eq!(CellKind::of("INT UNSIGNED"), CellKind::Unsigned);
        assert_eq!(CellKind::of("float"), CellKind::Float);
        assert_eq!(CellKind::of("DOUBLE"), CellKind::Double);
    }

    #[test]
    fn float_cells_keep_their_shortest_form() {
        assert_eq!(float_to_value(1.1), json!(1.1));
        assert_eq!(float_to_value(-0.5), json!(-0.5));
        assert_eq!(float_to_value(f32::NAN), Value::Null);
    }
}
