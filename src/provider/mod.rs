//! Backend seam: everything the API needs from a relational database.

mod introspect;
mod mysql;

pub use introspect::{ColumnRow, ForeignKeyRow, Introspection, SYSTEM_SCHEMAS};
pub use mysql::MySqlProvider;

use crate::config::ConnectionConfig;
use crate::error::{AppError, ConfigError};
use crate::schema::{AccessPolicy, Schema};
use crate::sql::QueryBuf;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One result row, cells in SELECT order.
pub type Row = Vec<Value>;

#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Whether the backend currently answers a trivial query.
    async fn is_valid(&self) -> bool;

    async fn close(&self);

    async fn query(&self, query: &QueryBuf) -> Result<Vec<Row>, AppError>;

    /// Runs every statement in one transaction: all commit or none do.
    /// Returns the total number of affected rows.
    async fn execute_all(&self, statements: &[QueryBuf]) -> Result<u64, AppError>;

    /// Introspects the backend, skipping subjects whose policy excludes them.
    async fn get_schema(
        &self,
        policies: &[AccessPolicy],
        aliases: &BTreeMap<String, Vec<String>>,
    ) -> Result<Schema, AppError>;
}

/// Connects the provider named in `config`.
pub async fn connect(config: &ConnectionConfig) -> Result<Arc<dyn SchemaProvider>, AppError> {
    match config.provider.as_str() {
        "mysql" => Ok(Arc::new(MySqlProvider::connect(config).await?)),
        other => Err(ConfigError::UnknownProvider(other.to_string()).into()),
    }
}
