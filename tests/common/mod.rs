//! In-memory provider and a small shop catalog shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tablerest::provider::{ColumnRow, ForeignKeyRow, Introspection, Row, SchemaProvider};
use tablerest::schema::{AccessPolicy, FieldRef, Schema};
use tablerest::sql::QueryBuf;
use tablerest::{ApiController, AppError, AppState};

/// Returns canned rows for every SELECT, honouring a trailing `LIMIT ? OFFSET ?`,
/// and records everything it is asked to run.
#[derive(Default)]
pub struct FakeProvider {
    pub catalog: Introspection,
    pub rows: Mutex<Vec<Row>>,
    pub queries: Mutex<Vec<QueryBuf>>,
    /// Committed write batches, one entry per `execute_all`.
    pub committed: Mutex<Vec<Vec<QueryBuf>>>,
    pub fail_writes: bool,
}

impl FakeProvider {
    pub fn new(catalog: Introspection) -> Self {
        FakeProvider {
            catalog,
            ..FakeProvider::default()
        }
    }

    pub fn with_rows(self, rows: Vec<Row>) -> Self {
        *self.rows.lock().unwrap() = rows;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn committed(&self) -> Vec<Vec<QueryBuf>> {
        self.committed.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> QueryBuf {
        self.queries.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl SchemaProvider for FakeProvider {
    async fn is_valid(&self) -> bool {
        true
    }

    async fn close(&self) {}

    async fn query(&self, query: &QueryBuf) -> Result<Vec<Row>, AppError> {
        self.queries.lock().unwrap().push(query.clone());
        let rows = self.rows.lock().unwrap().clone();
        if !query.sql.ends_with("LIMIT ? OFFSET ?") {
            return Ok(rows);
        }
        let n = query.params.len();
        let limit = query.params[n - 2].as_u64().unwrap() as usize;
        let offset = query.params[n - 1].as_u64().unwrap() as usize;
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn execute_all(&self, statements: &[QueryBuf]) -> Result<u64, AppError> {
        if self.fail_writes {
            return Err(AppError::Db(sqlx::Error::Protocol("constraint failed".into())));
        }
        self.committed.lock().unwrap().push(statements.to_vec());
        Ok(statements.len() as u64)
    }

    async fn get_schema(
        &self,
        policies: &[AccessPolicy],
        aliases: &BTreeMap<String, Vec<String>>,
    ) -> Result<Schema, AppError> {
        Ok(self.catalog.clone().build(policies, aliases))
    }
}

fn column(table: &str, name: &str, ty: &str, key: &str) -> ColumnRow {
    ColumnRow {
        database: "shop".into(),
        table: table.into(),
        name: name.into(),
        column_type: ty.into(),
        nullable: false,
        column_key: key.into(),
        has_default: false,
    }
}

/// `shop.customers(id, name)` and `shop.orders(id, customer_id -> customers.id)`.
pub fn shop_catalog() -> Introspection {
    Introspection {
        databases: vec!["information_schema".into(), "shop".into()],
        tables: vec![("shop".into(), "customers".into()), ("shop".into(), "orders".into())],
        columns: vec![
            column("customers", "id", "int(11)", "PRI"),
            column("customers", "name", "varchar(64)", ""),
            column("orders", "id", "int(11)", "PRI"),
            column("orders", "customer_id", "int(11)", "MUL"),
        ],
        foreign_keys: vec![ForeignKeyRow {
            source: FieldRef::new("shop", "orders", "customer_id"),
            target: FieldRef::new("shop", "customers", "id"),
        }],
    }
}

/// `n` order rows in `shop_orders` column order: id, customer_id_id, customer_id_name.
pub fn order_rows(n: i64) -> Vec<Row> {
    (1..=n).map(|i| vec![json!(i), json!(100 + i), json!(format!("customer {}", i))]).collect()
}

pub async fn controller(provider: FakeProvider, page_limit: u32) -> (Arc<FakeProvider>, ApiController) {
    let provider = Arc::new(provider);
    let mut aliases = BTreeMap::new();
    aliases.insert("shop.orders".to_string(), vec!["orders".to_string()]);
    let schema = provider.get_schema(&[], &aliases).await.unwrap();
    let contexts = schema.contexts().unwrap();
    let backend: Arc<dyn SchemaProvider> = provider.clone();
    (provider, ApiController::new(backend, contexts, page_limit))
}

pub async fn state(provider: FakeProvider, page_limit: u32) -> (Arc<FakeProvider>, AppState) {
    let (provider, controller) = controller(provider, page_limit).await;
    (provider, AppState::new(controller))
}
