//! Resolves a context by name and runs translated statements through the provider.

use crate::context::Context;
use crate::error::AppError;
use crate::provider::SchemaProvider;
use crate::service::query::{translate_multiple, translate_single};
use axum::http::StatusCode;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Payload and status of a successful operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub data: Value,
}

impl Reply {
    fn ok(data: Value) -> Self {
        Reply {
            status: StatusCode::OK,
            data,
        }
    }
}

pub struct ApiController {
    provider: Arc<dyn SchemaProvider>,
    contexts: Vec<Context>,
    /// Rows per page; 0 disables paging.
    page_limit: u32,
}

impl ApiController {
    pub fn new(provider: Arc<dyn SchemaProvider>, contexts: Vec<Context>, page_limit: u32) -> Self {
        ApiController {
            provider,
            contexts,
            page_limit,
        }
    }

    pub fn provider(&self) -> &Arc<dyn SchemaProvider> {
        &self.provider
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    /// Context by exact name, then by any alias of its root table.
    pub fn context(&self, name: &str) -> Result<&Context, AppError> {
        let ctx = self
            .contexts
            .iter()
            .find(|c| c.name() == name)
            .or_else(|| self.contexts.iter().find(|c| c.answers_to(name)))
            .ok_or_else(|| AppError::NotFound(format!("unknown model '{}'", name)))?;
        if ctx.tables().is_empty() {
            return Err(AppError::Integrity(format!("model '{}' has no tables", name)));
        }
        Ok(ctx)
    }

    pub async fn query_multiple(&self, name: &str, params: &BTreeMap<String, String>) -> Result<Reply, AppError> {
        let ctx = self.context(name)?;
        let list = translate_multiple(ctx, params, self.page_limit)?;
        let rows = self.provider.query(&list.query).await?;
        if let Some(page) = list.page.filter(|p| *p > 1 && rows.is_empty()) {
            return Err(AppError::NotFound(format!("page {} of '{}' is out of range", page, name)));
        }
        let data = rows
            .iter()
            .map(|row| ctx.unpack_single(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Reply::ok(Value::Array(data)))
    }

    pub async fn query_single(&self, name: &str, id: &str) -> Result<Reply, AppError> {
        let ctx = self.context(name)?;
        Ok(Reply::ok(self.fetch_one(ctx, id).await?))
    }

    /// Inserts the body and every related row it nests, in one transaction.
    pub async fn create(&self, name: &str, body: &Map<String, Value>) -> Result<Reply, AppError> {
        let ctx = self.context(name)?;
        let packed = ctx.pack_single(body)?;
        let statements = ctx.post_sql_parts(&packed)?;
        self.provider.execute_all(&statements).await?;
        tracing::debug!(model = %ctx.name(), statements = statements.len(), "created");
        Ok(Reply {
            status: StatusCode::CREATED,
            data: Value::Object(ctx.pack_api(&packed)?),
        })
    }

    /// Deletes the row and the related rows joined to it, in one transaction.
    pub async fn delete(&self, name: &str, id: &str) -> Result<Reply, AppError> {
        let ctx = self.context(name)?;
        let current = self.fetch_one(ctx, id).await?;
        let Value::Object(api) = &current else {
            return Err(AppError::Contract("unpacked row is not an object".into()));
        };
        let packed = ctx.to_model_pack(api)?;
        let statements = ctx.del_sql_parts(&packed)?;
        self.provider.execute_all(&statements).await?;
        tracing::debug!(model = %ctx.name(), statements = statements.len(), "deleted");
        Ok(Reply::ok(current))
    }

    async fn fetch_one(&self, ctx: &Context, id: &str) -> Result<Value, AppError> {
        let query = translate_single(ctx, id)?;
        let rows = self.provider.query(&query).await?;
        match rows.as_slice() {
            [] => Err(AppError::NotFound(format!("no '{}' with id '{}'", ctx.name(), id))),
            [row] => ctx.unpack_single(row),
            _ => Err(AppError::Integrity(format!(
                "{} rows of '{}' share id '{}'",
                rows.len(),
                ctx.name(),
                id
            ))),
        }
    }
}
