//! Model handlers: list, read, create, delete. Each delegates to the controller.

use crate::error::AppError;
use crate::service::Reply;
use crate::state::AppState;
use axum::extract::{Path, Query, RawQuery, State};
use axum::Json;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Reply, AppError> {
    state.controller.query_multiple(&model, &params).await
}

pub async fn read(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<Reply, AppError> {
    if query.is_some_and(|q| !q.is_empty()) {
        return Err(AppError::BadRequest("bad parameters: single reads take none".into()));
    }
    state.controller.query_single(&model, &id).await
}

pub async fn create(
    State(state): State<AppState>,
    Path(model): Path<String>,
    Json(body): Json<Value>,
) -> Result<Reply, AppError> {
    let body = body_to_map(body)?;
    state.controller.create(&model, &body).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path((model, id)): Path<(String, String)>,
) -> Result<Reply, AppError> {
    state.controller.delete(&model, &id).await
}
