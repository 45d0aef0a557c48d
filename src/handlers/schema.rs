//! Read-only views of the compiled models.

use crate::error::AppError;
use crate::response::{success_many, success_one};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{json, Value};

/// Every model name with its root table.
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    let models: Vec<Value> = state
        .controller
        .contexts()
        .iter()
        .map(|c| {
            json!({
                "name": c.name(),
                "table": c.root().map(|t| t.qualified_name.as_str()),
            })
        })
        .collect();
    success_many(models)
}

/// Display name to type tag, nested along relations.
pub async fn describe_model(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ctx = state.controller.context(&model)?;
    Ok(success_one(
        StatusCode::OK,
        json!({
            "name": ctx.name(),
            "fields": Value::Object(ctx.types_view()),
            "required": ctx.required_fields(),
        }),
    ))
}
