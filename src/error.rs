//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("missing required option: {0}")]
    MissingOption(&'static str),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failures raised while building or renaming schema model elements.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("alias '{alias}' is not a member of name '{name}'")]
    UnknownAlias { name: String, alias: String },
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("relation cycle: {0}")]
    CyclicSchema(String),
    #[error("relation nesting deeper than {0} hops")]
    DepthExceeded(usize),
    #[error("context joins more than {0} tables")]
    TooManyTables(usize),
    #[error("display name '{name}' is used by more than one column of '{context}'")]
    AmbiguousName { context: String, name: String },
    #[error("invalid shape: {0}")]
    InvalidShape(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("integrity: {0}")]
    Integrity(String),
    #[error("contract violation: {0}")]
    Contract(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::MissingField(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Schema(_)
            | AppError::Integrity(_)
            | AppError::Contract(_)
            | AppError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Schema(_) => "schema_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::MissingField(_) => "missing_field",
            AppError::NotFound(_) => "not_found",
            AppError::Integrity(_) => "integrity_error",
            AppError::Contract(_) => "contract_violation",
            AppError::Db(_) => "database_error",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            AppError::MissingField(name) => Some(serde_json::json!({ "field": name })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
