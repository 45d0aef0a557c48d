//! Model routes. One context per path segment; `/schema` lists and describes them.

use crate::handlers::entity::{create, delete as delete_handler, list, read};
use crate::handlers::schema::{describe_model, list_models};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/schema", get(list_models))
        .route("/schema/:model", get(describe_model))
        .route("/:model", get(list).post(create))
        .route("/:model/:id", get(read).delete(delete_handler))
        .with_state(state)
}
