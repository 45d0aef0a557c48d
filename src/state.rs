//! Shared application state for all routes. Contexts are compiled once and never change.

use crate::service::ApiController;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ApiController>,
}

impl AppState {
    pub fn new(controller: ApiController) -> Self {
        AppState {
            controller: Arc::new(controller),
        }
    }
}
