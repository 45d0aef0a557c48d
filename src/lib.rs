//! tablerest: a REST API compiled from the introspected schema of a relational database.

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod naming;
pub mod provider;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load, load_from_env, load_from_path, ServerConfig};
pub use context::Context;
pub use error::{AppError, ConfigError, SchemaError};
pub use provider::{MySqlProvider, SchemaProvider};
pub use routes::{app, common_routes, entity_routes};
pub use schema::Schema;
pub use service::ApiController;
pub use state::AppState;
