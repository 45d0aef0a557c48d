//! HTTP handlers for model CRUD and schema views.

pub mod entity;
pub mod schema;
pub use entity::*;
pub use schema::*;
