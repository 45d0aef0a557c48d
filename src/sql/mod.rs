//! Parameterized SQL: identifiers from the introspected schema only, values always as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
