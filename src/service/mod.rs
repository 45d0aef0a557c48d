//! Query translation: query strings and bodies in, parameterized statements out.

mod controller;
pub mod params;
pub mod query;

pub use controller::{ApiController, Reply};
pub use params::{Comparator, ParamKind};
pub use query::{translate_multiple, translate_single, ListQuery};
