//! Structured filters: JSON boolean expression trees compiled to query conditions.
//!
//! ```text
//! { "combinator": "and", "rules": [
//!     { "field": "name", "operator": "=", "value": "John" },
//!     { "combinator": "or", "rules": [
//!         { "field": "city", "operator": "=", "value": "New York" },
//!         { "field": "city", "operator": "=", "value": "Los Angeles" } ] } ] }
//! ```
//! compiles to `("name" = $1 AND ("city" = $2 OR "city" = $3))`.

mod compiler;
mod types;
pub use compiler::{compile, validate_field};
pub use types::*;
