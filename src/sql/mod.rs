//! Safe SQL builder: identifiers from table definitions or validated filters, values as parameters.

mod builder;
mod condition;
pub mod params;
pub use builder::*;
pub use condition::{CompareOp, Condition};
pub(crate) use condition::{compare_values, value_text};
pub use params::*;
pub(crate) use builder::quoted;
