//! Route registration and the mounted route table.

mod registrar;
mod table;
pub use registrar::register;
pub use table::{Mount, RouteTable};
