//! Query-execution port: a [`Client`] runs one [`Statement`], the [`Executor`]
//! wraps each labelled operation with timing, logging and error translation.

mod executor;
mod memory;
mod postgres;

pub use executor::Executor;
pub use memory::MemoryClient;
pub use postgres::PgClient;

use crate::error::StoreError;
use crate::sql::{Row, Statement};
use async_trait::async_trait;

/// A store connection that can run statements. Cheap to clone.
#[async_trait]
pub trait Client: Clone + Send + Sync + 'static {
    /// Run one statement and return its rows (empty for statements that return none).
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, StoreError>;
}
