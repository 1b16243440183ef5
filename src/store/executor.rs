use super::Client;
use crate::error::{QueryExecutionError, StoreError};
use std::future::Future;
use std::time::Instant;

#[derive(Clone, Debug)]
pub struct Executor<C> {
    client: C,
}

impl<C: Client> Executor<C> {
    pub fn new(client: C) -> Self {
        Executor { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run `op` against a client handle under `label`.
    ///
    /// Start and completion are logged at debug level with the elapsed time.
    /// A failure is logged with the store error and returned as
    /// [`QueryExecutionError`], which carries only the label.
    pub async fn execute<R, F, Fut>(&self, label: &str, op: F) -> Result<R, QueryExecutionError>
    where
        F: FnOnce(C) -> Fut,
        Fut: Future<Output = Result<R, StoreError>> + Send,
        R: Send,
    {
        let started = Instant::now();
        tracing::debug!(label, "query started");
        match op(self.client.clone()).await {
            Ok(out) => {
                tracing::debug!(
                    label,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "query completed"
                );
                Ok(out)
            }
            Err(e) => {
                tracing::error!(
                    label,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "query failed"
                );
                Err(QueryExecutionError::new(label))
            }
        }
    }
}
