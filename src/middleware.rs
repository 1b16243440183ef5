//! Named request middleware attached to controllers and routes.

use crate::controller::BoxFuture;
use axum::{extract::Request, middleware::Next, response::Response};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type MiddlewareFn = dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync;

/// A middleware function with a name for logs and errors.
///
/// The function either calls `next.run(request)` or short-circuits with its
/// own response.
#[derive(Clone)]
pub struct Middleware {
    name: Arc<str>,
    func: Arc<MiddlewareFn>,
}

impl Middleware {
    pub fn from_fn<F, Fut>(name: &str, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Middleware {
            name: Arc::from(name),
            func: Arc::new(move |req, next| Box::pin(f(req, next))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(&self, request: Request, next: Next) -> Response {
        (self.func)(request, next).await
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name).finish()
    }
}
