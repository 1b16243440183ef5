//! Controllers expose named request handlers that the registrar binds to routes.

mod resource;
pub use resource::ResourceController;

use axum::{extract::Request, response::Response};
use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased request handler bound to a controller instance.
pub type BoxHandler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// A controller resolves handler names declared in route metadata.
pub trait Controller: Send + Sync + 'static {
    /// The handler called `name`, or `None` if the controller has no such member.
    fn handler(self: Arc<Self>, name: &str) -> Option<BoxHandler>;
}

/// Identity of a controller type, used as the metadata and container key.
#[derive(Clone, Copy)]
pub struct ControllerId {
    type_id: TypeId,
    name: &'static str,
}

impl ControllerId {
    pub fn of<C: ?Sized + 'static>() -> Self {
        ControllerId {
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ControllerId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ControllerId {}

impl Hash for ControllerId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Bind an async method of `controller` as a [`BoxHandler`].
pub fn bind<C, F, Fut>(controller: &Arc<C>, f: F) -> BoxHandler
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let controller = Arc::clone(controller);
    Arc::new(move |req| Box::pin(f(Arc::clone(&controller), req)))
}
