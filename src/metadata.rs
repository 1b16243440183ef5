//! Metadata table: declarative route metadata attached to controllers.
//!
//! Entries are keyed by `(controller, member, kind)`. Base paths replace on
//! repeated attachment; routes and middlewares append, and their order is the
//! declaration order later used for route registration and middleware
//! execution.

use crate::controller::ControllerId;
use crate::middleware::Middleware;
use axum::routing::MethodFilter;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn method_filter(&self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Put => MethodFilter::PUT,
            Verb::Patch => MethodFilter::PATCH,
            Verb::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        })
    }
}

#[derive(Clone, Debug)]
pub struct RouteEntry {
    pub verb: Verb,
    pub path: String,
    pub handler_name: String,
    /// Run before the handler, after controller-level middlewares.
    pub middlewares: Vec<Middleware>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    BasePath,
    Routes,
    Middlewares,
}

#[derive(Clone, Debug)]
pub enum MetadataValue {
    BasePath(String),
    Route(RouteEntry),
    Middlewares(Vec<Middleware>),
}

impl MetadataValue {
    pub fn kind(&self) -> MetadataKind {
        match self {
            MetadataValue::BasePath(_) => MetadataKind::BasePath,
            MetadataValue::Route(_) => MetadataKind::Routes,
            MetadataValue::Middlewares(_) => MetadataKind::Middlewares,
        }
    }
}

/// Borrowed view of a stored entry.
#[derive(Clone, Copy, Debug)]
pub enum Metadata<'a> {
    BasePath(&'a str),
    Routes(&'a [RouteEntry]),
    Middlewares(&'a [Middleware]),
}

#[derive(Debug)]
enum Slot {
    BasePath(String),
    Routes(Vec<RouteEntry>),
    Middlewares(Vec<Middleware>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Key {
    target: ControllerId,
    member: Option<String>,
    kind: MetadataKind,
}

#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: HashMap<Key, Slot>,
}

impl MetadataStore {
    pub fn new() -> Self {
        MetadataStore::default()
    }

    /// Attach a value. `member` is `None` for controller-level metadata.
    pub fn attach(&mut self, target: ControllerId, member: Option<&str>, value: MetadataValue) {
        let key = Key {
            target,
            member: member.map(str::to_string),
            kind: value.kind(),
        };
        match value {
            MetadataValue::BasePath(path) => {
                self.entries.insert(key, Slot::BasePath(path));
            }
            MetadataValue::Route(route) => {
                if let Slot::Routes(routes) = self.entries.entry(key).or_insert_with(|| Slot::Routes(Vec::new())) {
                    routes.push(route);
                }
            }
            MetadataValue::Middlewares(mws) => {
                if let Slot::Middlewares(list) =
                    self.entries.entry(key).or_insert_with(|| Slot::Middlewares(Vec::new()))
                {
                    list.extend(mws);
                }
            }
        }
    }

    pub fn read(&self, kind: MetadataKind, target: ControllerId, member: Option<&str>) -> Option<Metadata<'_>> {
        let key = Key {
            target,
            member: member.map(str::to_string),
            kind,
        };
        self.entries.get(&key).map(|slot| match slot {
            Slot::BasePath(p) => Metadata::BasePath(p),
            Slot::Routes(r) => Metadata::Routes(r),
            Slot::Middlewares(m) => Metadata::Middlewares(m),
        })
    }

    pub fn base_path(&self, target: ControllerId) -> Option<&str> {
        match self.read(MetadataKind::BasePath, target, None) {
            Some(Metadata::BasePath(p)) => Some(p),
            _ => None,
        }
    }

    pub fn routes(&self, target: ControllerId) -> &[RouteEntry] {
        match self.read(MetadataKind::Routes, target, None) {
            Some(Metadata::Routes(r)) => r,
            _ => &[],
        }
    }

    pub fn class_middlewares(&self, target: ControllerId) -> &[Middleware] {
        self.middlewares(target, None)
    }

    pub fn method_middlewares(&self, target: ControllerId, handler: &str) -> &[Middleware] {
        self.middlewares(target, Some(handler))
    }

    fn middlewares(&self, target: ControllerId, member: Option<&str>) -> &[Middleware] {
        match self.read(MetadataKind::Middlewares, target, member) {
            Some(Metadata::Middlewares(m)) => m,
            _ => &[],
        }
    }

    /// Fluent declaration for one controller type.
    pub fn controller<C: 'static>(&mut self) -> ControllerDecl<'_> {
        self.declare(ControllerId::of::<C>())
    }

    pub fn declare(&mut self, target: ControllerId) -> ControllerDecl<'_> {
        ControllerDecl { store: self, target }
    }
}

/// Builder issuing `attach` calls for one controller.
pub struct ControllerDecl<'a> {
    store: &'a mut MetadataStore,
    target: ControllerId,
}

impl<'a> ControllerDecl<'a> {
    pub fn base_path(self, path: &str) -> Self {
        self.store
            .attach(self.target, None, MetadataValue::BasePath(path.to_string()));
        self
    }

    pub fn route(self, verb: Verb, path: &str, handler: &str, middlewares: Vec<Middleware>) -> Self {
        self.store.attach(
            self.target,
            None,
            MetadataValue::Route(RouteEntry {
                verb,
                path: path.to_string(),
                handler_name: handler.to_string(),
                middlewares,
            }),
        );
        self
    }

    pub fn get(self, path: &str, handler: &str) -> Self {
        self.route(Verb::Get, path, handler, Vec::new())
    }

    pub fn post(self, path: &str, handler: &str) -> Self {
        self.route(Verb::Post, path, handler, Vec::new())
    }

    pub fn put(self, path: &str, handler: &str) -> Self {
        self.route(Verb::Put, path, handler, Vec::new())
    }

    pub fn patch(self, path: &str, handler: &str) -> Self {
        self.route(Verb::Patch, path, handler, Vec::new())
    }

    pub fn delete(self, path: &str, handler: &str) -> Self {
        self.route(Verb::Delete, path, handler, Vec::new())
    }

    /// Controller-level middleware.
    pub fn guard(self, middleware: Middleware) -> Self {
        self.store
            .attach(self.target, None, MetadataValue::Middlewares(vec![middleware]));
        self
    }

    /// Method-level middleware, run after the route entry's own middlewares.
    pub fn guard_method(self, handler: &str, middleware: Middleware) -> Self {
        self.store.attach(
            self.target,
            Some(handler),
            MetadataValue::Middlewares(vec![middleware]),
        );
        self
    }

    pub fn id(&self) -> ControllerId {
        self.target
    }
}
