//! Route registrar: turns controller metadata into mounted axum routers.
//!
//! Every controller is resolved, validated and built before anything is
//! mounted, so a configuration error leaves the route table untouched.

use super::table::{join_path, Mount, RouteTable};
use crate::container::Container;
use crate::controller::{BoxHandler, ControllerId};
use crate::error::ConfigurationError;
use crate::metadata::{MetadataStore, RouteEntry};
use crate::middleware::Middleware;
use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    routing::{on, MethodRouter},
    Router,
};
use std::collections::HashSet;

struct Planned {
    router: Router,
    mount: Mount,
}

/// Mount each controller in `controllers`, in order.
///
/// Middleware order per request: controller middlewares in declaration order,
/// then the route entry's middlewares, then method-level middlewares, then the
/// handler.
pub fn register(
    table: &mut RouteTable,
    store: &MetadataStore,
    container: &Container,
    controllers: &[ControllerId],
) -> Result<(), ConfigurationError> {
    let mut base_paths: HashSet<String> = table.mounts().iter().map(|m| m.base_path.clone()).collect();
    // Paths already served by other controllers. Controllers never share a path.
    let mut served: Vec<String> = table.mounts().iter().flat_map(Mount::served_paths).collect();

    let mut planned = Vec::with_capacity(controllers.len());
    for &id in controllers {
        let plan = plan(store, container, id)?;
        let base_path = &plan.mount.base_path;
        if base_path != "/" && !base_paths.insert(base_path.clone()) {
            return Err(ConfigurationError::DuplicateBasePath {
                controller: id.to_string(),
                base_path: base_path.clone(),
            });
        }
        let own: Vec<String> = plan.mount.served_paths().collect();
        for path in &own {
            if let Some(existing) = served.iter().find(|s| *s == path || paths_conflict(s, path)) {
                return Err(ConfigurationError::ConflictingRoute {
                    controller: id.to_string(),
                    path: path.clone(),
                    existing: existing.clone(),
                });
            }
        }
        served.extend(own);
        planned.push(plan);
    }

    for p in planned {
        table.mount(p.router, p.mount);
    }
    Ok(())
}

fn plan(store: &MetadataStore, container: &Container, id: ControllerId) -> Result<Planned, ConfigurationError> {
    let controller = container.resolve(id).ok_or_else(|| ConfigurationError::Unresolved {
        controller: id.to_string(),
    })?;
    let base_path = normalize_base_path(id, store.base_path(id))?;

    let entries = store.routes(id);
    if entries.is_empty() {
        return Err(ConfigurationError::NoRoutes {
            controller: id.to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut bound: Vec<(&RouteEntry, BoxHandler)> = Vec::with_capacity(entries.len());
    for entry in entries {
        let handler = controller
            .clone()
            .handler(&entry.handler_name)
            .ok_or_else(|| ConfigurationError::MissingHandler {
                controller: id.to_string(),
                handler: entry.handler_name.clone(),
            })?;
        if !entry.path.starts_with('/') || !segments_valid(&entry.path) {
            return Err(ConfigurationError::InvalidRoutePath {
                controller: id.to_string(),
                handler: entry.handler_name.clone(),
                path: entry.path.clone(),
            });
        }
        if !seen.insert((entry.verb, entry.path.as_str())) {
            return Err(ConfigurationError::DuplicateRoute {
                controller: id.to_string(),
                verb: entry.verb.to_string(),
                path: entry.path.clone(),
            });
        }
        if let Some(existing) = bound
            .iter()
            .map(|(e, _)| e.path.as_str())
            .find(|p| paths_conflict(p, &entry.path))
        {
            return Err(ConfigurationError::ConflictingRoute {
                controller: id.to_string(),
                path: entry.path.clone(),
                existing: existing.to_string(),
            });
        }
        bound.push((entry, handler));
    }

    let mut paths: Vec<(String, MethodRouter)> = Vec::new();
    for (entry, handler) in bound {
        let chain: Vec<Middleware> = entry
            .middlewares
            .iter()
            .chain(store.method_middlewares(id, &entry.handler_name))
            .cloned()
            .collect();
        let mut method_router = on(entry.verb.method_filter(), move |req: Request| handler(req));
        for mw in chain.into_iter().rev() {
            method_router = method_router.route_layer(from_fn(move |req: Request, next: Next| {
                let mw = mw.clone();
                async move { mw.run(req, next).await }
            }));
        }
        tracing::debug!(controller = %id, verb = %entry.verb, path = %join_path(&base_path, &entry.path), handler = %entry.handler_name, "route bound");
        match paths.iter_mut().find(|(p, _)| *p == entry.path) {
            Some((_, existing)) => *existing = std::mem::take(existing).merge(method_router),
            None => paths.push((entry.path.clone(), method_router)),
        }
    }

    // Full paths, so the collection route answers with and without a trailing slash.
    let mut router = Router::new();
    for (path, method_router) in paths {
        if path == "/" && base_path != "/" {
            router = router.route(&format!("{}/", base_path), method_router.clone());
        }
        router = router.route(&join_path(&base_path, &path), method_router);
    }
    for mw in store.class_middlewares(id).iter().rev().cloned() {
        router = router.route_layer(from_fn(move |req: Request, next: Next| {
            let mw = mw.clone();
            async move { mw.run(req, next).await }
        }));
    }

    Ok(Planned {
        router,
        mount: Mount {
            controller: id,
            base_path,
            routes: entries.iter().map(|e| (e.verb, e.path.clone())).collect(),
        },
    })
}

/// Every segment is literal text or a named `:param`; wildcards are not mounted.
fn segments_valid(path: &str) -> bool {
    path.split('/').all(|seg| !seg.contains('*') && (!seg.starts_with(':') || seg.len() > 1))
}

/// Two paths the router cannot hold together: at the first position where both
/// have a parameter, the names differ, with every earlier segment equal.
fn paths_conflict(a: &str, b: &str) -> bool {
    for (x, y) in a.split('/').zip(b.split('/')) {
        match (x.strip_prefix(':'), y.strip_prefix(':')) {
            (Some(px), Some(py)) if px != py => return true,
            (Some(_), Some(_)) => {}
            (None, None) if x == y => {}
            _ => return false,
        }
    }
    false
}

/// Must be present, start with `/` and contain no wildcard. A trailing `/` is dropped.
fn normalize_base_path(id: ControllerId, base_path: Option<&str>) -> Result<String, ConfigurationError> {
    let raw = base_path.ok_or_else(|| ConfigurationError::MissingBasePath {
        controller: id.to_string(),
    })?;
    let invalid = || ConfigurationError::InvalidBasePath {
        controller: id.to_string(),
        base_path: raw.to_string(),
    };
    if !raw.starts_with('/') || raw.contains('*') || raw.contains("//") || raw.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let trimmed = raw.trim_end_matches('/');
    Ok(if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() })
}
