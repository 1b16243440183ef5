use crate::controller::ControllerId;
use crate::metadata::Verb;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// A controller mounted on the table.
#[derive(Clone, Debug)]
pub struct Mount {
    pub controller: ControllerId,
    pub base_path: String,
    /// `(verb, path)` relative to the base path, in declaration order.
    pub routes: Vec<(Verb, String)>,
}

impl Mount {
    /// Full request paths served by this mount.
    pub fn full_paths(&self) -> impl Iterator<Item = (Verb, String)> + '_ {
        self.routes
            .iter()
            .map(|(verb, path)| (*verb, join_path(&self.base_path, path)))
    }

    /// Distinct router paths this mount occupies, including the trailing-slash
    /// form of the collection route.
    pub fn served_paths(&self) -> impl Iterator<Item = String> + '_ {
        let mut paths: Vec<String> = Vec::new();
        for (_, full) in self.full_paths() {
            let slash = (full == self.base_path && self.base_path != "/").then(|| format!("{}/", full));
            for p in std::iter::once(full).chain(slash) {
                if !paths.contains(&p) {
                    paths.push(p);
                }
            }
        }
        paths.into_iter()
    }
}

pub(crate) fn join_path(base: &str, path: &str) -> String {
    match (base, path) {
        ("/", p) => p.to_string(),
        (b, "/") => b.to_string(),
        (b, p) => format!("{}{}", b, p),
    }
}

/// The shared router plus a record of what has been mounted on it.
#[derive(Default)]
pub struct RouteTable {
    router: Router,
    mounts: Vec<Mount>,
    body_limit: Option<usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable::default()
    }

    /// Start from an existing router (e.g. one carrying health routes).
    pub fn with_router(router: Router) -> Self {
        RouteTable {
            router,
            mounts: Vec::new(),
            body_limit: None,
        }
    }

    /// Reject request bodies larger than `bytes` with 413.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }

    pub(crate) fn mount(&mut self, sub_router: Router, mount: Mount) {
        let router = std::mem::take(&mut self.router);
        self.router = router.merge(sub_router);
        tracing::info!(
            controller = %mount.controller,
            base_path = %mount.base_path,
            routes = mount.routes.len(),
            "controller mounted"
        );
        self.mounts.push(mount);
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub fn into_router(self) -> Router {
        match self.body_limit {
            Some(bytes) => self.router.layer(RequestBodyLimitLayer::new(bytes)),
            None => self.router,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_handles_root_on_either_side() {
        assert_eq!(join_path("/", "/users"), "/users");
        assert_eq!(join_path("/api/users", "/"), "/api/users");
        assert_eq!(join_path("/api/users", "/:id"), "/api/users/:id");
    }

    #[test]
    fn served_paths_include_trailing_slash_collection() {
        let mount = Mount {
            controller: ControllerId::of::<Mount>(),
            base_path: "/api/users".into(),
            routes: vec![
                (Verb::Get, "/".into()),
                (Verb::Post, "/".into()),
                (Verb::Get, "/:id".into()),
            ],
        };
        let paths: Vec<String> = mount.served_paths().collect();
        assert_eq!(paths, ["/api/users", "/api/users/", "/api/users/:id"]);
    }
}
