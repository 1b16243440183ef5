mod common;

use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use common::{seeded_client, Users};
use resource_sdk::controller::{bind, BoxHandler};
use resource_sdk::{
    register, ConfigurationError, Container, Controller, ControllerId, CrudService, MemoryClient, MetadataStore,
    Middleware, ResourceController, RouteTable, Verb,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

type Log = Arc<Mutex<Vec<String>>>;

struct Greeter {
    log: Log,
}

impl Controller for Greeter {
    fn handler(self: Arc<Self>, name: &str) -> Option<BoxHandler> {
        match name {
            "hello" => Some(bind(&self, |c, _req| async move {
                c.log.lock().unwrap().push("handler".into());
                "hello".into_response()
            })),
            "bye" => Some(bind(&self, |_c, _req| async move { "bye".into_response() })),
            _ => None,
        }
    }
}

fn recorder(name: &'static str, log: &Log) -> Middleware {
    let log = log.clone();
    Middleware::from_fn(name, move |req: Request, next: Next| {
        let log = log.clone();
        async move {
            log.lock().unwrap().push(name.to_string());
            next.run(req).await
        }
    })
}

fn deny() -> Middleware {
    Middleware::from_fn("deny", |_req: Request, _next: Next| async { StatusCode::UNAUTHORIZED.into_response() })
}

fn greeter(container: &mut Container) -> Log {
    let log = Log::default();
    container.provide(Greeter { log: log.clone() });
    log
}

fn get(uri: &str) -> Request {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[test]
fn controller_without_base_path_mounts_nothing() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    greeter(&mut container);
    store.controller::<Greeter>().get("/hello", "hello");

    let mut table = RouteTable::new();
    let err = register(&mut table, &store, &container, &[ControllerId::of::<Greeter>()]).unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingBasePath { ref controller } if controller.contains("Greeter")));
    assert!(table.is_empty());
}

#[test]
fn controller_without_routes_mounts_nothing() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    greeter(&mut container);
    store.controller::<Greeter>().base_path("/greet");

    let mut table = RouteTable::new();
    let err = register(&mut table, &store, &container, &[ControllerId::of::<Greeter>()]).unwrap_err();
    assert!(matches!(err, ConfigurationError::NoRoutes { .. }));
    assert!(table.is_empty());
}

#[test]
fn missing_handler_names_controller_and_method() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    greeter(&mut container);
    store
        .controller::<Greeter>()
        .base_path("/greet")
        .get("/hello", "hello")
        .get("/oops", "missing");

    let mut table = RouteTable::new();
    let err = register(&mut table, &store, &container, &[ControllerId::of::<Greeter>()]).unwrap_err();
    match &err {
        ConfigurationError::MissingHandler { controller, handler } => {
            assert!(controller.contains("Greeter"));
            assert_eq!(handler, "missing");
        }
        other => panic!("unexpected error {:?}", other),
    }
    let message = err.to_string();
    assert!(message.contains("Greeter") && message.contains("missing"));
    assert!(table.is_empty());
}

#[test]
fn unresolvable_controller_is_a_configuration_error() {
    let mut store = MetadataStore::new();
    store.controller::<Greeter>().base_path("/greet").get("/hello", "hello");
    let mut table = RouteTable::new();
    let err = register(&mut table, &store, &Container::new(), &[ControllerId::of::<Greeter>()]).unwrap_err();
    assert!(matches!(err, ConfigurationError::Unresolved { .. }));
}

#[test]
fn one_bad_controller_aborts_the_whole_registration() {
    type UsersController = ResourceController<Users, MemoryClient>;
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    container.provide(UsersController::new(CrudService::new(seeded_client())));
    UsersController::declare(&mut store, "/api/users");
    greeter(&mut container);
    store.controller::<Greeter>().base_path("/greet").get("/x", "missing");

    let mut table = RouteTable::new();
    let ids = [ControllerId::of::<UsersController>(), ControllerId::of::<Greeter>()];
    assert!(register(&mut table, &store, &container, &ids).is_err());
    assert!(table.is_empty());
}

#[test]
fn duplicate_verb_and_path_is_rejected() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    greeter(&mut container);
    store
        .controller::<Greeter>()
        .base_path("/greet")
        .get("/hello", "hello")
        .get("/hello", "bye");
    let err = register(&mut RouteTable::new(), &store, &container, &[ControllerId::of::<Greeter>()]).unwrap_err();
    assert!(matches!(err, ConfigurationError::DuplicateRoute { ref verb, .. } if verb == "GET"));
}

#[test]
fn second_mount_at_same_base_path_is_rejected() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    greeter(&mut container);
    store.controller::<Greeter>().base_path("/greet").get("/hello", "hello");
    let ids = [ControllerId::of::<Greeter>()];

    let mut table = RouteTable::new();
    register(&mut table, &store, &container, &ids).unwrap();
    let err = register(&mut table, &store, &container, &ids).unwrap_err();
    assert!(matches!(err, ConfigurationError::DuplicateBasePath { .. }));
    assert_eq!(table.mounts().len(), 1);
}

#[tokio::test]
async fn middlewares_run_class_then_route_then_method_then_handler() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    let log = greeter(&mut container);
    store
        .controller::<Greeter>()
        .base_path("/greet/")
        .guard(recorder("class-1", &log))
        .route(Verb::Get, "/hello", "hello", vec![recorder("route-1", &log), recorder("route-2", &log)])
        .guard(recorder("class-2", &log))
        .guard_method("hello", recorder("method-1", &log));

    let mut table = RouteTable::new();
    register(&mut table, &store, &container, &[ControllerId::of::<Greeter>()]).unwrap();
    assert_eq!(table.mounts()[0].base_path, "/greet");

    let res = table.into_router().oneshot(get("/greet/hello")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        *log.lock().unwrap(),
        ["class-1", "class-2", "route-1", "route-2", "method-1", "handler"]
    );
}

#[tokio::test]
async fn guard_can_short_circuit_before_the_handler() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    let log = greeter(&mut container);
    store
        .controller::<Greeter>()
        .base_path("/greet")
        .get("/hello", "hello")
        .get("/bye", "bye")
        .guard_method("hello", deny());

    let mut table = RouteTable::new();
    register(&mut table, &store, &container, &[ControllerId::of::<Greeter>()]).unwrap();
    let router = table.into_router();

    let res = router.clone().oneshot(get("/greet/hello")).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(log.lock().unwrap().is_empty());

    let res = router.oneshot(get("/greet/bye")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn verbs_on_one_path_share_a_route() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    greeter(&mut container);
    store
        .controller::<Greeter>()
        .base_path("/greet")
        .get("/", "hello")
        .post("/", "bye");

    let mut table = RouteTable::new();
    register(&mut table, &store, &container, &[ControllerId::of::<Greeter>()]).unwrap();
    let router = table.into_router();

    let post = Request::builder().method("POST").uri("/greet").body(Body::empty()).unwrap();
    assert_eq!(router.clone().oneshot(get("/greet")).await.unwrap().status(), StatusCode::OK);
    assert_eq!(router.clone().oneshot(post).await.unwrap().status(), StatusCode::OK);
    let delete = Request::builder().method("DELETE").uri("/greet").body(Body::empty()).unwrap();
    assert_eq!(
        router.oneshot(delete).await.unwrap().status(),
        StatusCode::METHOD_NOT_ALLOWED
    );
}

#[test]
fn conflicting_parameter_names_are_rejected_without_mounting() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    greeter(&mut container);
    store
        .controller::<Greeter>()
        .base_path("/g")
        .get("/:id", "hello")
        .delete("/:key", "bye");

    let mut table = RouteTable::new();
    let err = register(&mut table, &store, &container, &[ControllerId::of::<Greeter>()]).unwrap_err();
    match err {
        ConfigurationError::ConflictingRoute { path, existing, .. } => {
            assert_eq!(path, "/:key");
            assert_eq!(existing, "/:id");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(table.is_empty());
}

#[test]
fn wildcard_route_is_rejected() {
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    greeter(&mut container);
    store.controller::<Greeter>().base_path("/g").get("/*rest", "hello");
    let err = register(&mut RouteTable::new(), &store, &container, &[ControllerId::of::<Greeter>()]).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidRoutePath { .. }));
}

#[test]
fn controllers_may_not_share_a_full_path() {
    type UsersController = ResourceController<Users, MemoryClient>;
    let mut store = MetadataStore::new();
    let mut container = Container::new();
    container.provide(UsersController::new(CrudService::new(seeded_client())));
    UsersController::declare(&mut store, "/api/users");
    greeter(&mut container);
    store.controller::<Greeter>().base_path("/api").get("/users", "hello");

    let mut table = RouteTable::new();
    let ids = [ControllerId::of::<UsersController>(), ControllerId::of::<Greeter>()];
    let err = register(&mut table, &store, &container, &ids).unwrap_err();
    assert!(matches!(err, ConfigurationError::ConflictingRoute { ref path, .. } if path == "/api/users"));
    assert!(table.is_empty());
}
