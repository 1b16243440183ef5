//! Example consumer: a users resource served through resource-sdk.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Requires `DATABASE_URL`; see `AppConfig::from_env` for the other variables.

use axum::{extract::Request, middleware::Next};
use chrono::{DateTime, Utc};
use resource_sdk::{
    database, register, telemetry, AppConfig, Column, Container, ControllerId, CrudService, MetadataStore,
    Middleware, PgClient, ResourceController, RouteTable, Table,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

const BODY_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct User {
    id: i64,
    name: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NewUser {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

struct Users;

impl Table for Users {
    type Select = User;
    type Insert = NewUser;
    type Update = UserPatch;
    const NAME: &'static str = "users";

    fn columns() -> &'static [Column] {
        static COLUMNS: &[Column] = &[
            Column::new("id", "int8").with_default(),
            Column::new("name", "text"),
            Column::new("email", "text"),
            Column::new("created_at", "timestamptz").with_default(),
        ];
        COLUMNS
    }
}

const CREATE_USERS: &str = r#"CREATE TABLE IF NOT EXISTS "public"."users" (
    "id" BIGSERIAL PRIMARY KEY,
    "name" TEXT NOT NULL,
    "email" TEXT,
    "created_at" TIMESTAMPTZ NOT NULL DEFAULT now()
)"#;

/// Logs the caller before every users route. Replace with real token checks.
fn auth_guard() -> Middleware {
    Middleware::from_fn("auth", |req: Request, next: Next| async move {
        let has_token = req.headers().contains_key(axum::http::header::AUTHORIZATION);
        tracing::info!(method = %req.method(), path = %req.uri().path(), has_token, "auth guard");
        next.run(req).await
    })
}

type UsersController = ResourceController<Users, PgClient>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let _log_guard = telemetry::init_tracing(&config.log)?;

    database::ensure_database_exists(&config.database).await?;
    let pool = database::connect(&config.database).await?;
    sqlx::query(CREATE_USERS).execute(&pool).await?;

    let mut store = MetadataStore::new();
    let mut container = Container::new();
    let users = UsersController::new(CrudService::new(PgClient::new(pool))).with_search_fields(&["name", "email"]);
    container.provide(users);
    UsersController::declare(&mut store, "/api/users")
        .get("/search", "search")
        .guard(auth_guard());

    let mut table = RouteTable::new().with_body_limit(BODY_LIMIT);
    register(&mut table, &store, &container, &[ControllerId::of::<UsersController>()])?;
    let app = table.into_router();

    let listener = TcpListener::bind(config.server.addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "example consumer listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
