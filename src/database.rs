//! PostgreSQL pool construction and database bootstrap.

use crate::config::DatabaseConfig;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use sqlx::ConnectOptions;
use std::str::FromStr;

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, sqlx::Error> {
    let opts = PgConnectOptions::from_str(&config.url)?;
    Ok(if config.ssl {
        opts.ssl_mode(PgSslMode::Require)
    } else {
        opts
    })
}

/// Build the shared pool from configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.connect_timeout)
        .connect_with(connect_options(config)?)
        .await?;
    tracing::info!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}

/// Create the target database if it does not exist, connecting through the
/// `postgres` maintenance database on the same server.
pub async fn ensure_database_exists(config: &DatabaseConfig) -> Result<(), sqlx::Error> {
    let target = connect_options(config)?;
    let Some(db_name) = target.get_database().map(str::to_string) else {
        return Ok(());
    };
    if db_name == "postgres" {
        return Ok(());
    }
    let mut conn = target.database("postgres").connect().await?;
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists {
        sqlx::query(&format!("CREATE DATABASE {}", crate::sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "database created");
    }
    Ok(())
}
