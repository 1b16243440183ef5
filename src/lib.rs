//! Resource SDK: declarative route registration and filtered CRUD over PostgreSQL.
//!
//! Controllers declare their routes in a [`MetadataStore`]; [`register`] turns
//! that metadata into mounted axum routers. Requests reach a [`CrudService`],
//! which compiles JSON filter trees into parameterized conditions and runs
//! them through a [`Repository`] over any [`Client`].

pub mod config;
pub mod container;
pub mod controller;
pub mod database;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod middleware;
pub mod repository;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod store;
pub mod table;
pub mod telemetry;

pub use config::AppConfig;
pub use container::Container;
pub use controller::{Controller, ControllerId, ResourceController};
pub use error::{AppError, ConfigError, ConfigurationError, InvalidFilterError, QueryExecutionError, StoreError};
pub use filter::{compile, FilterRule, FilterRuleGroup, Operator};
pub use metadata::{MetadataStore, Verb};
pub use middleware::Middleware;
pub use repository::{FindOptionsSql, Repository};
pub use routes::{register, RouteTable};
pub use service::{CrudService, FindOptions};
pub use store::{Client, Executor, MemoryClient, PgClient};
pub use table::{Column, Id, Table};
