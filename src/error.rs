//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Malformed controller or route metadata. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("controller {controller}: could not be resolved from the container")]
    Unresolved { controller: String },
    #[error("controller {controller}: base path is not defined")]
    MissingBasePath { controller: String },
    #[error("controller {controller}: invalid base path '{base_path}'")]
    InvalidBasePath { controller: String, base_path: String },
    #[error("controller {controller}: base path '{base_path}' is already mounted")]
    DuplicateBasePath { controller: String, base_path: String },
    #[error("controller {controller}: no routes defined")]
    NoRoutes { controller: String },
    #[error("controller {controller}: method {handler} is not defined")]
    MissingHandler { controller: String, handler: String },
    #[error("controller {controller}: invalid route path '{path}' for {handler}")]
    InvalidRoutePath {
        controller: String,
        handler: String,
        path: String,
    },
    #[error("controller {controller}: route '{path}' conflicts with '{existing}'")]
    ConflictingRoute {
        controller: String,
        path: String,
        existing: String,
    },
    #[error("controller {controller}: duplicate route {verb} {path}")]
    DuplicateRoute {
        controller: String,
        verb: String,
        path: String,
    },
}

/// Malformed filter tree, rejected before any query runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidFilterError {
    #[error("invalid field identifier '{0}'")]
    InvalidField(String),
    #[error("operator {operator} on '{field}' requires a [low, high] pair")]
    InvalidRange { field: String, operator: &'static str },
    #[error("malformed filter: {0}")]
    Malformed(String),
}

/// Uniform wrapper around any store failure. The store detail is logged, never exposed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{label}] database query failed")]
pub struct QueryExecutionError {
    pub label: String,
}

impl QueryExecutionError {
    pub fn new(label: impl Into<String>) -> Self {
        QueryExecutionError { label: label.into() }
    }
}

/// Driver-level failure raised inside an execution-port operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("{0}")]
    Other(String),
}

/// Environment configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(String),
    #[error("environment variable {key} is not a valid number: '{value}'")]
    InvalidNumber { key: String, value: String },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilterError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    QueryExecution(#[from] QueryExecutionError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::QueryExecution(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "config_error",
            AppError::InvalidFilter(_) => "invalid_filter",
            AppError::NotFound(_) => "not_found",
            AppError::QueryExecution(_) => "database_error",
            AppError::BadRequest(_) => "bad_request",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (self.status(), Json(body)).into_response()
    }
}
