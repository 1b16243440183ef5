//! Process configuration read once from the environment at startup.

mod env;
pub use env::{AppConfig, DatabaseConfig, LogConfig, LogFormat, ServerConfig};
