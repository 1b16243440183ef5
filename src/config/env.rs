use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub ssl: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Daily-rolling log files are written here when set.
    pub dir: Option<PathBuf>,
    /// Fallback filter when `RUST_LOG` is unset.
    pub default_filter: String,
}

/// Configuration object built once and passed to whatever needs it.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. `DATABASE_URL` is required; everything else has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let url = get("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".into()))?;

        let database = DatabaseConfig {
            url,
            max_connections: number(&get, "DATABASE_MAX_CONNECTION", 10)?,
            idle_timeout: Duration::from_millis(number(&get, "DATABASE_IDLE_TIMEOUT", 10_000)?),
            connect_timeout: Duration::from_millis(number(&get, "DATABASE_CONNECTION_TIMEOUT", 10_000)?),
            ssl: flag(&get, "SSL")?,
        };
        let server = ServerConfig {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: number(&get, "PORT", 4000)?,
        };
        let format = match get("LOG_FORMAT").map(|v| v.to_ascii_lowercase()) {
            None => LogFormat::Pretty,
            Some(v) if v == "pretty" || v == "text" => LogFormat::Pretty,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT".into(),
                    value: v,
                })
            }
        };
        let log = LogConfig {
            format,
            dir: get("LOG_DIR").map(PathBuf::from),
            default_filter: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
        };
        Ok(AppConfig { database, server, log })
    }
}

fn number<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: v,
        }),
    }
}

fn flag<G>(get: &G, key: &str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: v,
            }),
        },
    }
}
