//! Table capability: the contract a resource table exposes to the generic repository.

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One column of a resource table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    /// PostgreSQL type name used for parameter casts (e.g. "uuid", "int8", "timestamptz").
    pub pg_type: &'static str,
    /// Whether the store assigns a default when the insert omits the column.
    pub has_default: bool,
}

impl Column {
    pub const fn new(name: &'static str, pg_type: &'static str) -> Self {
        Column {
            name,
            pg_type,
            has_default: false,
        }
    }

    pub const fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.pg_type.to_ascii_lowercase().as_str(),
            "int2" | "int4" | "int8" | "smallint" | "integer" | "int" | "bigint" | "smallserial" | "serial" | "bigserial"
        )
    }

    pub fn is_uuid(&self) -> bool {
        self.pg_type.eq_ignore_ascii_case("uuid")
    }
}

/// Static description of a table, passed to statements and the store.
#[derive(Clone, Copy, Debug)]
pub struct TableRef {
    pub schema: Option<&'static str>,
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [Column],
}

impl TableRef {
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key_column(&self) -> Option<&'static Column> {
        self.column(self.primary_key)
    }
}

/// A resource table the generic repository can operate on.
///
/// `Select` is the row shape returned by reads, `Insert` the shape accepted by
/// create, and `Update` the partial shape accepted by update. `Update` should
/// skip absent fields when serialized so only supplied columns are written.
pub trait Table: Send + Sync + 'static {
    type Select: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Insert: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Update: Serialize + DeserializeOwned + Send + Sync + 'static;

    const NAME: &'static str;
    const SCHEMA: Option<&'static str> = None;
    const PRIMARY_KEY: &'static str = "id";

    fn columns() -> &'static [Column];

    fn column(name: &str) -> Option<&'static Column> {
        Self::columns().iter().find(|c| c.name == name)
    }

    fn table_ref() -> TableRef {
        TableRef {
            schema: Self::SCHEMA,
            name: Self::NAME,
            primary_key: Self::PRIMARY_KEY,
            columns: Self::columns(),
        }
    }
}

/// Primary key value: integer or string (uuid and text keys are strings).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Text(String),
}

impl Id {
    pub fn to_value(&self) -> Value {
        match self {
            Id::Int(n) => Value::Number((*n).into()),
            Id::Text(s) => Value::String(s.clone()),
        }
    }

    /// Parse a path segment according to the primary key column type.
    pub fn parse_for(column: Option<&Column>, raw: &str) -> Result<Id, AppError> {
        match column {
            Some(c) if c.is_integer() => raw
                .parse::<i64>()
                .map(Id::Int)
                .map_err(|_| AppError::BadRequest(format!("invalid id '{}'", raw))),
            Some(c) if c.is_uuid() => uuid::Uuid::parse_str(raw)
                .map(|u| Id::Text(u.to_string()))
                .map_err(|_| AppError::BadRequest(format!("invalid uuid '{}'", raw))),
            _ => Ok(Id::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Int(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::Text(s)
    }
}
