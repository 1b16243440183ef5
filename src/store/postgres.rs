//! PostgreSQL client over a sqlx pool.

use super::Client;
use crate::error::StoreError;
use crate::sql::{PgBindValue, Row, Statement};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::{Column, Row as _, TypeInfo};

#[derive(Clone, Debug)]
pub struct PgClient {
    pool: PgPool,
}

impl PgClient {
    pub fn new(pool: PgPool) -> Self {
        PgClient { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Client for PgClient {
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, StoreError> {
        let q = statement.to_query();
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }
}

fn row_to_map(row: &PgRow) -> Row {
    let mut map = Row::new();
    for (i, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), cell_to_value(row, i, col.type_info().name()));
    }
    map
}

fn get<'r, T>(row: &'r PgRow, i: usize) -> Option<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(i).ok().flatten()
}

fn float(n: Option<f64>) -> Value {
    n.and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Decode one cell by its PostgreSQL type name. Unknown types fall back to text.
fn cell_to_value(row: &PgRow, i: usize, type_name: &str) -> Value {
    let v = match type_name {
        "INT2" => get::<i16>(row, i).map(Value::from),
        "INT4" => get::<i32>(row, i).map(Value::from),
        "INT8" => get::<i64>(row, i).map(Value::from),
        "FLOAT4" => return float(get::<f32>(row, i).map(f64::from)),
        "FLOAT8" => return float(get::<f64>(row, i)),
        "BOOL" => get::<bool>(row, i).map(Value::Bool),
        "UUID" => get::<uuid::Uuid>(row, i).map(|u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, i).map(|d| Value::String(d.to_rfc3339())),
        "TIMESTAMP" => get::<chrono::NaiveDateTime>(row, i)
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => get::<chrono::NaiveDate>(row, i).map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "JSON" | "JSONB" => get::<Value>(row, i),
        _ => get::<String>(row, i).map(Value::String),
    };
    v.unwrap_or(Value::Null)
}
