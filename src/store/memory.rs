//! In-memory client: executes statements against JSON rows held in a mutex.
//!
//! Used as the test double for the execution port. It records the kind of
//! every statement it receives so tests can assert how many writes a call
//! issued, and can be told to fail the next statement.

use super::Client;
use crate::error::StoreError;
use crate::sql::{compare_values, Direction, OrderBy, Row, Statement, StatementKind};
use crate::table::TableRef;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Vec<Row>>,
    statements: Vec<StatementKind>,
    fail_next: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryClient {
    state: Arc<Mutex<State>>,
}

fn table_key(table: &TableRef) -> String {
    match table.schema {
        Some(schema) => format!("{}.{}", schema, table.name),
        None => table.name.to_string(),
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        MemoryClient::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append rows as-is, bypassing id assignment and the statement log.
    pub fn seed(&self, table: &TableRef, rows: impl IntoIterator<Item = Value>) {
        let mut state = self.lock();
        let stored = state.tables.entry(table_key(table)).or_default();
        stored.extend(rows.into_iter().filter_map(|v| match v {
            Value::Object(m) => Some(m),
            _ => None,
        }));
    }

    pub fn rows(&self, table: &TableRef) -> Vec<Row> {
        self.lock().tables.get(&table_key(table)).cloned().unwrap_or_default()
    }

    /// Kinds of all statements received so far, in order.
    pub fn statements(&self) -> Vec<StatementKind> {
        self.lock().statements.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().statements.iter().filter(|k| k.is_write()).count()
    }

    /// Make the next statement fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }
}

#[async_trait]
impl Client for MemoryClient {
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Other("memory store lock poisoned".into()))?;
        state.statements.push(statement.kind());
        if let Some(message) = state.fail_next.take() {
            return Err(StoreError::Other(message));
        }
        let key = table_key(statement.table());
        match statement {
            Statement::Select {
                table,
                condition,
                order_by,
                limit,
                offset,
            } => {
                let stored = state.tables.get(&key).map(Vec::as_slice).unwrap_or(&[]);
                let mut out: Vec<Row> = stored
                    .iter()
                    .filter(|r| condition.as_ref().map_or(true, |c| c.matches(r)))
                    .cloned()
                    .collect();
                sort_rows(&mut out, order_by);
                let offset = offset.unwrap_or(0) as usize;
                let limit = limit.map_or(usize::MAX, |n| n as usize);
                Ok(out
                    .into_iter()
                    .skip(offset)
                    .take(limit)
                    .map(|r| project(table, r))
                    .collect())
            }
            Statement::Count { condition, .. } => {
                let n = state
                    .tables
                    .get(&key)
                    .map(|rows| {
                        rows.iter()
                            .filter(|r| condition.as_ref().map_or(true, |c| c.matches(r)))
                            .count()
                    })
                    .unwrap_or(0);
                let mut row = Row::new();
                row.insert("count".into(), Value::from(n as u64));
                Ok(vec![row])
            }
            Statement::Insert { table, rows } => {
                let stored = state.tables.entry(key).or_default();
                let mut inserted: Vec<Row> = Vec::with_capacity(rows.len());
                for input in rows {
                    let mut row = project(table, input.clone());
                    let pk = table.primary_key;
                    if row.get(pk).map_or(true, Value::is_null) {
                        row.insert(pk.to_string(), next_id(table, stored, &inserted));
                    }
                    for c in table.columns {
                        if c.has_default && c.pg_type.contains("timestamp") && row.get(c.name).map_or(true, Value::is_null) {
                            row.insert(c.name.to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
                        }
                    }
                    let id = row.get(pk).cloned().unwrap_or(Value::Null);
                    if stored.iter().chain(inserted.iter()).any(|r| r.get(pk) == Some(&id)) {
                        return Err(StoreError::Other(format!(
                            "duplicate key value violates unique constraint on {}.{}",
                            table.name, pk
                        )));
                    }
                    inserted.push(row);
                }
                stored.extend(inserted.iter().cloned());
                Ok(inserted)
            }
            Statement::Update {
                table,
                condition,
                values,
            } => {
                let Some(stored) = state.tables.get_mut(&key) else {
                    return Ok(Vec::new());
                };
                let mut out = Vec::new();
                for row in stored.iter_mut().filter(|r| condition.matches(r)) {
                    for c in table.columns {
                        if c.name == table.primary_key {
                            continue;
                        }
                        if let Some(v) = values.get(c.name) {
                            row.insert(c.name.to_string(), v.clone());
                        }
                    }
                    out.push(row.clone());
                }
                Ok(out)
            }
            Statement::Delete { condition, .. } => {
                if let Some(stored) = state.tables.get_mut(&key) {
                    stored.retain(|r| !condition.matches(r));
                }
                Ok(Vec::new())
            }
        }
    }
}

/// Keep only the table's columns, filling absent ones with NULL.
fn project(table: &TableRef, mut row: Row) -> Row {
    let mut out = Row::new();
    for c in table.columns {
        out.insert(c.name.to_string(), row.remove(c.name).unwrap_or(Value::Null));
    }
    out
}

fn next_id(table: &TableRef, stored: &[Row], pending: &[Row]) -> Value {
    let integer = table.primary_key_column().map_or(false, |c| c.is_integer());
    if !integer {
        return Value::String(uuid::Uuid::new_v4().to_string());
    }
    let max = stored
        .iter()
        .chain(pending)
        .filter_map(|r| r.get(table.primary_key).and_then(Value::as_i64))
        .max()
        .unwrap_or(0);
    Value::from(max + 1)
}

/// Stable sort; NULLs sort last ascending and first descending.
fn sort_rows(rows: &mut [Row], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for o in order_by {
            let x = a.get(o.column).unwrap_or(&Value::Null);
            let y = b.get(o.column).unwrap_or(&Value::Null);
            let ord = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => compare_values(x, y).unwrap_or(Ordering::Equal),
            };
            let ord = match o.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}
