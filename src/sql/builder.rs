//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from a typed statement.

use super::condition::Condition;
use crate::table::TableRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object row, as read from or written to the store.
pub type Row = Map<String, Value>;

/// Quote identifier for PostgreSQL.
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(table: &TableRef) -> String {
    match table.schema {
        Some(schema) => format!("{}.{}", quoted(schema), quoted(table.name)),
        None => quoted(table.name),
    }
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    pub fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    pub(crate) fn push_param(&mut self, v: Value) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Count,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn is_write(&self) -> bool {
        matches!(self, StatementKind::Insert | StatementKind::Update | StatementKind::Delete)
    }
}

/// Store-neutral description of one query.
#[derive(Clone, Debug)]
pub enum Statement {
    /// Filter, then order, then offset, then limit.
    Select {
        table: TableRef,
        condition: Option<Condition>,
        order_by: Vec<OrderBy>,
        limit: Option<u64>,
        offset: Option<u64>,
    },
    /// Returns a single row `{"count": n}`.
    Count {
        table: TableRef,
        condition: Option<Condition>,
    },
    /// Returns the inserted rows, store defaults included.
    Insert { table: TableRef, rows: Vec<Row> },
    /// Returns the updated rows.
    Update {
        table: TableRef,
        condition: Condition,
        values: Row,
    },
    Delete { table: TableRef, condition: Condition },
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select { .. } => StatementKind::Select,
            Statement::Count { .. } => StatementKind::Count,
            Statement::Insert { .. } => StatementKind::Insert,
            Statement::Update { .. } => StatementKind::Update,
            Statement::Delete { .. } => StatementKind::Delete,
        }
    }

    pub fn table(&self) -> &TableRef {
        match self {
            Statement::Select { table, .. }
            | Statement::Count { table, .. }
            | Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => table,
        }
    }

    /// Render to PostgreSQL. Identifiers come from the table definition or the
    /// validated filter; every value is a parameter.
    pub fn to_query(&self) -> QueryBuf {
        let mut q = QueryBuf::new();
        q.sql = match self {
            Statement::Select {
                table,
                condition,
                order_by,
                limit,
                offset,
            } => {
                let where_clause = where_clause(table, condition.as_ref(), &mut q);
                let order_clause = if order_by.is_empty() {
                    String::new()
                } else {
                    let parts: Vec<String> = order_by
                        .iter()
                        .map(|o| {
                            let dir = match o.direction {
                                Direction::Asc => "ASC",
                                Direction::Desc => "DESC",
                            };
                            format!("{} {}", quoted(o.column), dir)
                        })
                        .collect();
                    format!(" ORDER BY {}", parts.join(", "))
                };
                let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
                let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
                format!(
                    "SELECT {} FROM {}{}{}{}{}",
                    select_column_list(table),
                    qualified_table(table),
                    where_clause,
                    order_clause,
                    offset_clause,
                    limit_clause
                )
            }
            Statement::Count { table, condition } => {
                let where_clause = where_clause(table, condition.as_ref(), &mut q);
                format!(
                    "SELECT COUNT(*) AS {} FROM {}{}",
                    quoted("count"),
                    qualified_table(table),
                    where_clause
                )
            }
            Statement::Insert { table, rows } => insert_sql(table, rows, &mut q),
            Statement::Update {
                table,
                condition,
                values,
            } => {
                let mut sets = Vec::new();
                for c in table.columns {
                    if c.name == table.primary_key {
                        continue;
                    }
                    let Some(v) = values.get(c.name) else { continue };
                    let n = q.push_param(v.clone());
                    sets.push(format!("{} = ${}::{}", quoted(c.name), n, c.pg_type));
                }
                let predicate = condition.render(table, &mut q);
                if sets.is_empty() {
                    format!(
                        "SELECT {} FROM {} WHERE {}",
                        select_column_list(table),
                        qualified_table(table),
                        predicate
                    )
                } else {
                    format!(
                        "UPDATE {} SET {} WHERE {} RETURNING {}",
                        qualified_table(table),
                        sets.join(", "),
                        predicate,
                        select_column_list(table)
                    )
                }
            }
            Statement::Delete { table, condition } => {
                let predicate = condition.render(table, &mut q);
                format!("DELETE FROM {} WHERE {}", qualified_table(table), predicate)
            }
        };
        q
    }
}

fn where_clause(table: &TableRef, condition: Option<&Condition>, q: &mut QueryBuf) -> String {
    match condition {
        Some(c) => format!(" WHERE {}", c.render(table, q)),
        None => String::new(),
    }
}

/// SELECT list: each column as-is, except custom enum (schema.typename) and numeric as col::text so the driver returns a string.
fn select_column_list(table: &TableRef) -> String {
    table
        .columns
        .iter()
        .map(|c| {
            let q = quoted(c.name);
            if c.pg_type.contains('.') || c.pg_type == "numeric" {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Multi-row INSERT over the union of known columns present in any row. A row
/// missing a column gets DEFAULT. With no columns at all, every row is
/// `(DEFAULT)` on the primary key.
fn insert_sql(table: &TableRef, rows: &[Row], q: &mut QueryBuf) -> String {
    let cols: Vec<_> = table
        .columns
        .iter()
        .filter(|c| rows.iter().any(|r| r.contains_key(c.name)))
        .collect();
    let target = qualified_table(table);
    let returning = select_column_list(table);
    if cols.is_empty() {
        let tuples = vec!["(DEFAULT)"; rows.len().max(1)].join(", ");
        return format!(
            "INSERT INTO {} ({}) VALUES {} RETURNING {}",
            target,
            quoted(table.primary_key),
            tuples,
            returning
        );
    }
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        let mut placeholders = Vec::with_capacity(cols.len());
        for c in &cols {
            match row.get(c.name) {
                Some(v) => {
                    let n = q.push_param(v.clone());
                    placeholders.push(format!("${}::{}", n, c.pg_type));
                }
                None => placeholders.push("DEFAULT".to_string()),
            }
        }
        tuples.push(format!("({})", placeholders.join(", ")));
    }
    format!(
        "INSERT INTO {} ({}) VALUES {} RETURNING {}",
        target,
        cols.iter().map(|c| quoted(c.name)).collect::<Vec<_>>().join(", "),
        tuples.join(", "),
        returning
    )
}
