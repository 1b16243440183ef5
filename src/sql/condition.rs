//! Query condition: the compiled form of a filter tree.
//!
//! A [`Condition`] renders to a parameterized PostgreSQL `WHERE` fragment and
//! can also be evaluated against a JSON row, which is how the in-memory store
//! executes it.

use super::builder::{quoted, QueryBuf};
use crate::table::TableRef;
use serde_json::{Map, Value};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Always,
    Never,
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// LIKE / ILIKE over a pattern using `%`, `_` and `\` escapes.
    Like {
        column: String,
        pattern: String,
        case_insensitive: bool,
        negated: bool,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// Inclusive range.
    Between {
        column: String,
        low: Value,
        high: Value,
        negated: bool,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Condition::Compare {
            column: column.into(),
            op: CompareOp::Eq,
            value,
        }
    }

    pub fn in_list(column: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::InList {
            column: column.into(),
            values,
            negated: false,
        }
    }

    /// Render into `q`, pushing every value as a bound parameter.
    pub fn render(&self, table: &TableRef, q: &mut QueryBuf) -> String {
        match self {
            Condition::Always => "1 = 1".to_string(),
            Condition::Never => "1 = 0".to_string(),
            Condition::Compare { column, op, value } => {
                let ph = placeholder(table, column, value.clone(), q);
                format!("{} {} {}", quoted(column), op.as_sql(), ph)
            }
            Condition::Like {
                column,
                pattern,
                case_insensitive,
                negated,
            } => {
                let n = q.push_param(Value::String(pattern.clone()));
                let not = if *negated { "NOT " } else { "" };
                let op = if *case_insensitive { "ILIKE" } else { "LIKE" };
                format!("{}::text {}{} ${}", quoted(column), not, op, n)
            }
            Condition::IsNull { column, negated } => {
                let not = if *negated { "NOT " } else { "" };
                format!("{} IS {}NULL", quoted(column), not)
            }
            Condition::InList {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "1 = 1" } else { "1 = 0" }.to_string();
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| placeholder(table, column, v.clone(), q))
                    .collect();
                let not = if *negated { "NOT " } else { "" };
                format!("{} {}IN ({})", quoted(column), not, placeholders.join(", "))
            }
            Condition::Between {
                column,
                low,
                high,
                negated,
            } => {
                let lo = placeholder(table, column, low.clone(), q);
                let hi = placeholder(table, column, high.clone(), q);
                let not = if *negated { "NOT " } else { "" };
                format!("{} {}BETWEEN {} AND {}", quoted(column), not, lo, hi)
            }
            Condition::And(children) => join(children, " AND ", "1 = 1", table, q),
            Condition::Or(children) => join(children, " OR ", "1 = 0", table, q),
            Condition::Not(inner) => format!("NOT ({})", inner.render(table, q)),
        }
    }

    /// Whether `row` satisfies the condition, the way a WHERE clause filters:
    /// only a definite true keeps the row.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.eval(row) == Some(true)
    }

    /// Three-valued evaluation. Missing columns read as NULL, and `None` is SQL
    /// UNKNOWN: a comparison with NULL yields it and NOT keeps it unknown.
    pub fn eval(&self, row: &Map<String, Value>) -> Option<bool> {
        match self {
            Condition::Always => Some(true),
            Condition::Never => Some(false),
            Condition::Compare { column, op, value } => {
                let ord = compare_values(cell(row, column), value)?;
                Some(match op {
                    CompareOp::Eq => ord == Ordering::Equal,
                    CompareOp::Ne => ord != Ordering::Equal,
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Ge => ord != Ordering::Less,
                    CompareOp::Lt => ord == Ordering::Less,
                    CompareOp::Le => ord != Ordering::Greater,
                })
            }
            Condition::Like {
                column,
                pattern,
                case_insensitive,
                negated,
            } => value_text(cell(row, column)).map(|text| like_match(&text, pattern, *case_insensitive) != *negated),
            Condition::IsNull { column, negated } => Some(cell(row, column).is_null() != *negated),
            Condition::InList {
                column,
                values,
                negated,
            } => {
                // An empty list renders as a constant, so NULL does not matter there.
                if values.is_empty() {
                    return Some(*negated);
                }
                let v = cell(row, column);
                if v.is_null() {
                    return None;
                }
                if values
                    .iter()
                    .any(|candidate| compare_values(v, candidate) == Some(Ordering::Equal))
                {
                    return Some(!*negated);
                }
                if values.iter().any(Value::is_null) {
                    return None;
                }
                Some(*negated)
            }
            Condition::Between {
                column,
                low,
                high,
                negated,
            } => {
                let v = cell(row, column);
                let lo = compare_values(v, low)?;
                let hi = compare_values(v, high)?;
                let inside = lo != Ordering::Less && hi != Ordering::Greater;
                Some(inside != *negated)
            }
            Condition::And(children) => {
                let mut result = Some(true);
                for child in children {
                    match child.eval(row) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Condition::Or(children) => {
                let mut result = Some(false);
                for child in children {
                    match child.eval(row) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Condition::Not(inner) => inner.eval(row).map(|b| !b),
        }
    }
}

fn join(children: &[Condition], sep: &str, empty: &str, table: &TableRef, q: &mut QueryBuf) -> String {
    if children.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = children.iter().map(|c| c.render(table, q)).collect();
    format!("({})", parts.join(sep))
}

/// `$n` with a cast to the column type when the column is known.
fn placeholder(table: &TableRef, column: &str, value: Value, q: &mut QueryBuf) -> String {
    let n = q.push_param(value);
    match table.column(column) {
        Some(c) => format!("${}::{}", n, c.pg_type),
        None => format!("${}", n),
    }
}

fn cell<'a>(row: &'a Map<String, Value>, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

/// Text form of a value for pattern matching; NULL has none.
pub(crate) fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// SQL-like ordering between two JSON values. `None` when either side is NULL or
/// the types are not comparable. Numeric strings compare with numbers.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::String(s)) => x.as_f64()?.partial_cmp(&s.parse::<f64>().ok()?),
        (Value::String(s), Value::Number(y)) => s.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

/// LIKE matching with `%` (any run), `_` (one char) and `\` escaping the next char.
pub(crate) fn like_match(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let (text, pattern) = if case_insensitive {
        (text.to_lowercase(), pattern.to_lowercase())
    } else {
        (text.to_string(), pattern.to_string())
    };
    let t: Vec<char> = text.chars().collect();

    enum Tok {
        Lit(char),
        One,
        Any,
    }
    let mut toks = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => toks.push(Tok::Lit(chars.next().unwrap_or('\\'))),
            '%' => toks.push(Tok::Any),
            '_' => toks.push(Tok::One),
            other => toks.push(Tok::Lit(other)),
        }
    }

    // dp[j]: pattern prefix of length i matches text prefix of length j
    let mut dp = vec![false; t.len() + 1];
    dp[0] = true;
    for tok in &toks {
        let mut next = vec![false; t.len() + 1];
        match tok {
            Tok::Any => {
                let mut seen = false;
                for j in 0..=t.len() {
                    seen |= dp[j];
                    next[j] = seen;
                }
            }
            Tok::One => {
                for j in 1..=t.len() {
                    next[j] = dp[j - 1];
                }
            }
            Tok::Lit(c) => {
                for j in 1..=t.len() {
                    next[j] = dp[j - 1] && t[j - 1] == *c;
                }
            }
        }
        dp = next;
    }
    dp[t.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use serde_json::json;

    static COLUMNS: &[Column] = &[Column::new("id", "int8"), Column::new("name", "text")];

    fn table() -> TableRef {
        TableRef {
            schema: None,
            name: "users",
            primary_key: "id",
            columns: COLUMNS,
        }
    }

    fn row(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn like_handles_wildcards_and_escapes() {
        assert!(like_match("John", "%oh%", false));
        assert!(like_match("John", "j%", true));
        assert!(!like_match("John", "j%", false));
        assert!(like_match("a_b", "a\\_b", false));
        assert!(!like_match("axb", "a\\_b", false));
        assert!(like_match("axb", "a_b", false));
        assert!(like_match("", "%", false));
    }

    #[test]
    fn render_binds_values_with_casts() {
        let cond = Condition::Or(vec![
            Condition::eq("id", json!(1)),
            Condition::Like {
                column: "name".into(),
                pattern: "%jo%".into(),
                case_insensitive: true,
                negated: false,
            },
        ]);
        let mut q = QueryBuf::new();
        let sql = cond.render(&table(), &mut q);
        assert_eq!(sql, "(\"id\" = $1::int8 OR \"name\"::text ILIKE $2)");
        assert_eq!(q.params, vec![json!(1), json!("%jo%")]);
    }

    #[test]
    fn empty_in_list_is_constant() {
        let mut q = QueryBuf::new();
        assert_eq!(Condition::in_list("id", vec![]).render(&table(), &mut q), "1 = 0");
        assert!(q.params.is_empty());
        assert!(!Condition::in_list("id", vec![]).matches(&row(json!({"id": 1}))));
    }

    #[test]
    fn null_comparisons_do_not_match() {
        let r = row(json!({"id": 1, "name": null}));
        assert!(!Condition::eq("name", json!("x")).matches(&r));
        assert!(Condition::IsNull {
            column: "email".into(),
            negated: false
        }
        .matches(&r));
    }

    #[test]
    fn not_over_null_stays_unknown() {
        let r = row(json!({"id": 1, "email": null}));
        let not_eq = Condition::Not(Box::new(Condition::eq("email", json!("jo@x.com"))));
        assert_eq!(not_eq.eval(&r), None);
        assert!(!not_eq.matches(&r));

        let or_true = Condition::Or(vec![Condition::eq("email", json!("x")), Condition::eq("id", json!(1))]);
        assert_eq!(or_true.eval(&r), Some(true));
        let and_false = Condition::And(vec![Condition::eq("email", json!("x")), Condition::eq("id", json!(2))]);
        assert_eq!(and_false.eval(&r), Some(false));
        assert!(Condition::Not(Box::new(and_false)).matches(&r));

        let not_in = Condition::InList {
            column: "email".into(),
            values: vec![json!("a")],
            negated: true,
        };
        assert_eq!(not_in.eval(&r), None);
    }

    #[test]
    fn between_is_inclusive() {
        let cond = Condition::Between {
            column: "id".into(),
            low: json!(1),
            high: json!(3),
            negated: false,
        };
        assert!(cond.matches(&row(json!({"id": 1}))));
        assert!(cond.matches(&row(json!({"id": 3}))));
        assert!(!cond.matches(&row(json!({"id": 4}))));
    }
}
