//! Recursive filter compiler: `FilterRuleGroup -> Condition`.

use super::types::{Combinator, FilterNode, FilterRule, FilterRuleGroup, Operator};
use crate::error::InvalidFilterError;
use crate::sql::{value_text, CompareOp, Condition};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("static identifier pattern"))
}

/// Compile a filter tree. Pure: no I/O, identical trees give identical conditions.
///
/// An empty group (at any level) compiles to [`Condition::Always`], whether or
/// not it is negated.
pub fn compile(group: &FilterRuleGroup) -> Result<Condition, InvalidFilterError> {
    if group.rules.is_empty() {
        return Ok(Condition::Always);
    }
    let mut children = Vec::with_capacity(group.rules.len());
    for node in &group.rules {
        children.push(match node {
            FilterNode::Group(g) => compile(g)?,
            FilterNode::Rule(r) => compile_rule(r)?,
        });
    }
    let combined = if children.len() == 1 {
        children.remove(0)
    } else {
        match group.combinator {
            Combinator::And => Condition::And(children),
            Combinator::Or => Condition::Or(children),
        }
    };
    Ok(if group.negate {
        Condition::Not(Box::new(combined))
    } else {
        combined
    })
}

pub fn validate_field(field: &str) -> Result<(), InvalidFilterError> {
    if identifier_re().is_match(field) {
        Ok(())
    } else {
        Err(InvalidFilterError::InvalidField(field.to_string()))
    }
}

fn compile_rule(rule: &FilterRule) -> Result<Condition, InvalidFilterError> {
    validate_field(&rule.field)?;
    let column = rule.field.clone();
    let value = rule.value.clone().unwrap_or(Value::Null);

    Ok(match rule.operator {
        Operator::Equals => compare(column, CompareOp::Eq, value),
        Operator::NotEquals => compare(column, CompareOp::Ne, value),
        Operator::Greater => compare(column, CompareOp::Gt, value),
        Operator::GreaterEquals => compare(column, CompareOp::Ge, value),
        Operator::Less => compare(column, CompareOp::Lt, value),
        Operator::LessEquals => compare(column, CompareOp::Le, value),
        Operator::Contains => like(column, wrap_pattern("%", &value, "%"), true, false),
        Operator::NotContains => like(column, wrap_pattern("%", &value, "%"), true, true),
        Operator::StartsWith => like(column, wrap_pattern("", &value, "%"), true, false),
        Operator::EndsWith => like(column, wrap_pattern("%", &value, ""), true, false),
        Operator::Like => like(column, value_text(&value).unwrap_or_default(), false, false),
        Operator::ILike => like(column, value_text(&value).unwrap_or_default(), true, false),
        Operator::IsNull => Condition::IsNull {
            column,
            negated: false,
        },
        Operator::IsNotNull => Condition::IsNull {
            column,
            negated: true,
        },
        Operator::In | Operator::NotIn => Condition::InList {
            column,
            values: match value {
                Value::Array(items) => items,
                scalar => vec![scalar],
            },
            negated: rule.operator == Operator::NotIn,
        },
        Operator::Between | Operator::NotBetween => {
            let pair: Option<[Value; 2]> = match value {
                Value::Array(items) => items.try_into().ok(),
                _ => None,
            };
            let [low, high] = pair.ok_or_else(|| InvalidFilterError::InvalidRange {
                field: rule.field.clone(),
                operator: rule.operator.as_str(),
            })?;
            Condition::Between {
                column,
                low,
                high,
                negated: rule.operator == Operator::NotBetween,
            }
        }
    })
}

fn compare(column: String, op: CompareOp, value: Value) -> Condition {
    Condition::Compare { column, op, value }
}

/// Substring-style pattern around the literal text of `value`.
fn wrap_pattern(prefix: &str, value: &Value, suffix: &str) -> String {
    let text = value_text(value).unwrap_or_default();
    format!("{}{}{}", prefix, escape_like(&text), suffix)
}

fn like(column: String, pattern: String, case_insensitive: bool, negated: bool) -> Condition {
    Condition::Like {
        column,
        pattern,
        case_insensitive,
        negated,
    }
}

/// Escape LIKE metacharacters so user text matches literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
