//! Filter tree wire types (JSON shape accepted from clients).

use crate::error::InvalidFilterError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[serde(alias = "AND")]
    And,
    #[serde(alias = "OR")]
    Or,
}

/// Closed operator set. Wire tags follow the symbolic form with word aliases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=", alias = "equals", alias = "eq")]
    Equals,
    #[serde(rename = "!=", alias = "not_equals", alias = "ne")]
    NotEquals,
    #[serde(rename = ">", alias = "greater", alias = "gt")]
    Greater,
    #[serde(rename = ">=", alias = "greater_equals", alias = "gte")]
    GreaterEquals,
    #[serde(rename = "<", alias = "less", alias = "lt")]
    Less,
    #[serde(rename = "<=", alias = "less_equals", alias = "lte")]
    LessEquals,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "not_contains")]
    NotContains,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "ends_with")]
    EndsWith,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "is_null")]
    IsNull,
    #[serde(rename = "is_not_null")]
    IsNotNull,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "not_between")]
    NotBetween,
}

impl Operator {
    pub const ALL: [Operator; 18] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Greater,
        Operator::GreaterEquals,
        Operator::Less,
        Operator::LessEquals,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::Like,
        Operator::ILike,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
        Operator::NotBetween,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::Greater => ">",
            Operator::GreaterEquals => ">=",
            Operator::Less => "<",
            Operator::LessEquals => "<=",
            Operator::Contains => "contains",
            Operator::NotContains => "not_contains",
            Operator::StartsWith => "starts_with",
            Operator::EndsWith => "ends_with",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Between => "between",
            Operator::NotBetween => "not_between",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub field: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FilterRule {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        FilterRule {
            field: field.into(),
            operator,
            value: Some(value),
        }
    }

    /// A rule whose operator takes no value (`is_null`, `is_not_null`).
    pub fn unary(field: impl Into<String>, operator: Operator) -> Self {
        FilterRule {
            field: field.into(),
            operator,
            value: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterRuleGroup {
    pub combinator: Combinator,
    #[serde(default, alias = "not")]
    pub negate: bool,
    #[serde(default)]
    pub rules: Vec<FilterNode>,
}

/// A child of a group. Anything carrying `rules` is a group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Group(FilterRuleGroup),
    Rule(FilterRule),
}

impl FilterRuleGroup {
    pub fn and(rules: Vec<FilterNode>) -> Self {
        FilterRuleGroup {
            combinator: Combinator::And,
            negate: false,
            rules,
        }
    }

    pub fn or(rules: Vec<FilterNode>) -> Self {
        FilterRuleGroup {
            combinator: Combinator::Or,
            negate: false,
            rules,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Parse the JSON wire form. Unknown operators and malformed shapes are filter errors.
    pub fn from_json(s: &str) -> Result<Self, InvalidFilterError> {
        serde_json::from_str(s).map_err(|e| InvalidFilterError::Malformed(e.to_string()))
    }
}

impl From<FilterRule> for FilterNode {
    fn from(rule: FilterRule) -> Self {
        FilterNode::Rule(rule)
    }
}

impl From<FilterRuleGroup> for FilterNode {
    fn from(group: FilterRuleGroup) -> Self {
        FilterNode::Group(group)
    }
}
