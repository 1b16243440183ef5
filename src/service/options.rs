//! Client-supplied find options and their query-string form.

use crate::error::AppError;
use crate::filter::FilterRuleGroup;
use crate::sql::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_LIMIT: u64 = 10;
pub const DEFAULT_OFFSET: u64 = 0;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOptions {
    #[serde(default, alias = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterRuleGroup>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default, alias = "order_by")]
    pub order_by: Vec<OrderByInput>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderByInput {
    #[serde(alias = "fieldName", alias = "column")]
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderByInput {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        OrderByInput {
            field: field.into(),
            direction,
        }
    }
}

impl FindOptions {
    pub fn with_filter(mut self, filter: FilterRuleGroup) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderByInput::new(field, direction));
        self
    }

    /// Parse the flat query-string form.
    ///
    /// `filter` (or `where`) is a JSON filter tree. `orderBy` is either a JSON
    /// array of `{field, direction}` or the shorthand `name:asc,age:desc`.
    /// Unknown keys are ignored.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let filter = match params.get("filter").or_else(|| params.get("where")) {
            Some(raw) if !raw.trim().is_empty() => Some(FilterRuleGroup::from_json(raw)?),
            _ => None,
        };
        let order_by = match params.get("orderBy").or_else(|| params.get("order_by")) {
            Some(raw) => parse_order_by(raw)?,
            None => Vec::new(),
        };
        Ok(FindOptions {
            filter,
            limit: parse_count(params, "limit")?,
            offset: parse_count(params, "offset")?,
            order_by,
        })
    }
}

/// Non-negative and within the store's BIGINT range.
fn parse_count(params: &HashMap<String, String>, key: &str) -> Result<Option<u64>, AppError> {
    params
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n <= i64::MAX as u64)
                .ok_or_else(|| {
                    AppError::BadRequest(format!("{} must be an integer between 0 and {}, got '{}'", key, i64::MAX, raw))
                })
        })
        .transpose()
}

fn parse_order_by(raw: &str) -> Result<Vec<OrderByInput>, AppError> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return serde_json::from_str(raw).map_err(|e| AppError::BadRequest(format!("invalid orderBy: {}", e)));
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| {
            let (field, dir) = item.split_once(':').unwrap_or((item, "asc"));
            let direction = match dir.trim().to_ascii_lowercase().as_str() {
                "asc" => Direction::Asc,
                "desc" => Direction::Desc,
                other => {
                    return Err(AppError::BadRequest(format!(
                        "invalid order direction '{}' for {}",
                        other, field
                    )))
                }
            };
            Ok(OrderByInput::new(field.trim(), direction))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidFilterError;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn empty_query_has_no_options() {
        assert_eq!(FindOptions::from_query(&HashMap::new()).unwrap(), FindOptions::default());
    }

    #[test]
    fn parses_filter_paging_and_shorthand_order() {
        let opts = FindOptions::from_query(&params(&[
            ("where", r#"{"combinator":"and","rules":[{"field":"name","operator":"=","value":"John"}]}"#),
            ("limit", "5"),
            ("offset", "10"),
            ("orderBy", "name:desc, age"),
        ]))
        .unwrap();
        assert_eq!(opts.filter.map(|f| f.rules.len()), Some(1));
        assert_eq!(opts.limit, Some(5));
        assert_eq!(opts.offset, Some(10));
        assert_eq!(
            opts.order_by,
            vec![
                OrderByInput::new("name", Direction::Desc),
                OrderByInput::new("age", Direction::Asc)
            ]
        );
    }

    #[test]
    fn json_order_by_accepts_field_name_alias() {
        let opts =
            FindOptions::from_query(&params(&[("orderBy", r#"[{"fieldName":"email","direction":"DESC"}]"#)])).unwrap();
        assert_eq!(opts.order_by, vec![OrderByInput::new("email", Direction::Desc)]);
    }

    #[test]
    fn bad_input_is_rejected() {
        assert!(matches!(
            FindOptions::from_query(&params(&[("limit", "-1")])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            FindOptions::from_query(&params(&[("offset", "9223372036854775808")])),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            FindOptions::from_query(&params(&[("limit", "9223372036854775807")])).unwrap().limit,
            Some(i64::MAX as u64)
        );
        assert!(matches!(
            FindOptions::from_query(&params(&[("orderBy", "name:sideways")])),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            FindOptions::from_query(&params(&[("filter", "{not json")])),
            Err(AppError::InvalidFilter(InvalidFilterError::Malformed(_)))
        ));
    }
}
