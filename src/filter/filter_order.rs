use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter_where::compare_values;
use super::types::{FilterOrderInfo, SortDirection};
use crate::schema::ModelSchema;

pub struct FilterOrder;

impl FilterOrder {
    /// Accepts `"title DESC"`, `"title DESC, status"` or `["title DESC", "status"]`
    pub fn validate_and_parse(order: &Value, schema: &'static ModelSchema) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::Null => Ok(vec![]),
            Value::String(s) => Self::parse_order_string(s, schema),
            Value::Array(arr) => {
                let mut out = Vec::new();
                for v in arr {
                    let s = v
                        .as_str()
                        .ok_or_else(|| FilterError::InvalidOrder("order entries must be strings".to_string()))?;
                    out.extend(Self::parse_order_string(s, schema)?);
                }
                Ok(out)
            }
            _ => Err(FilterError::InvalidOrder("order must be a string or an array of strings".to_string())),
        }
    }

    fn parse_order_string(s: &str, schema: &'static ModelSchema) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            let Some(col) = it.next() else { continue };
            let property = schema
                .property(col)
                .ok_or_else(|| FilterError::InvalidOrder(format!("unknown property {}", col)))?;
            let sort = match it.next() {
                None => SortDirection::Asc,
                Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                Some(dir) => return Err(FilterError::InvalidOrder(format!("invalid direction {} for {}", dir, col))),
            };
            if it.next().is_some() {
                return Err(FilterError::InvalidOrder(format!("invalid order clause {}", trimmed)));
            }
            out.push(FilterOrderInfo { property, sort });
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.property.name, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// In-memory equivalent of `generate`. NULLs sort last ascending and
    /// first descending, as PostgreSQL does.
    pub fn compare(infos: &[FilterOrderInfo], a: &Value, b: &Value) -> Ordering {
        for info in infos {
            let left = a.get(info.property.name).filter(|v| !v.is_null());
            let right = b.get(info.property.name).filter(|v| !v.is_null());
            let ordering = match (left, right) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(l), Some(r)) => compare_values(info.property.property_type, l, r).unwrap_or(Ordering::Equal),
            };
            let ordering = match info.sort {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::journal::JOURNAL_SCHEMA;
    use serde_json::json;

    #[test]
    fn parses_strings_and_arrays() {
        let order = FilterOrder::validate_and_parse(&json!("title DESC, status"), &JOURNAL_SCHEMA).unwrap();
        assert_eq!(FilterOrder::generate(&order), "ORDER BY \"title\" DESC, \"status\" ASC");

        let order = FilterOrder::validate_and_parse(&json!(["status desc", "title"]), &JOURNAL_SCHEMA).unwrap();
        assert_eq!(FilterOrder::generate(&order), "ORDER BY \"status\" DESC, \"title\" ASC");

        assert_eq!(FilterOrder::generate(&[]), "");
    }

    #[test]
    fn rejects_unknown_columns_and_directions() {
        assert!(FilterOrder::validate_and_parse(&json!("owner"), &JOURNAL_SCHEMA).is_err());
        assert!(FilterOrder::validate_and_parse(&json!("title sideways"), &JOURNAL_SCHEMA).is_err());
        assert!(FilterOrder::validate_and_parse(&json!({ "title": "desc" }), &JOURNAL_SCHEMA).is_err());
        assert!(FilterOrder::validate_and_parse(&json!([1]), &JOURNAL_SCHEMA).is_err());
    }

    #[test]
    fn compare_places_nulls_like_postgres() {
        let asc = FilterOrder::validate_and_parse(&json!("content"), &JOURNAL_SCHEMA).unwrap();
        let desc = FilterOrder::validate_and_parse(&json!("content DESC"), &JOURNAL_SCHEMA).unwrap();
        let with = json!({ "content": "a" });
        let without = json!({});

        assert_eq!(FilterOrder::compare(&asc, &with, &without), Ordering::Less);
        assert_eq!(FilterOrder::compare(&desc, &with, &without), Ordering::Greater);
    }
}
