use serde::Deserialize;

use crate::schema::PropertySchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,

    Inq,
    Nin,
    Between,

    Like,
    NLike,
    ILike,
    NILike,
}

impl FilterOp {
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "eq" => FilterOp::Eq,
            "neq" => FilterOp::Neq,
            "gt" => FilterOp::Gt,
            "gte" => FilterOp::Gte,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "inq" => FilterOp::Inq,
            "nin" => FilterOp::Nin,
            "between" => FilterOp::Between,
            "like" => FilterOp::Like,
            "nlike" => FilterOp::NLike,
            "ilike" => FilterOp::ILike,
            "nilike" => FilterOp::NILike,
            _ => return None,
        })
    }
}

/// Raw filter as sent in the `filter` query parameter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterData {
    #[serde(rename = "where")]
    pub where_clause: Option<serde_json::Value>,
    pub fields: Option<serde_json::Value>,
    pub order: Option<serde_json::Value>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub skip: Option<i64>,
    pub include: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub property: &'static PropertySchema,
    pub operator: FilterOp,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub property: &'static PropertySchema,
    pub sort: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSelection {
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<serde_json::Value>,
}
