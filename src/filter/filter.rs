use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FieldSelection, FilterData, FilterOrderInfo, SqlResult};
use crate::schema::ModelSchema;

/// A parsed query filter: `where`, `fields`, `order`, `limit` and `offset`/`skip`
#[derive(Debug, Clone)]
pub struct Filter {
    schema: &'static ModelSchema,
    where_clause: Option<FilterWhere>,
    order_data: Vec<FilterOrderInfo>,
    fields: Option<(FieldSelection, Vec<&'static str>)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(schema: &'static ModelSchema) -> Self {
        Self {
            schema,
            where_clause: None,
            order_data: vec![],
            fields: None,
            limit: None,
            offset: None,
        }
    }

    /// Parse the raw `filter` query parameter; a missing parameter is an empty filter
    pub fn parse(schema: &'static ModelSchema, raw: Option<&str>) -> Result<Self, FilterError> {
        let mut filter = Self::new(schema);
        if let Some(data) = Self::decode(raw)? {
            filter.assign(data)?;
        }
        Ok(filter)
    }

    /// Same as `parse`, for routes that address a single entity
    pub fn parse_excluding_where(schema: &'static ModelSchema, raw: Option<&str>) -> Result<Self, FilterError> {
        let mut filter = Self::new(schema);
        if let Some(data) = Self::decode(raw)? {
            if data.where_clause.is_some() {
                return Err(FilterError::WhereNotAllowed);
            }
            filter.assign(data)?;
        }
        Ok(filter)
    }

    /// Parse the raw `where` query parameter used by count and bulk update
    pub fn parse_where(schema: &'static ModelSchema, raw: Option<&str>) -> Result<Option<FilterWhere>, FilterError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => {
                let value: Value = serde_json::from_str(raw)?;
                let parsed = FilterWhere::parse(&value, schema)?;
                Ok((!parsed.is_empty()).then_some(parsed))
            }
        }
    }

    fn decode(raw: Option<&str>) -> Result<Option<FilterData>, FilterError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => {
                let value: Value = serde_json::from_str(raw)?;
                if !value.is_object() {
                    return Err(FilterError::InvalidFilter("filter must be a JSON object".to_string()));
                }
                Ok(Some(serde_json::from_value(value)?))
            }
        }
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(include) = data.include {
            self.include(include)?;
        }
        if let Some(where_data) = data.where_clause {
            self.where_clause(where_data)?;
        }
        if let Some(fields) = data.fields {
            self.fields(fields)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if let Some(limit) = data.limit {
            self.limit(limit)?;
        }
        if let Some(offset) = data.offset.or(data.skip) {
            self.offset(offset)?;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        let parsed = FilterWhere::parse(&conditions, self.schema)?;
        self.where_clause = (!parsed.is_empty()).then_some(parsed);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec, self.schema)?;
        Ok(self)
    }

    /// `["title", "status"]` includes only those properties. `{"title": true}`
    /// does the same, while `{"content": false}` excludes.
    pub fn fields(&mut self, spec: Value) -> Result<&mut Self, FilterError> {
        let known = |name: &str| {
            self.schema
                .property(name)
                .map(|p| p.name)
                .ok_or_else(|| FilterError::InvalidFields(format!("unknown property {}", name)))
        };

        self.fields = match spec {
            Value::Null => None,
            Value::Array(names) => {
                let mut include = Vec::with_capacity(names.len());
                for name in &names {
                    let name = name
                        .as_str()
                        .ok_or_else(|| FilterError::InvalidFields("field names must be strings".to_string()))?;
                    include.push(known(name)?);
                }
                (!include.is_empty()).then_some((FieldSelection::Include, include))
            }
            Value::Object(flags) => {
                let mut included = Vec::new();
                let mut excluded = Vec::new();
                for (name, flag) in &flags {
                    let flag = flag
                        .as_bool()
                        .ok_or_else(|| FilterError::InvalidFields(format!("{} must be true or false", name)))?;
                    let name = known(name)?;
                    if flag {
                        included.push(name);
                    } else {
                        excluded.push(name);
                    }
                }
                if !included.is_empty() {
                    Some((FieldSelection::Include, included))
                } else if !excluded.is_empty() {
                    Some((FieldSelection::Exclude, excluded))
                } else {
                    None
                }
            }
            _ => return Err(FilterError::InvalidFields("fields must be an array or an object".to_string())),
        };
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.filter.max_limit.unwrap_or(i64::MAX);
        let applied_limit = if limit > max_limit {
            if crate::config::CONFIG.filter.debug_logging {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            }
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        Ok(self)
    }

    pub fn offset(&mut self, offset: i64) -> Result<&mut Self, FilterError> {
        if offset < 0 {
            return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
        }
        self.offset = Some(offset);
        Ok(self)
    }

    /// Relations are not modelled, so any requested inclusion is rejected
    pub fn include(&mut self, include: Value) -> Result<&mut Self, FilterError> {
        let relation = match &include {
            Value::Null => return Ok(self),
            Value::Array(items) if items.is_empty() => return Ok(self),
            Value::String(name) => name.clone(),
            Value::Array(items) => match &items[0] {
                Value::String(name) => name.clone(),
                Value::Object(obj) => obj.get("relation").and_then(Value::as_str).unwrap_or_default().to_string(),
                other => other.to_string(),
            },
            Value::Object(obj) => obj.get("relation").and_then(Value::as_str).unwrap_or_default().to_string(),
            other => other.to_string(),
        };
        Err(FilterError::UnknownRelation(relation))
    }

    pub fn to_sql(&self, table: &str) -> SqlResult {
        let (where_clause, params) = match &self.where_clause {
            Some(where_data) => {
                let result = where_data.to_sql(0);
                (format!("WHERE {}", result.query), result.params)
            }
            None => (String::new(), vec![]),
        };
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", table),
            where_clause,
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }

    /// Filter, order and page rows held in memory. Each row is paired with
    /// its JSON form, which the where and order clauses are evaluated against.
    pub fn apply<T>(&self, rows: Vec<(T, Value)>) -> Vec<T> {
        let mut matched: Vec<(T, Value)> = rows
            .into_iter()
            .filter(|(_, json)| self.where_clause.as_ref().map_or(true, |w| w.matches(json)))
            .collect();

        if !self.order_data.is_empty() {
            matched.sort_by(|(_, a), (_, b)| FilterOrder::compare(&self.order_data, a, b));
        }

        let offset = self.offset.unwrap_or(0) as usize;
        let limit = self.limit.map_or(usize::MAX, |l| l as usize);
        matched.into_iter().skip(offset).take(limit).map(|(row, _)| row).collect()
    }

    /// Apply the `fields` selection to one serialized entity
    pub fn project(&self, record: Value) -> Value {
        let Some((selection, names)) = &self.fields else {
            return record;
        };
        let Value::Object(obj) = record else {
            return record;
        };
        let projected: Map<String, Value> = obj
            .into_iter()
            .filter(|(key, _)| {
                let listed = names.contains(&key.as_str());
                match selection {
                    FieldSelection::Include => listed,
                    FieldSelection::Exclude => !listed,
                }
            })
            .collect();
        Value::Object(projected)
    }
}
