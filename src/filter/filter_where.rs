use std::cmp::Ordering;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo, SqlResult};
use crate::schema::{ModelSchema, PropertySchema, PropertyType};

#[derive(Debug, Clone)]
enum WhereNode {
    And(Vec<WhereNode>),
    Or(Vec<WhereNode>),
    Condition(FilterWhereInfo),
}

/// A parsed `where` clause.
///
/// Keys of a where object are property names (implicit equality, or an object
/// of operators) or `and` / `or` holding an array of nested where objects.
/// The same tree renders to parameterised SQL and evaluates against JSON rows.
#[derive(Debug, Clone)]
pub struct FilterWhere {
    root: WhereNode,
}

impl FilterWhere {
    pub fn parse(where_data: &Value, schema: &'static ModelSchema) -> Result<Self, FilterError> {
        let root = match where_data {
            Value::Null => WhereNode::And(vec![]),
            Value::Object(obj) => Self::parse_object(obj, schema)?,
            _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        };
        Ok(Self { root })
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.root, WhereNode::And(children) if children.is_empty())
    }

    fn parse_object(obj: &Map<String, Value>, schema: &'static ModelSchema) -> Result<WhereNode, FilterError> {
        let mut nodes = Vec::new();
        for (key, value) in obj {
            match key.as_str() {
                "and" | "or" => nodes.push(Self::parse_logical_operator(key, value, schema)?),
                _ => nodes.extend(Self::parse_field_condition(key, value, schema)?),
            }
        }
        Ok(if nodes.len() == 1 { nodes.remove(0) } else { WhereNode::And(nodes) })
    }

    fn parse_logical_operator(op: &str, value: &Value, schema: &'static ModelSchema) -> Result<WhereNode, FilterError> {
        let arr = value
            .as_array()
            .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires an array", op)))?;

        let mut children = Vec::with_capacity(arr.len());
        for v in arr {
            let obj = v
                .as_object()
                .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} entries must be objects", op)))?;
            children.push(Self::parse_object(obj, schema)?);
        }

        Ok(if op == "and" { WhereNode::And(children) } else { WhereNode::Or(children) })
    }

    fn parse_field_condition(field: &str, value: &Value, schema: &'static ModelSchema) -> Result<Vec<WhereNode>, FilterError> {
        let property = schema
            .property(field)
            .ok_or_else(|| FilterError::UnknownProperty(field.to_string()))?;

        let mut nodes = Vec::new();
        match value {
            Value::Object(ops) => {
                for (op_key, op_val) in ops {
                    let operator = FilterOp::from_key(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    Self::check_operand(property, operator, op_val)?;
                    nodes.push(WhereNode::Condition(FilterWhereInfo { property, operator, data: op_val.clone() }));
                }
            }
            Value::Array(_) => {
                return Err(FilterError::InvalidOperatorData(format!(
                    "{}: use {{\"inq\": [...]}} to match a list of values",
                    field
                )))
            }
            // Implicit equality: { field: value }
            scalar => {
                Self::check_operand(property, FilterOp::Eq, scalar)?;
                nodes.push(WhereNode::Condition(FilterWhereInfo { property, operator: FilterOp::Eq, data: scalar.clone() }));
            }
        }
        Ok(nodes)
    }

    fn check_operand(property: &PropertySchema, op: FilterOp, value: &Value) -> Result<(), FilterError> {
        let invalid = |msg: String| Err(FilterError::InvalidOperatorData(format!("{}: {}", property.name, msg)));
        let expected = property.property_type;

        match op {
            FilterOp::Eq | FilterOp::Neq => {
                if value.is_null() || expected.accepts(value) {
                    Ok(())
                } else {
                    invalid(format!("expected {}", expected.json_type()))
                }
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                if expected.accepts(value) {
                    Ok(())
                } else {
                    invalid(format!("expected {}", expected.json_type()))
                }
            }
            FilterOp::Inq | FilterOp::Nin => match value.as_array() {
                Some(values) if values.iter().all(|v| expected.accepts(v)) => Ok(()),
                Some(_) => invalid(format!("all values must be {}", expected.json_type())),
                None => invalid("inq/nin require an array".to_string()),
            },
            FilterOp::Between => match value.as_array() {
                Some(values) if values.len() == 2 && values.iter().all(|v| expected.accepts(v)) => Ok(()),
                _ => invalid("between requires an array with 2 values".to_string()),
            },
            FilterOp::Like | FilterOp::NLike | FilterOp::ILike | FilterOp::NILike => {
                if expected != PropertyType::String {
                    invalid("pattern operators apply to string properties only".to_string())
                } else if !value.is_string() {
                    invalid("pattern must be a string".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Render as a SQL boolean expression; placeholders start after `starting_param_index`
    pub fn to_sql(&self, starting_param_index: usize) -> SqlResult {
        let mut writer = SqlWriter {
            params: vec![],
            param_index: starting_param_index,
        };
        let query = writer.node(&self.root);
        SqlResult { query, params: writer.params }
    }

    /// Evaluate against a serialized row; missing properties behave as SQL NULL
    pub fn matches(&self, record: &Value) -> bool {
        Self::matches_node(&self.root, record)
    }

    fn matches_node(node: &WhereNode, record: &Value) -> bool {
        match node {
            WhereNode::And(children) => children.iter().all(|c| Self::matches_node(c, record)),
            WhereNode::Or(children) => children.iter().any(|c| Self::matches_node(c, record)),
            WhereNode::Condition(condition) => Self::matches_condition(condition, record),
        }
    }

    fn matches_condition(condition: &FilterWhereInfo, record: &Value) -> bool {
        let property_type = condition.property.property_type;
        let field = record.get(condition.property.name).unwrap_or(&Value::Null);
        let data = &condition.data;

        if field.is_null() {
            return match condition.operator {
                FilterOp::Eq => data.is_null(),
                _ => false,
            };
        }

        let cmp = |other: &Value| compare_values(property_type, field, other);
        let equals = |other: &Value| cmp(other) == Some(Ordering::Equal);

        match condition.operator {
            FilterOp::Eq => !data.is_null() && equals(data),
            FilterOp::Neq => data.is_null() || !equals(data),
            FilterOp::Gt => cmp(data) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(cmp(data), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => cmp(data) == Some(Ordering::Less),
            FilterOp::Lte => matches!(cmp(data), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::Inq => data.as_array().is_some_and(|values| values.iter().any(equals)),
            FilterOp::Nin => data.as_array().is_some_and(|values| !values.iter().any(equals)),
            FilterOp::Between => match data.as_array().map(Vec::as_slice) {
                Some([low, high]) => {
                    matches!(cmp(low), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(cmp(high), Some(Ordering::Less | Ordering::Equal))
                }
                _ => false,
            },
            op @ (FilterOp::Like | FilterOp::NLike | FilterOp::ILike | FilterOp::NILike) => {
                let (Some(text), Some(pattern)) = (field.as_str(), data.as_str()) else {
                    return false;
                };
                let insensitive = matches!(op, FilterOp::ILike | FilterOp::NILike);
                let found = like_match(text, pattern, insensitive);
                if matches!(op, FilterOp::Like | FilterOp::ILike) {
                    found
                } else {
                    !found
                }
            }
        }
    }
}

struct SqlWriter {
    params: Vec<Value>,
    param_index: usize,
}

impl SqlWriter {
    fn node(&mut self, node: &WhereNode) -> String {
        match node {
            WhereNode::And(children) => self.join(children, " AND ", "1=1"),
            WhereNode::Or(children) => self.join(children, " OR ", "1=0"),
            WhereNode::Condition(condition) => self.condition(condition),
        }
    }

    fn join(&mut self, children: &[WhereNode], joiner: &str, empty: &str) -> String {
        match children {
            [] => empty.to_string(),
            [only] => self.node(only),
            _ => children
                .iter()
                .map(|c| format!("({})", self.node(c)))
                .collect::<Vec<_>>()
                .join(joiner),
        }
    }

    fn condition(&mut self, condition: &FilterWhereInfo) -> String {
        let column = format!("\"{}\"", condition.property.name);
        let cast = condition.property.property_type.sql_cast();
        let data = &condition.data;

        match condition.operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", column),
            FilterOp::Neq if data.is_null() => format!("{} IS NOT NULL", column),
            FilterOp::Eq => format!("{} = {}", column, self.param(data.clone(), cast)),
            FilterOp::Neq => format!("{} <> {}", column, self.param(data.clone(), cast)),
            FilterOp::Gt => format!("{} > {}", column, self.param(data.clone(), cast)),
            FilterOp::Gte => format!("{} >= {}", column, self.param(data.clone(), cast)),
            FilterOp::Lt => format!("{} < {}", column, self.param(data.clone(), cast)),
            FilterOp::Lte => format!("{} <= {}", column, self.param(data.clone(), cast)),
            FilterOp::Inq | FilterOp::Nin => {
                let values = data.as_array().cloned().unwrap_or_default();
                let negate = condition.operator == FilterOp::Nin;
                if values.is_empty() {
                    return if negate { "1=1".to_string() } else { "1=0".to_string() };
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v, cast)).collect();
                let keyword = if negate { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column, keyword, params.join(", "))
            }
            FilterOp::Between => {
                let values = data.as_array().cloned().unwrap_or_default();
                let low = self.param(values.first().cloned().unwrap_or(Value::Null), cast);
                let high = self.param(values.get(1).cloned().unwrap_or(Value::Null), cast);
                format!("{} BETWEEN {} AND {}", column, low, high)
            }
            FilterOp::Like => format!("{} LIKE {}", column, self.param(data.clone(), "")),
            FilterOp::NLike => format!("{} NOT LIKE {}", column, self.param(data.clone(), "")),
            FilterOp::ILike => format!("{} ILIKE {}", column, self.param(data.clone(), "")),
            FilterOp::NILike => format!("{} NOT ILIKE {}", column, self.param(data.clone(), "")),
        }
    }

    fn param(&mut self, value: Value, cast: &str) -> String {
        self.params.push(value);
        self.param_index += 1;
        format!("${}{}", self.param_index, cast)
    }
}

/// Ordering of two non-null values of one property type
pub(crate) fn compare_values(property_type: PropertyType, a: &Value, b: &Value) -> Option<Ordering> {
    match property_type {
        PropertyType::Integer => a.as_f64()?.partial_cmp(&b.as_f64()?),
        PropertyType::String => Some(a.as_str()?.cmp(b.as_str()?)),
        PropertyType::Uuid => {
            let a = Uuid::parse_str(a.as_str()?).ok()?;
            let b = Uuid::parse_str(b.as_str()?).ok()?;
            Some(a.cmp(&b))
        }
    }
}

enum LikeToken {
    AnySequence,
    AnyChar,
    Literal(char),
}

/// SQL LIKE semantics: `%` any sequence, `_` any char, `\` escapes
fn like_match(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let (text, pattern) = if case_insensitive {
        (text.to_lowercase(), pattern.to_lowercase())
    } else {
        (text.to_string(), pattern.to_string())
    };

    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnySequence,
            '_' => LikeToken::AnyChar,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            other => LikeToken::Literal(other),
        });
    }

    let text: Vec<char> = text.chars().collect();
    let (mut ti, mut pi) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        match tokens.get(pi) {
            Some(LikeToken::AnyChar) => {
                ti += 1;
                pi += 1;
            }
            Some(LikeToken::Literal(c)) if *c == text[ti] => {
                ti += 1;
                pi += 1;
            }
            Some(LikeToken::AnySequence) => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            _ => match backtrack {
                Some((star_pi, star_ti)) => {
                    pi = star_pi + 1;
                    ti = star_ti + 1;
                    backtrack = Some((star_pi, star_ti + 1));
                }
                None => return false,
            },
        }
    }

    tokens[pi..].iter().all(|t| matches!(t, LikeToken::AnySequence))
}
