use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Invalid WHERE clause: {0}")]
    InvalidWhereClause(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid operator data: {0}")]
    InvalidOperatorData(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Invalid fields: {0}")]
    InvalidFields(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Relation \"{0}\" is not defined")]
    UnknownRelation(String),

    #[error("A \"where\" clause is not allowed here")]
    WhereNotAllowed,

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
