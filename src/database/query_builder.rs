use serde_json::Value;
use sqlx::{self, postgres::PgArguments, FromRow, PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::filter::types::SqlResult;
use crate::filter::{Filter, FilterWhere};

/// Parameterised statements against one table. SQL text is produced by the
/// `*_sql` functions so it can be checked without a database.
pub struct QueryBuilder<T> {
    table_name: &'static str,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(table_name: &'static str) -> Self {
        Self {
            table_name,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_all(&self, pool: &PgPool, filter: &Filter) -> Result<Vec<T>, DatabaseError> {
        let sql_result = filter.to_sql(self.table_name);
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn select_by_id(&self, pool: &PgPool, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let query = select_by_id_sql(self.table_name);
        let row = sqlx::query_as::<_, T>(&query).bind(id).fetch_optional(pool).await?;
        Ok(row)
    }

    pub async fn count(&self, pool: &PgPool, where_clause: Option<&FilterWhere>) -> Result<i64, DatabaseError> {
        let sql_result = count_sql(self.table_name, where_clause);
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    pub async fn insert(&self, pool: &PgPool, columns: &[(&'static str, Value)]) -> Result<T, DatabaseError> {
        let sql_result = insert_sql(self.table_name, columns);
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let row = q.fetch_one(pool).await?;
        Ok(row)
    }

    /// Update every matching row; returns how many rows matched
    pub async fn update_all(
        &self,
        pool: &PgPool,
        columns: &[(&'static str, Value)],
        where_clause: Option<&FilterWhere>,
    ) -> Result<u64, DatabaseError> {
        if columns.is_empty() {
            return Ok(self.count(pool, where_clause).await? as u64);
        }
        let sql_result = update_all_sql(self.table_name, columns, where_clause);
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let result = q.execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Overwrite the given columns of one row; returns rows affected
    pub async fn update_by_id(&self, pool: &PgPool, id: Uuid, columns: &[(&'static str, Value)]) -> Result<u64, DatabaseError> {
        let sql_result = update_by_id_sql(self.table_name, columns);
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let result = q.bind(id).execute(pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_id(&self, pool: &PgPool, id: Uuid) -> Result<u64, DatabaseError> {
        let query = delete_by_id_sql(self.table_name);
        let result = sqlx::query(&query).bind(id).execute(pool).await?;
        Ok(result.rows_affected())
    }
}

fn select_by_id_sql(table: &str) -> String {
    format!("SELECT * FROM \"{}\" WHERE \"id\" = $1", table)
}

fn count_sql(table: &str, where_clause: Option<&FilterWhere>) -> SqlResult {
    match where_clause {
        Some(where_clause) => {
            let result = where_clause.to_sql(0);
            SqlResult {
                query: format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", table, result.query),
                params: result.params,
            }
        }
        None => SqlResult {
            query: format!("SELECT COUNT(*) as count FROM \"{}\"", table),
            params: vec![],
        },
    }
}

fn insert_sql(table: &str, columns: &[(&'static str, Value)]) -> SqlResult {
    if columns.is_empty() {
        return SqlResult {
            query: format!("INSERT INTO \"{}\" DEFAULT VALUES RETURNING *", table),
            params: vec![],
        };
    }
    let names: Vec<String> = columns.iter().map(|(name, _)| format!("\"{}\"", name)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    SqlResult {
        query: format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            table,
            names.join(", "),
            placeholders.join(", ")
        ),
        params: columns.iter().map(|(_, value)| value.clone()).collect(),
    }
}

fn set_clause(columns: &[(&'static str, Value)]) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("\"{}\" = ${}", name, i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

fn update_all_sql(table: &str, columns: &[(&'static str, Value)], where_clause: Option<&FilterWhere>) -> SqlResult {
    let mut params: Vec<Value> = columns.iter().map(|(_, value)| value.clone()).collect();
    let mut query = format!("UPDATE \"{}\" SET {}", table, set_clause(columns));
    if let Some(where_clause) = where_clause {
        let result = where_clause.to_sql(columns.len());
        query.push_str(&format!(" WHERE {}", result.query));
        params.extend(result.params);
    }
    SqlResult { query, params }
}

/// The id is bound after the column values
fn update_by_id_sql(table: &str, columns: &[(&'static str, Value)]) -> SqlResult {
    SqlResult {
        query: format!(
            "UPDATE \"{}\" SET {} WHERE \"id\" = ${}",
            table,
            set_clause(columns),
            columns.len() + 1
        ),
        params: columns.iter().map(|(_, value)| value.clone()).collect(),
    }
}

fn delete_by_id_sql(table: &str) -> String {
    format!("DELETE FROM \"{}\" WHERE \"id\" = $1", table)
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays are expanded into one placeholder per element by FilterWhere
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::journal::JOURNAL_SCHEMA;
    use serde_json::json;

    fn columns() -> Vec<(&'static str, Value)> {
        vec![("title", json!("t")), ("content", Value::Null), ("status", json!(1))]
    }

    #[test]
    fn insert_returns_the_row() {
        let sql = insert_sql("journal", &columns());
        assert_eq!(
            sql.query,
            "INSERT INTO \"journal\" (\"title\", \"content\", \"status\") VALUES ($1, $2, $3) RETURNING *"
        );
        assert_eq!(sql.params, vec![json!("t"), Value::Null, json!(1)]);
    }

    #[test]
    fn update_all_numbers_where_params_after_set_params() {
        let where_clause = FilterWhere::parse(&json!({ "status": 0 }), &JOURNAL_SCHEMA).unwrap();
        let sql = update_all_sql("journal", &[("status", json!(2))], Some(&where_clause));
        assert_eq!(sql.query, "UPDATE \"journal\" SET \"status\" = $1 WHERE \"status\" = $2");
        assert_eq!(sql.params, vec![json!(2), json!(0)]);

        let sql = update_all_sql("journal", &[("title", json!("x"))], None);
        assert_eq!(sql.query, "UPDATE \"journal\" SET \"title\" = $1");
    }

    #[test]
    fn update_by_id_binds_id_last() {
        let sql = update_by_id_sql("journal", &columns());
        assert_eq!(
            sql.query,
            "UPDATE \"journal\" SET \"title\" = $1, \"content\" = $2, \"status\" = $3 WHERE \"id\" = $4"
        );
    }

    #[test]
    fn count_and_single_row_statements() {
        assert_eq!(count_sql("journal", None).query, "SELECT COUNT(*) as count FROM \"journal\"");
        let where_clause = FilterWhere::parse(&json!({ "title": { "like": "a%" } }), &JOURNAL_SCHEMA).unwrap();
        assert_eq!(
            count_sql("journal", Some(&where_clause)).query,
            "SELECT COUNT(*) as count FROM \"journal\" WHERE \"title\" LIKE $1"
        );
        assert_eq!(select_by_id_sql("journal"), "SELECT * FROM \"journal\" WHERE \"id\" = $1");
        assert_eq!(delete_by_id_sql("journal"), "DELETE FROM \"journal\" WHERE \"id\" = $1");
    }
}
