use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::repository::{not_found, Entity, Repository};
use crate::filter::{Filter, FilterWhere};

/// In-process repository keeping entities in insertion order. Used for
/// local runs without PostgreSQL and by the test suites.
pub struct MemoryRepository<T> {
    rows: RwLock<Vec<T>>,
}

impl<T: Entity> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Entity> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn to_json<T: Entity>(entity: &T) -> Result<Value, DatabaseError> {
    serde_json::to_value(entity).map_err(|e| DatabaseError::QueryError(e.to_string()))
}

fn row_matches<T: Entity>(entity: &T, where_clause: Option<&FilterWhere>) -> Result<bool, DatabaseError> {
    match where_clause {
        None => Ok(true),
        Some(where_clause) => Ok(where_clause.matches(&to_json(entity)?)),
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MemoryRepository<T> {
    async fn create(&self, data: T::Data) -> Result<T, DatabaseError> {
        let entity = T::from_data(Uuid::new_v4(), data);
        self.rows.write().await.push(entity.clone());
        Ok(entity)
    }

    async fn count(&self, where_clause: Option<&FilterWhere>) -> Result<u64, DatabaseError> {
        let rows = self.rows.read().await;
        let mut count = 0;
        for row in rows.iter() {
            if row_matches(row, where_clause)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<T>, DatabaseError> {
        let rows = self.rows.read().await;
        let mut pairs = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            pairs.push((row.clone(), to_json(row)?));
        }
        Ok(filter.apply(pairs))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<T, DatabaseError> {
        let rows = self.rows.read().await;
        rows.iter()
            .find(|row| row.id() == id)
            .cloned()
            .ok_or_else(|| not_found::<T>(id))
    }

    async fn update_all(&self, patch: &T::Patch, where_clause: Option<&FilterWhere>) -> Result<u64, DatabaseError> {
        let mut rows = self.rows.write().await;
        let mut count = 0;
        for row in rows.iter_mut() {
            if row_matches(row, where_clause)? {
                row.apply_patch(patch);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn replace_by_id(&self, id: Uuid, data: T::Data) -> Result<(), DatabaseError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id() == id)
            .ok_or_else(|| not_found::<T>(id))?;
        *row = T::from_data(id, data);
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut rows = self.rows.write().await;
        let index = rows
            .iter()
            .position(|row| row.id() == id)
            .ok_or_else(|| not_found::<T>(id))?;
        rows.remove(index);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
