use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::query_builder::QueryBuilder;
use crate::database::repository::{not_found, Entity, Repository};
use crate::filter::{Filter, FilterWhere};

/// PostgreSQL-backed repository for one entity table
pub struct PgRepository<T> {
    pool: PgPool,
    query: QueryBuilder<T>,
}

impl<T> PgRepository<T>
where
    T: Entity + for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query: QueryBuilder::new(T::TABLE),
        }
    }
}

#[async_trait]
impl<T> Repository<T> for PgRepository<T>
where
    T: Entity + for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    async fn create(&self, data: T::Data) -> Result<T, DatabaseError> {
        let entity = self.query.insert(&self.pool, &T::data_columns(&data)).await?;
        debug!("Created {} {}", T::TABLE, entity.id());
        Ok(entity)
    }

    async fn count(&self, where_clause: Option<&FilterWhere>) -> Result<u64, DatabaseError> {
        let count = self.query.count(&self.pool, where_clause).await?;
        Ok(count as u64)
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<T>, DatabaseError> {
        self.query.select_all(&self.pool, filter).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.query
            .select_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| not_found::<T>(id))
    }

    async fn update_all(&self, patch: &T::Patch, where_clause: Option<&FilterWhere>) -> Result<u64, DatabaseError> {
        self.query
            .update_all(&self.pool, &T::patch_columns(patch), where_clause)
            .await
    }

    async fn replace_by_id(&self, id: Uuid, data: T::Data) -> Result<(), DatabaseError> {
        let affected = self.query.update_by_id(&self.pool, id, &T::data_columns(&data)).await?;
        if affected == 0 {
            return Err(not_found::<T>(id));
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), DatabaseError> {
        let affected = self.query.delete_by_id(&self.pool, id).await?;
        if affected == 0 {
            return Err(not_found::<T>(id));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
