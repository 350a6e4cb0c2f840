use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::filter::{Filter, FilterWhere};
use crate::schema::ModelSchema;

/// A persisted model with a generated UUID id
pub trait Entity: Clone + Serialize + Send + Sync + Unpin + 'static {
    /// Every field except the id
    type Data: Send + Sync + 'static;
    /// Subset of fields applied by partial updates
    type Patch: Send + Sync + 'static;

    const TABLE: &'static str;

    fn schema() -> &'static ModelSchema;

    fn id(&self) -> Uuid;

    fn from_data(id: Uuid, data: Self::Data) -> Self;

    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Column/value pairs written by create and replace
    fn data_columns(data: &Self::Data) -> Vec<(&'static str, Value)>;

    /// Column/value pairs written by a partial update
    fn patch_columns(patch: &Self::Patch) -> Vec<(&'static str, Value)>;
}

/// Persistence contract the journal service depends on.
///
/// Each method is a single store operation; implementations report a missing
/// id as `DatabaseError::NotFound`.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn create(&self, data: T::Data) -> Result<T, DatabaseError>;

    async fn count(&self, where_clause: Option<&FilterWhere>) -> Result<u64, DatabaseError>;

    /// Matching entities, ordered and paged by the filter. Field projection is
    /// left to the caller.
    async fn find(&self, filter: &Filter) -> Result<Vec<T>, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<T, DatabaseError>;

    /// Returns the number of matching entities
    async fn update_all(&self, patch: &T::Patch, where_clause: Option<&FilterWhere>) -> Result<u64, DatabaseError>;

    async fn replace_by_id(&self, id: Uuid, data: T::Data) -> Result<(), DatabaseError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

pub(crate) fn not_found<T: Entity>(id: Uuid) -> DatabaseError {
    DatabaseError::NotFound(format!("Entity not found: {} with id {}", T::schema().name, id))
}
