use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{AdminRoleCheck, UserProfile};
use crate::config::SecurityConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::journal::JOURNAL_SCHEMA;
use crate::database::models::{Count, Journal, JournalInput, JournalPatch, JournalStatus, NewJournal};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::Filter;

/// Journal operations behind the HTTP routes.
///
/// Holds the store and the admin-detection settings; every method is one
/// repository call plus the request-level rules around it (id parsing,
/// filter parsing, review status).
pub struct JournalService {
    repository: Arc<dyn Repository<Journal>>,
    admin_role: String,
    admin_check: AdminRoleCheck,
}

impl JournalService {
    pub fn new(repository: Arc<dyn Repository<Journal>>, security: &SecurityConfig) -> Self {
        Self {
            repository,
            admin_role: security.admin_role.clone(),
            admin_check: security.admin_role_check,
        }
    }

    /// Persist a new journal; the stored status is always `New`
    pub async fn create(&self, input: NewJournal) -> Result<Journal, ApiError> {
        let journal = self.repository.create(input.into_data()).await?;
        info!("Created journal {}", journal.id);
        Ok(journal)
    }

    pub async fn count(&self, where_raw: Option<&str>) -> Result<Count, ApiError> {
        let where_clause = Filter::parse_where(&JOURNAL_SCHEMA, where_raw)?;
        let count = self.repository.count(where_clause.as_ref()).await?;
        Ok(Count { count })
    }

    pub async fn find(&self, filter_raw: Option<&str>) -> Result<Vec<Value>, ApiError> {
        let filter = Filter::parse(&JOURNAL_SCHEMA, filter_raw)?;
        let journals = self.repository.find(&filter).await?;
        journals
            .iter()
            .map(|journal| to_value(journal).map(|v| filter.project(v)))
            .collect()
    }

    /// Apply the patch to every match. The review status is not recomputed here.
    pub async fn update_all(&self, patch: JournalPatch, where_raw: Option<&str>) -> Result<Count, ApiError> {
        if patch.id.is_some() {
            return Err(ApiError::bad_request("The id property cannot be updated in a bulk update"));
        }
        let where_clause = Filter::parse_where(&JOURNAL_SCHEMA, where_raw)?;
        let count = self.repository.update_all(&patch, where_clause.as_ref()).await?;
        info!("Bulk updated {} journal(s)", count);
        Ok(Count { count })
    }

    pub async fn find_by_id(&self, id: &str, filter_raw: Option<&str>) -> Result<Value, ApiError> {
        let filter = Filter::parse_excluding_where(&JOURNAL_SCHEMA, filter_raw)?;
        let id = parse_id(id)?;
        let journal = self.repository.find_by_id(id).await?;
        Ok(filter.project(to_value(&journal)?))
    }

    /// Edit a journal on behalf of `user`, tagging it with the editor's review
    /// status. The stored journal is replaced by the patched fields.
    pub async fn update_by_id(&self, id: &str, patch: JournalPatch, user: &UserProfile) -> Result<(), ApiError> {
        let id = parse_id(id)?;
        check_body_id(id, patch.id)?;

        let is_admin = user.is_admin(&self.admin_role, self.admin_check);
        let status = JournalStatus::for_editor(is_admin);
        debug!(
            "Journal {} edited by {} (admin: {}, check: {:?}); status {:?}",
            id, user.name, is_admin, self.admin_check, status
        );

        let data = patch.into_data(status)?;
        self.repository.replace_by_id(id, data).await?;
        Ok(())
    }

    pub async fn replace_by_id(&self, id: &str, input: JournalInput, user: &UserProfile) -> Result<(), ApiError> {
        let id = parse_id(id)?;
        check_body_id(id, input.id)?;
        debug!("Journal {} replaced by {}", id, user.name);
        self.repository.replace_by_id(id, input.into_data()).await?;
        Ok(())
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), ApiError> {
        let id = parse_id(id)?;
        self.repository.delete_by_id(id).await?;
        info!("Deleted journal {}", id);
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        self.repository.health_check().await
    }
}

/// Ids that are not UUIDs cannot name a stored journal
fn parse_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::not_found(format!("Entity not found: {} with id {}", JOURNAL_SCHEMA.name, id)))
}

fn check_body_id(path_id: Uuid, body_id: Option<Uuid>) -> Result<(), ApiError> {
    match body_id {
        Some(body_id) if body_id != path_id => Err(ApiError::bad_request(format!(
            "id property ({}) cannot be updated from {} to {}",
            JOURNAL_SCHEMA.name, path_id, body_id
        ))),
        _ => Ok(()),
    }
}

fn to_value(journal: &Journal) -> Result<Value, ApiError> {
    serde_json::to_value(journal).map_err(|e| {
        tracing::error!("Failed to serialize journal: {}", e);
        ApiError::internal_server_error("Failed to format response")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RoleClaim;
    use crate::config::AppConfig;
    use crate::database::memory::MemoryRepository;
    use serde_json::json;

    fn service(check: AdminRoleCheck) -> JournalService {
        let mut security = AppConfig::development().security;
        security.admin_role_check = check;
        JournalService::new(Arc::new(MemoryRepository::<Journal>::new()), &security)
    }

    fn user(roles: &[&str]) -> UserProfile {
        UserProfile {
            id: "u-1".to_string(),
            name: "tester".to_string(),
            roles: roles.iter().map(|r| RoleClaim::new(*r)).collect(),
        }
    }

    fn new_journal(title: &str) -> NewJournal {
        serde_json::from_value(json!({ "title": title, "status": 2 })).unwrap()
    }

    fn patch(body: Value) -> JournalPatch {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn create_forces_new_status() {
        let svc = service(AdminRoleCheck::LegacyIndex);
        let created = svc.create(new_journal("x")).await.unwrap();
        assert_eq!(created.status, JournalStatus::New);
        assert_eq!(svc.count(None).await.unwrap(), Count { count: 1 });
    }

    #[tokio::test]
    async fn update_by_id_tags_status_by_role() {
        let svc = service(AdminRoleCheck::LegacyIndex);
        let created = svc.create(new_journal("x")).await.unwrap();
        let id = created.id.to_string();

        svc.update_by_id(&id, patch(json!({ "title": "y" })), &user(&["user"])).await.unwrap();
        let found = svc.find_by_id(&id, None).await.unwrap();
        assert_eq!(found, json!({ "id": id, "title": "y", "status": 1 }));

        svc.update_by_id(&id, patch(json!({ "title": "z" })), &user(&["user", "admin"])).await.unwrap();
        assert_eq!(svc.find_by_id(&id, None).await.unwrap()["status"], 2);

        // legacy check: admin in first position is not recognised
        svc.update_by_id(&id, patch(json!({ "title": "z" })), &user(&["admin"])).await.unwrap();
        assert_eq!(svc.find_by_id(&id, None).await.unwrap()["status"], 1);
    }

    #[tokio::test]
    async fn any_position_check_recognises_sole_admin() {
        let svc = service(AdminRoleCheck::AnyPosition);
        let id = svc.create(new_journal("x")).await.unwrap().id.to_string();
        svc.update_by_id(&id, patch(json!({ "title": "y" })), &user(&["admin"])).await.unwrap();
        assert_eq!(svc.find_by_id(&id, None).await.unwrap()["status"], 2);
    }

    #[tokio::test]
    async fn update_by_id_replaces_whole_entity() {
        let svc = service(AdminRoleCheck::LegacyIndex);
        let input: NewJournal = serde_json::from_value(json!({ "title": "x", "content": "body" })).unwrap();
        let id = svc.create(input).await.unwrap().id.to_string();

        svc.update_by_id(&id, patch(json!({ "title": "y" })), &user(&[])).await.unwrap();
        let found = svc.find_by_id(&id, None).await.unwrap();
        assert!(found.get("content").is_none());

        let err = svc.update_by_id(&id, patch(json!({ "content": "c" })), &user(&[])).await.unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn mismatched_or_unknown_ids() {
        let svc = service(AdminRoleCheck::LegacyIndex);
        let id = svc.create(new_journal("x")).await.unwrap().id.to_string();

        let other = Uuid::new_v4();
        let err = svc
            .update_by_id(&id, patch(json!({ "id": other, "title": "y" })), &user(&[]))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let missing = Uuid::new_v4().to_string();
        for err in [
            svc.find_by_id(&missing, None).await.unwrap_err(),
            svc.find_by_id("not-a-uuid", None).await.unwrap_err(),
            svc.update_by_id(&missing, patch(json!({ "title": "y" })), &user(&[])).await.unwrap_err(),
            svc.delete_by_id(&missing).await.unwrap_err(),
        ] {
            assert_eq!(err.status_code(), 404);
        }
    }

    #[tokio::test]
    async fn replace_by_id_keeps_body_status() {
        let svc = service(AdminRoleCheck::LegacyIndex);
        let id = svc.create(new_journal("x")).await.unwrap().id.to_string();

        let input: JournalInput = serde_json::from_value(json!({ "title": "r", "status": 2 })).unwrap();
        svc.replace_by_id(&id, input, &user(&[])).await.unwrap();
        assert_eq!(svc.find_by_id(&id, None).await.unwrap()["status"], 2);

        let input: JournalInput = serde_json::from_value(json!({ "title": "r" })).unwrap();
        svc.replace_by_id(&id, input, &user(&[])).await.unwrap();
        assert_eq!(svc.find_by_id(&id, None).await.unwrap()["status"], 0);
    }

    #[tokio::test]
    async fn bulk_update_counts_and_rejects_id() {
        let svc = service(AdminRoleCheck::LegacyIndex);
        svc.create(new_journal("a")).await.unwrap();
        svc.create(new_journal("b")).await.unwrap();

        let count = svc
            .update_all(patch(json!({ "content": "shared" })), Some(r#"{"title":"a"}"#))
            .await
            .unwrap();
        assert_eq!(count, Count { count: 1 });

        let err = svc
            .update_all(patch(json!({ "id": Uuid::new_v4() })), None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn find_applies_filter() {
        let svc = service(AdminRoleCheck::LegacyIndex);
        for title in ["b", "a", "c"] {
            svc.create(new_journal(title)).await.unwrap();
        }

        let found = svc.find(Some(r#"{"order":"title","fields":["title"],"limit":2}"#)).await.unwrap();
        assert_eq!(found, vec![json!({ "title": "a" }), json!({ "title": "b" })]);

        let err = svc.find(Some(r#"{"where":{"owner":"x"}}"#)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let id = Uuid::new_v4().to_string();
        let err = svc.find_by_id(&id, Some(r#"{"where":{"status":0}}"#)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
