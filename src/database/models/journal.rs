use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::repository::Entity;
use crate::schema::{FieldError, ModelSchema, PropertySchema, PropertyType, SchemaError, SchemaView};

pub static JOURNAL_SCHEMA: ModelSchema = ModelSchema {
    name: "Journal",
    properties: &[
        PropertySchema { name: "id", property_type: PropertyType::Uuid, required: false, nullable: false, enum_values: None },
        PropertySchema { name: "title", property_type: PropertyType::String, required: true, nullable: false, enum_values: None },
        PropertySchema { name: "content", property_type: PropertyType::String, required: false, nullable: true, enum_values: None },
        PropertySchema { name: "status", property_type: PropertyType::Integer, required: false, nullable: false, enum_values: Some(&[0, 1, 2]) },
    ],
};

/// Body of `POST /journal`
pub static NEW_JOURNAL_VIEW: SchemaView = SchemaView::of(&JOURNAL_SCHEMA).titled("NewJournal").excluding(&["id"]);

/// Body of `PATCH /journal` and `PATCH /journal/:id`
pub static JOURNAL_PARTIAL_VIEW: SchemaView = SchemaView::of(&JOURNAL_SCHEMA).titled("JournalPartial").partial();

/// Body of `PUT /journal/:id`
pub static JOURNAL_VIEW: SchemaView = SchemaView::of(&JOURNAL_SCHEMA);

/// Review state of a journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i64", into = "i64")]
#[repr(i32)]
pub enum JournalStatus {
    #[default]
    New = 0,
    UserEdited = 1,
    AdminReviewed = 2,
}

impl JournalStatus {
    /// Status written when a caller edits a journal
    pub fn for_editor(is_admin: bool) -> Self {
        if is_admin {
            JournalStatus::AdminReviewed
        } else {
            JournalStatus::UserEdited
        }
    }
}

impl TryFrom<i64> for JournalStatus {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(JournalStatus::New),
            1 => Ok(JournalStatus::UserEdited),
            2 => Ok(JournalStatus::AdminReviewed),
            other => Err(format!("invalid journal status {}", other)),
        }
    }
}

impl From<JournalStatus> for i64 {
    fn from(status: JournalStatus) -> Self {
        status as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Journal {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub status: JournalStatus,
}

/// Journal fields without the generated id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalData {
    pub title: String,
    pub content: Option<String>,
    pub status: JournalStatus,
}

/// Create payload. A client-sent status is accepted by the schema but never stored.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJournal {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<JournalStatus>,
}

impl NewJournal {
    pub fn into_data(self) -> JournalData {
        JournalData {
            title: self.title,
            content: self.content,
            status: JournalStatus::New,
        }
    }
}

/// Full replacement payload
#[derive(Debug, Clone, Deserialize)]
pub struct JournalInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<JournalStatus>,
}

impl JournalInput {
    pub fn into_data(self) -> JournalData {
        JournalData {
            title: self.title,
            content: self.content,
            status: self.status.unwrap_or_default(),
        }
    }
}

/// Partial payload; `content: null` clears content, an absent key leaves it alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalPatch {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub content: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<JournalStatus>,
}

impl JournalPatch {
    /// Turn the partial payload into a whole entity with the given status.
    /// Properties the payload leaves out are cleared.
    pub fn into_data(self, status: JournalStatus) -> Result<JournalData, SchemaError> {
        let title = self.title.ok_or_else(|| SchemaError {
            view: JOURNAL_SCHEMA.name,
            details: vec![FieldError::new("title", "required", "must have required property 'title'")],
        })?;

        Ok(JournalData {
            title,
            content: self.content.flatten(),
            status,
        })
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Entity for Journal {
    type Data = JournalData;
    type Patch = JournalPatch;

    const TABLE: &'static str = "journal";

    fn schema() -> &'static ModelSchema {
        &JOURNAL_SCHEMA
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn from_data(id: Uuid, data: JournalData) -> Self {
        Self {
            id,
            title: data.title,
            content: data.content,
            status: data.status,
        }
    }

    fn apply_patch(&mut self, patch: &JournalPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    fn data_columns(data: &JournalData) -> Vec<(&'static str, Value)> {
        vec![
            ("title", json!(data.title)),
            ("content", json!(data.content)),
            ("status", json!(i64::from(data.status))),
        ]
    }

    fn patch_columns(patch: &JournalPatch) -> Vec<(&'static str, Value)> {
        let mut columns = Vec::new();
        if let Some(title) = &patch.title {
            columns.push(("title", json!(title)));
        }
        if let Some(content) = &patch.content {
            columns.push(("content", json!(content)));
        }
        if let Some(status) = patch.status {
            columns.push(("status", json!(i64::from(status))));
        }
        columns
    }
}
