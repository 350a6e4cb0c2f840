//! Declarative model schemas and the request views derived from them.
//!
//! A `ModelSchema` lists an entity's properties once. Each route binds a
//! `SchemaView` of that model (all properties, some excluded, or partial) and
//! request bodies are checked against the view before any handler runs.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Integer,
    Uuid,
}

impl PropertyType {
    pub fn json_type(self) -> &'static str {
        match self {
            PropertyType::String | PropertyType::Uuid => "string",
            PropertyType::Integer => "integer",
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            PropertyType::String => value.is_string(),
            PropertyType::Integer => value.as_i64().is_some(),
            PropertyType::Uuid => value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok()),
        }
    }

    /// Cast applied to bound text parameters compared against this column
    pub fn sql_cast(self) -> &'static str {
        match self {
            PropertyType::Uuid => "::uuid",
            PropertyType::String | PropertyType::Integer => "",
        }
    }
}

#[derive(Debug)]
pub struct PropertySchema {
    pub name: &'static str,
    pub property_type: PropertyType,
    pub required: bool,
    pub nullable: bool,
    pub enum_values: Option<&'static [i64]>,
}

#[derive(Debug)]
pub struct ModelSchema {
    pub name: &'static str,
    pub properties: &'static [PropertySchema],
}

impl ModelSchema {
    pub fn property(&self, name: &str) -> Option<&'static PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// One problem found in a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub code: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(property: &str, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            path: if property.is_empty() { String::new() } else { format!("/{}", property) },
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("The `{view}` instance is not valid ({} issue(s))", .details.len())]
pub struct SchemaError {
    pub view: &'static str,
    pub details: Vec<FieldError>,
}

/// A request-body schema derived from a model
#[derive(Debug, Clone, Copy)]
pub struct SchemaView {
    pub title: &'static str,
    model: &'static ModelSchema,
    exclude: &'static [&'static str],
    partial: bool,
}

impl SchemaView {
    pub const fn of(model: &'static ModelSchema) -> Self {
        Self {
            title: model.name,
            model,
            exclude: &[],
            partial: false,
        }
    }

    pub const fn titled(self, title: &'static str) -> Self {
        Self { title, ..self }
    }

    pub const fn excluding(self, exclude: &'static [&'static str]) -> Self {
        Self { exclude, ..self }
    }

    /// Every property becomes optional
    pub const fn partial(self) -> Self {
        Self { partial: true, ..self }
    }

    fn allows(&self, name: &str) -> bool {
        !self.exclude.contains(&name) && self.model.property(name).is_some()
    }

    pub fn validate(&self, body: &Value) -> Result<(), SchemaError> {
        let object = body.as_object().ok_or_else(|| SchemaError {
            view: self.title,
            details: vec![FieldError::new("", "type", "must be object")],
        })?;

        let mut details = Vec::new();

        for (key, value) in object {
            if !self.allows(key) {
                details.push(FieldError::new(key, "additionalProperties", "must NOT have additional properties"));
                continue;
            }
            let Some(property) = self.model.property(key) else { continue };

            if value.is_null() {
                if !property.nullable {
                    details.push(FieldError::new(key, "type", format!("must be {}", property.property_type.json_type())));
                }
                continue;
            }

            if !property.property_type.accepts(value) {
                let expected = match property.property_type {
                    PropertyType::Uuid => "string in uuid format".to_string(),
                    other => other.json_type().to_string(),
                };
                details.push(FieldError::new(key, "type", format!("must be {}", expected)));
                continue;
            }

            if let (Some(allowed), Some(n)) = (property.enum_values, value.as_i64()) {
                if !allowed.contains(&n) {
                    let listed = allowed.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                    details.push(FieldError::new(key, "enum", format!("must be equal to one of the allowed values: {}", listed)));
                }
            }
        }

        if !self.partial {
            for property in self.model.properties.iter().filter(|p| p.required) {
                if self.exclude.contains(&property.name) {
                    continue;
                }
                if !object.contains_key(property.name) {
                    details.push(FieldError::new(
                        property.name,
                        "required",
                        format!("must have required property '{}'", property.name),
                    ));
                }
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(SchemaError { view: self.title, details })
        }
    }
}
