//! Project entity and the create-time schema check.
//!
//! `validate_create` is a plain function over untyped JSON: it either yields a
//! `NewProject` or the full list of field-level problems, so handlers can branch
//! on the result instead of catching anything.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Validated input of `POST /projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self { name: name.into(), description }
    }

    /// Document fields as stored, stamped with the server-assigned creation time.
    pub fn into_fields(self, created_at: String) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::String(self.name));
        if let Some(d) = self.description {
            fields.insert("description".into(), Value::String(d));
        }
        fields.insert("createdAt".into(), Value::String(created_at));
        fields
    }
}

/// Read view of a stored project as the frontend renders it.
///
/// Built leniently from API JSON: documents written through PATCH may lack
/// `name` or carry non-string values, which degrade to empty/absent here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Project {
    pub fn from_json(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        let id = obj.get("id")?.as_str()?.to_string();
        let text = |k: &str| obj.get(k).and_then(|x| x.as_str()).map(|s| s.to_string());
        Some(Self {
            id,
            name: text("name").unwrap_or_default(),
            description: text("description"),
            created_at: text("createdAt"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorCode {
    Required,
    InvalidType,
    TooShort,
}

/// One failed constraint, addressed by field name ("" for the whole input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: FieldErrorCode,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, code: FieldErrorCode, message: impl Into<String>) -> Self {
        Self { field: field.to_string(), code, message: message.into() }
    }
}

/// Check a create payload. Unknown keys are dropped; every violation is reported.
pub fn validate_create(input: &Value) -> Result<NewProject, Vec<FieldError>> {
    let Some(obj) = input.as_object() else {
        return Err(vec![FieldError::new("", FieldErrorCode::InvalidType, "expected a JSON object")]);
    };
    let mut errors = Vec::new();

    let name = match obj.get("name") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("name", FieldErrorCode::Required, "name is required"));
            None
        }
        Some(Value::String(s)) if s.is_empty() => {
            errors.push(FieldError::new("name", FieldErrorCode::TooShort, "name must contain at least 1 character"));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new("name", FieldErrorCode::InvalidType, "name must be a string"));
            None
        }
    };

    let description = match obj.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(FieldError::new("description", FieldErrorCode::InvalidType, "description must be a string"));
            None
        }
    };

    match name {
        Some(name) if errors.is_empty() => Ok(NewProject { name, description }),
        _ => Err(errors),
    }
}
