use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Bucket;

/// A typed record that lives in one bucket.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    const BUCKET: Bucket;

    /// Fields that may change after creation. `None` allows every field.
    const PATCHABLE: Option<&'static [&'static str]> = None;

    /// Checks required fields before any write.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// A record together with the envelope the store assigns to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stored<T> {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field was missing or blank
    MissingField(&'static str),
    /// A field held a value outside its domain
    InvalidValue { field: &'static str, message: String },
    /// The bucket does not accept updates at all
    Immutable(Bucket),
    /// The field cannot change after creation
    FieldNotPatchable { bucket: Bucket, field: String },
    /// The patch was not a JSON object
    InvalidPatch(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingField(field) => {
                write!(f, "Missing required field: {}", field)
            }
            ValidationError::InvalidValue { field, message } => {
                write!(f, "Invalid value for '{}': {}", field, message)
            }
            ValidationError::Immutable(bucket) => {
                write!(f, "Records in '{}' cannot be modified", bucket)
            }
            ValidationError::FieldNotPatchable { bucket, field } => {
                write!(f, "Field '{}' of '{}' cannot be modified", field, bucket)
            }
            ValidationError::InvalidPatch(e) => write!(f, "Invalid patch: {}", e),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Rejects blank values for a required text field.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// Checks that a patch only touches fields the record type allows to change.
pub fn check_patch<T: Record>(patch: &serde_json::Value) -> Result<(), ValidationError> {
    let fields = patch.as_object().ok_or_else(|| {
        ValidationError::InvalidPatch("patch must be a JSON object".to_string())
    })?;

    let Some(allowed) = T::PATCHABLE else {
        return Ok(());
    };

    if allowed.is_empty() {
        return Err(ValidationError::Immutable(T::BUCKET));
    }

    for key in fields.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ValidationError::FieldNotPatchable {
                bucket: T::BUCKET,
                field: key.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(
            require("name", "   "),
            Err(ValidationError::MissingField("name"))
        );
        assert!(require("name", "Ana").is_ok());
    }

    #[test]
    fn test_missing_field_message_names_field() {
        let err = ValidationError::MissingField("student_name");
        assert_eq!(err.to_string(), "Missing required field: student_name");
    }
}
