use serde::{Deserialize, Serialize};

use super::domain::AdDraft;

pub const REQUIRED_FIELDS_MESSAGE: &str =
    "Please fill in all required fields: title, description, relationship status and location";
pub const LOOKING_FOR_MESSAGE: &str = "Please select at least one option in Looking For";
pub const MEDIA_REQUIRED_MESSAGE: &str = "At least one photo or video required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    Title,
    Description,
    RelationshipStatus,
    Location,
    LookingFor,
    AgeRange,
    Media,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: DraftField,
    pub message: String,
}

impl FieldError {
    fn new(field: DraftField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Field-level validation failure. Holds one error for the final gate and
/// every failing field for step feedback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; "))]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn for_field(field: DraftField, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|error| error.message.clone()).collect()
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Final submit gate. Short-circuits and reports only the first failure:
/// required scalars, then Looking For, then media.
pub fn validate_for_submit(draft: &AdDraft) -> Result<(), ValidationError> {
    let missing_scalar = if is_blank(&draft.title) {
        Some(DraftField::Title)
    } else if is_blank(&draft.description) {
        Some(DraftField::Description)
    } else if draft.relationship_status.is_none() {
        Some(DraftField::RelationshipStatus)
    } else if is_blank(&draft.location) {
        Some(DraftField::Location)
    } else {
        None
    };
    if let Some(field) = missing_scalar {
        return Err(ValidationError::for_field(field, REQUIRED_FIELDS_MESSAGE));
    }

    if draft.looking_for.is_empty() {
        return Err(ValidationError::for_field(
            DraftField::LookingFor,
            LOOKING_FOR_MESSAGE,
        ));
    }

    if !draft.has_media() {
        return Err(ValidationError::for_field(
            DraftField::Media,
            MEDIA_REQUIRED_MESSAGE,
        ));
    }

    Ok(())
}

/// Live feedback for the Basic Info step. Every field is checked and all
/// failures are returned.
pub fn validate_basic_info(draft: &AdDraft) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if is_blank(&draft.title) {
        errors.push(FieldError::new(DraftField::Title, "Title is required"));
    }
    if is_blank(&draft.description) {
        errors.push(FieldError::new(
            DraftField::Description,
            "Description is required",
        ));
    }
    if is_blank(&draft.location) {
        errors.push(FieldError::new(DraftField::Location, "Location is required"));
    }
    if draft.looking_for.is_empty() {
        errors.push(FieldError::new(DraftField::LookingFor, LOOKING_FOR_MESSAGE));
    }

    errors
}
