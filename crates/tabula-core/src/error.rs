//! Error types for `tabula-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("activity not found: {0}")]
  ActivityNotFound(Uuid),

  #[error("field {field} not found on activity {activity_id}")]
  FieldNotFound {
    activity_id: Uuid,
    /// Position or id of the missing field, as the caller addressed it.
    field:       String,
  },

  #[error("invalid field path: {0:?}")]
  InvalidFieldPath(String),

  #[error("invalid value for {path:?}: {reason}")]
  InvalidFieldValue { path: String, reason: String },

  #[error("details of kind {details} do not fit field type {field_type:?}")]
  DetailsMismatch {
    field_type: String,
    details:    &'static str,
  },

  #[error("field code {0:?} is already used on this activity")]
  DuplicateCode(String),

  #[error("key details name field {given} but field {expected} is being updated")]
  KeyFieldMismatch { expected: Uuid, given: Uuid },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
