//! Field details — the structured configuration attached to a field,
//! selected by its type tag.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{Error, Result, activity::FieldType};

/// Allowed values of a `multiple-choices` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultipleChoicesDetails {
  pub multiple: bool,
  pub choices:  Vec<String>,
}

/// Target of a `key` field.
///
/// Both target ids are optional: a field that was just typed `key` has no
/// target yet, and produces no relationship until both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyDetails {
  /// The activity this field points into.
  pub activity_id:  Option<Uuid>,
  /// The field on `activity_id` this field points at.
  pub field_id:     Option<Uuid>,
  /// Only meaningful on a mutation payload: the field of the current
  /// activity being made a key. Never persisted.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field_to_use: Option<Uuid>,
}

impl KeyDetails {
  pub fn new(activity_id: Uuid, field_id: Uuid) -> Self {
    Self {
      activity_id:  Some(activity_id),
      field_id:     Some(field_id),
      field_to_use: None,
    }
  }

  /// `(activity_id, field_id)` once both are known.
  pub fn target(&self) -> Option<(Uuid, Uuid)> {
    self.activity_id.zip(self.field_id)
  }
}

/// Constraints of an `upload` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadDetails {
  pub file_types: Vec<String>,
  pub max_files:  u32,
}

/// Exactly one branch is populated, governed by the field's type tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldDetails {
  /// Scalar types (text, number, date, ...) carry no details.
  #[default]
  None,
  MultipleChoices(MultipleChoicesDetails),
  Key(KeyDetails),
  Upload(UploadDetails),
}

impl FieldDetails {
  /// The empty details variant for a type tag. Unrecognised tags resolve to
  /// [`FieldDetails::None`].
  pub fn for_type(field_type: &FieldType) -> Self {
    match field_type {
      FieldType::MultipleChoices => {
        Self::MultipleChoices(MultipleChoicesDetails::default())
      }
      FieldType::Key => Self::Key(KeyDetails::default()),
      FieldType::Upload => Self::Upload(UploadDetails::default()),
      FieldType::Scalar(_) => Self::None,
    }
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Self::None => "none",
      Self::MultipleChoices(_) => "multiple_choices",
      Self::Key(_) => "key",
      Self::Upload(_) => "upload",
    }
  }

  pub fn matches_type(&self, field_type: &FieldType) -> bool {
    matches!(
      (self, field_type),
      (Self::None, FieldType::Scalar(_))
        | (Self::MultipleChoices(_), FieldType::MultipleChoices)
        | (Self::Key(_), FieldType::Key)
        | (Self::Upload(_), FieldType::Upload)
    )
  }

  pub fn as_key(&self) -> Option<&KeyDetails> {
    match self {
      Self::Key(k) => Some(k),
      _ => None,
    }
  }

  /// Parse a bare JSON payload into the branch governed by `field_type`.
  pub fn decode(field_type: &FieldType, value: Value) -> Result<Self> {
    Ok(match field_type {
      FieldType::MultipleChoices => {
        Self::MultipleChoices(serde_json::from_value(value)?)
      }
      FieldType::Key => Self::Key(serde_json::from_value(value)?),
      FieldType::Upload => Self::Upload(serde_json::from_value(value)?),
      FieldType::Scalar(tag) => match value {
        Value::Null => Self::None,
        Value::Object(map) if map.is_empty() => Self::None,
        _ => {
          return Err(Error::DetailsMismatch {
            field_type: tag.clone(),
            details:    "payload",
          });
        }
      },
    })
  }

  /// Ensure the variant agrees with `field_type`.
  pub fn check_type(&self, field_type: &FieldType) -> Result<()> {
    if self.matches_type(field_type) {
      Ok(())
    } else {
      Err(Error::DetailsMismatch {
        field_type: field_type.to_string(),
        details:    self.kind(),
      })
    }
  }
}
