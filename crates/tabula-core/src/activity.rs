//! Activities — organization-defined record schemas.
//!
//! An activity owns its fields and its relationship edges as embedded
//! sequences; there is no separate collection for either. Activities are
//! soft-deleted only.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{details::FieldDetails, relationship::ActivityRelationship};

// ─── Field type tag ──────────────────────────────────────────────────────────

/// The type tag of a field. Three tags carry structured details; every other
/// tag (text, number, date, ...) is a scalar type without details.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
  MultipleChoices,
  Key,
  Upload,
  Scalar(String),
}

impl FieldType {
  pub const MULTIPLE_CHOICES: &'static str = "multiple-choices";
  pub const KEY: &'static str = "key";
  pub const UPLOAD: &'static str = "upload";

  pub fn as_str(&self) -> &str {
    match self {
      Self::MultipleChoices => Self::MULTIPLE_CHOICES,
      Self::Key => Self::KEY,
      Self::Upload => Self::UPLOAD,
      Self::Scalar(tag) => tag,
    }
  }

  pub fn is_key(&self) -> bool { matches!(self, Self::Key) }
}

impl From<&str> for FieldType {
  fn from(tag: &str) -> Self {
    match tag {
      Self::MULTIPLE_CHOICES => Self::MultipleChoices,
      Self::KEY => Self::Key,
      Self::UPLOAD => Self::Upload,
      other => Self::Scalar(other.to_owned()),
    }
  }
}

impl From<String> for FieldType {
  fn from(tag: String) -> Self { Self::from(tag.as_str()) }
}

impl From<FieldType> for String {
  fn from(t: FieldType) -> Self { t.as_str().to_owned() }
}

impl fmt::Display for FieldType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// Per-field options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOptions {
  /// Whether a data record may hold several values for this field.
  pub multiple:  bool,
  /// Whether the value is generated automatically.
  pub auto:      bool,
  pub default:   Option<serde_json::Value>,
  pub reference: Option<String>,
}

/// One field of an activity's schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityField {
  pub field_id:    Uuid,
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(rename = "type")]
  pub field_type:  FieldType,
  #[serde(default)]
  pub primary_key: bool,
  #[serde(default)]
  pub options:     FieldOptions,
  /// Stable external identifier; data records key their values by it.
  #[serde(default)]
  pub code:        String,
  #[serde(default)]
  pub details:     FieldDetails,
}

/// Input to [`crate::store::ActivityStore::add_field`].
#[derive(Debug, Clone)]
pub struct NewField {
  pub name:        String,
  pub description: Option<String>,
  pub field_type:  FieldType,
  pub primary_key: bool,
  pub options:     FieldOptions,
  pub code:        String,
  /// Defaults to [`FieldDetails::for_type`] of `field_type` when absent.
  pub details:     Option<FieldDetails>,
}

impl NewField {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(
    name: impl Into<String>,
    field_type: FieldType,
    code: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      description: None,
      field_type,
      primary_key: false,
      options: FieldOptions::default(),
      code: code.into(),
      details: None,
    }
  }

  pub fn with_details(mut self, details: FieldDetails) -> Self {
    self.details = Some(details);
    self
  }

  /// Assign a fresh id and resolve the details variant.
  pub fn into_field(self) -> ActivityField {
    let details = self
      .details
      .unwrap_or_else(|| FieldDetails::for_type(&self.field_type));
    ActivityField {
      field_id: Uuid::new_v4(),
      name: self.name,
      description: self.description,
      field_type: self.field_type,
      primary_key: self.primary_key,
      options: self.options,
      code: self.code,
      details,
    }
  }
}

// ─── Activity ────────────────────────────────────────────────────────────────

/// A record schema owned by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
  pub activity_id:     Uuid,
  pub organization_id: Uuid,
  pub created_by:      Uuid,
  pub name:            String,
  pub description:     Option<String>,
  pub fields:          Vec<ActivityField>,
  pub relationships:   Vec<ActivityRelationship>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
  pub deleted_at:      Option<DateTime<Utc>>,
}

impl Activity {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }

  pub fn field_by_id(&self, field_id: Uuid) -> Option<&ActivityField> {
    self.fields.iter().find(|f| f.field_id == field_id)
  }

  /// Whether another field than `except` already uses `code`. Empty codes
  /// never collide.
  pub fn code_taken(&self, code: &str, except: Option<Uuid>) -> bool {
    !code.is_empty()
      && self
        .fields
        .iter()
        .any(|f| f.code == code && Some(f.field_id) != except)
  }
}

/// Input to [`crate::store::ActivityStore::create_activity`].
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub organization_id: Uuid,
  pub created_by:      Uuid,
  pub name:            String,
  pub description:     Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_type_tags_round_trip_through_strings() {
    for tag in ["multiple-choices", "key", "upload", "text", "number"] {
      let t = FieldType::from(tag);
      assert_eq!(t.as_str(), tag);
      let json = serde_json::to_value(&t).unwrap();
      assert_eq!(json, serde_json::json!(tag));
    }
    assert_eq!(FieldType::from("key"), FieldType::Key);
    assert_eq!(FieldType::from("date"), FieldType::Scalar("date".into()));
  }

  #[test]
  fn new_field_resolves_details_from_type() {
    let field = NewField::new("Customer", FieldType::Key, "customer").into_field();
    assert!(matches!(field.details, FieldDetails::Key(_)));

    let field = NewField::new("Notes", FieldType::from("text"), "notes").into_field();
    assert_eq!(field.details, FieldDetails::None);
  }

  #[test]
  fn empty_codes_never_collide() {
    let a = NewField::new("A", FieldType::from("text"), "").into_field();
    let b = NewField::new("B", FieldType::from("text"), "b").into_field();
    let activity = Activity {
      activity_id:     Uuid::new_v4(),
      organization_id: Uuid::new_v4(),
      created_by:      Uuid::new_v4(),
      name:            "Orders".into(),
      description:     None,
      fields:          vec![a, b.clone()],
      relationships:   vec![],
      created_at:      Utc::now(),
      updated_at:      Utc::now(),
      deleted_at:      None,
    };
    assert!(!activity.code_taken("", None));
    assert!(activity.code_taken("b", None));
    assert!(!activity.code_taken("b", Some(b.field_id)));
  }
}
