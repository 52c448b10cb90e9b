//! Relationship edges between activities.
//!
//! Every edge is stored twice, once on each endpoint. The copies are never
//! written independently; see [`crate::mutation`].

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// The kind of a relationship edge, as seen from the activity it lives on.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationshipKind {
  /// The owning activity holds the key field.
  BelongsTo,
  /// The owning activity holds the field a key points at.
  HasMany,
  HasOne,
}

/// One side of a relationship between two activities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRelationship {
  pub relationship_id:     Uuid,
  pub kind:                RelationshipKind,
  /// The activity this edge record lives on.
  pub activity_id:         Uuid,
  /// The activity at the other end.
  pub related_activity_id: Uuid,
  pub field_id:            Uuid,
  /// The field on the other side that this edge corresponds to.
  pub concerned_field_id:  Uuid,
}

impl ActivityRelationship {
  /// The `belongs_to` edge recorded on `activity_id` for key field
  /// `key_field_id` pointing at `target_field_id` on `target_activity_id`.
  pub fn belongs_to(
    activity_id: Uuid,
    key_field_id: Uuid,
    target_activity_id: Uuid,
    target_field_id: Uuid,
  ) -> Self {
    Self {
      relationship_id:     Uuid::new_v4(),
      kind:                RelationshipKind::BelongsTo,
      activity_id,
      related_activity_id: target_activity_id,
      field_id:            target_field_id,
      concerned_field_id:  key_field_id,
    }
  }

  /// The counterpart of this edge, as recorded on the other activity.
  pub fn mirror(&self) -> Self {
    let kind = match self.kind {
      RelationshipKind::BelongsTo => RelationshipKind::HasMany,
      RelationshipKind::HasMany | RelationshipKind::HasOne => {
        RelationshipKind::BelongsTo
      }
    };
    Self {
      relationship_id: Uuid::new_v4(),
      kind,
      activity_id: self.related_activity_id,
      related_activity_id: self.activity_id,
      field_id: self.concerned_field_id,
      concerned_field_id: self.field_id,
    }
  }

  /// Edge identity ignores `relationship_id`.
  pub fn same_edge(&self, other: &Self) -> bool {
    self.kind == other.kind
      && self.activity_id == other.activity_id
      && self.field_id == other.field_id
      && self.concerned_field_id == other.concerned_field_id
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn kind_names_are_snake_case_everywhere() {
    assert_eq!(RelationshipKind::BelongsTo.to_string(), "belongs_to");
    assert_eq!(RelationshipKind::HasMany.as_ref(), "has_many");
    assert_eq!(
      serde_json::to_value(RelationshipKind::HasOne).unwrap(),
      serde_json::json!("has_one")
    );
    assert_eq!(
      RelationshipKind::from_str("has_many").unwrap(),
      RelationshipKind::HasMany
    );
    assert!(RelationshipKind::from_str("belongs-to").is_err());
  }

  #[test]
  fn mirror_swaps_sides() {
    let (a, f, b, g) =
      (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let edge = ActivityRelationship::belongs_to(a, f, b, g);
    let mirror = edge.mirror();

    assert_eq!(mirror.kind, RelationshipKind::HasMany);
    assert_eq!(mirror.activity_id, b);
    assert_eq!(mirror.related_activity_id, a);
    assert_eq!(mirror.field_id, f);
    assert_eq!(mirror.concerned_field_id, g);
    assert!(mirror.mirror().same_edge(&edge));
  }

  #[test]
  fn same_edge_ignores_id() {
    let edge = ActivityRelationship::belongs_to(
      Uuid::new_v4(),
      Uuid::new_v4(),
      Uuid::new_v4(),
      Uuid::new_v4(),
    );
    let mut copy = edge.clone();
    copy.relationship_id = Uuid::new_v4();
    assert!(edge.same_edge(&copy));
    copy.kind = RelationshipKind::HasOne;
    assert!(!edge.same_edge(&copy));
  }
}
