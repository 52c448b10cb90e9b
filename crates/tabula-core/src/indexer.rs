//! Relationship indexer: works out which edges a field mutation adds and
//! removes. Pure; the writes are performed by [`crate::mutation`].

use crate::{
  activity::{Activity, ActivityField, FieldType},
  details::FieldDetails,
  relationship::{ActivityRelationship, RelationshipKind},
};

/// Edge writes implied by one field mutation. Removals are applied before
/// additions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipDelta {
  pub to_remove: Vec<ActivityRelationship>,
  pub to_add:    Vec<ActivityRelationship>,
}

impl RelationshipDelta {
  pub fn is_empty(&self) -> bool {
    self.to_remove.is_empty() && self.to_add.is_empty()
  }

  fn remove_pair(&mut self, edge: &ActivityRelationship) {
    self.to_remove.push(edge.clone());
    self.to_remove.push(edge.mirror());
  }
}

/// The `belongs_to` edge currently recorded for `field` on `activity`.
///
/// Only `belongs_to` edges are considered: a `has_many` edge whose
/// `concerned_field_id` equals the field id belongs to some other activity's
/// key pointing at this field.
pub fn existing_edge<'a>(
  activity: &'a Activity,
  field: &ActivityField,
) -> Option<&'a ActivityRelationship> {
  activity.relationships.iter().find(|e| {
    e.kind == RelationshipKind::BelongsTo
      && e.activity_id == activity.activity_id
      && e.concerned_field_id == field.field_id
  })
}

/// Edges to add and remove when `field` of `activity` takes `new_type` and
/// `new_details`.
///
/// `activity` is the caller's snapshot; it is not re-read. A field losing its
/// key typing without any recorded edge yields an empty delta.
pub fn compute_delta(
  activity: &Activity,
  field: &ActivityField,
  new_type: &FieldType,
  new_details: &FieldDetails,
) -> RelationshipDelta {
  let mut delta = RelationshipDelta::default();
  let existing = existing_edge(activity, field);

  let target = match (new_type, new_details) {
    (FieldType::Key, FieldDetails::Key(key)) => key.target(),
    _ => None,
  };

  match target {
    Some((target_activity, target_field)) => {
      if let Some(edge) = existing {
        delta.remove_pair(edge);
      }
      let edge = ActivityRelationship::belongs_to(
        activity.activity_id,
        field.field_id,
        target_activity,
        target_field,
      );
      let mirror = edge.mirror();
      delta.to_add.push(edge);
      delta.to_add.push(mirror);
    }
    None => {
      if let Some(edge) = existing {
        delta.remove_pair(edge);
      }
    }
  }

  delta
}

/// Edges to remove before `field` is spliced out of `activity`.
pub fn delta_for_removal(
  activity: &Activity,
  field: &ActivityField,
) -> RelationshipDelta {
  let mut delta = RelationshipDelta::default();
  if let Some(edge) = existing_edge(activity, field) {
    delta.remove_pair(edge);
  }
  delta
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::{activity::NewField, details::KeyDetails};

  fn activity(fields: Vec<ActivityField>) -> Activity {
    Activity {
      activity_id: Uuid::new_v4(),
      organization_id: Uuid::new_v4(),
      created_by: Uuid::new_v4(),
      name: "Orders".into(),
      description: None,
      fields,
      relationships: vec![],
      created_at: Utc::now(),
      updated_at: Utc::now(),
      deleted_at: None,
    }
  }

  fn text_field(code: &str) -> ActivityField {
    NewField::new(code, FieldType::from("text"), code).into_field()
  }

  #[test]
  fn key_details_add_a_mirrored_pair() {
    let a = activity(vec![text_field("customer")]);
    let f = a.fields[0].clone();
    let (b, g) = (Uuid::new_v4(), Uuid::new_v4());

    let delta = compute_delta(
      &a,
      &f,
      &FieldType::Key,
      &FieldDetails::Key(KeyDetails::new(b, g)),
    );

    assert!(delta.to_remove.is_empty());
    assert_eq!(delta.to_add.len(), 2);
    let (own, other) = (&delta.to_add[0], &delta.to_add[1]);
    assert_eq!(own.kind, RelationshipKind::BelongsTo);
    assert_eq!(own.activity_id, a.activity_id);
    assert_eq!(own.field_id, g);
    assert_eq!(own.concerned_field_id, f.field_id);
    assert_eq!(other.kind, RelationshipKind::HasMany);
    assert_eq!(other.activity_id, b);
    assert_eq!(other.field_id, f.field_id);
    assert_eq!(other.concerned_field_id, g);
  }

  #[test]
  fn retargeting_removes_the_old_pair_first() {
    let mut a = activity(vec![text_field("customer")]);
    let f = a.fields[0].clone();
    let (b, g) = (Uuid::new_v4(), Uuid::new_v4());
    let old = ActivityRelationship::belongs_to(a.activity_id, f.field_id, b, g);
    a.relationships.push(old.clone());

    let (c, h) = (Uuid::new_v4(), Uuid::new_v4());
    let delta = compute_delta(
      &a,
      &f,
      &FieldType::Key,
      &FieldDetails::Key(KeyDetails::new(c, h)),
    );

    assert_eq!(delta.to_remove.len(), 2);
    assert!(delta.to_remove[0].same_edge(&old));
    assert_eq!(delta.to_remove[1].activity_id, b);
    assert_eq!(delta.to_add[1].activity_id, c);
  }

  #[test]
  fn losing_key_type_removes_the_pair() {
    let mut a = activity(vec![text_field("customer")]);
    let f = a.fields[0].clone();
    a.relationships.push(ActivityRelationship::belongs_to(
      a.activity_id,
      f.field_id,
      Uuid::new_v4(),
      Uuid::new_v4(),
    ));

    let number = FieldType::from("number");
    let delta =
      compute_delta(&a, &f, &number, &FieldDetails::for_type(&number));
    assert_eq!(delta.to_remove.len(), 2);
    assert!(delta.to_add.is_empty());
  }

  #[test]
  fn losing_key_type_without_edge_is_empty() {
    let a = activity(vec![text_field("customer")]);
    let number = FieldType::from("number");
    let delta =
      compute_delta(&a, &a.fields[0], &number, &FieldDetails::None);
    assert!(delta.is_empty());
  }

  #[test]
  fn scalar_transitions_are_empty() {
    let a = activity(vec![text_field("notes")]);
    let text = FieldType::from("text");
    assert!(compute_delta(&a, &a.fields[0], &text, &FieldDetails::None).is_empty());
  }

  #[test]
  fn incomplete_key_details_add_nothing() {
    let a = activity(vec![text_field("customer")]);
    let details = FieldDetails::Key(KeyDetails {
      activity_id: Some(Uuid::new_v4()),
      ..KeyDetails::default()
    });
    assert!(compute_delta(&a, &a.fields[0], &FieldType::Key, &details).is_empty());
  }

  #[test]
  fn incoming_edges_are_not_mistaken_for_own_key() {
    // A has_many edge concerning this field id is another activity's key.
    let mut a = activity(vec![text_field("notes")]);
    let f = a.fields[0].clone();
    let incoming = ActivityRelationship::belongs_to(
      Uuid::new_v4(),
      f.field_id,
      a.activity_id,
      Uuid::new_v4(),
    )
    .mirror();
    let mut colliding = incoming.clone();
    colliding.concerned_field_id = f.field_id;
    a.relationships.push(colliding);

    assert!(delta_for_removal(&a, &f).is_empty());
  }
}
