//! Consistency check for the duplicated relationship edges.
//!
//! Re-derives the edge pair every key field should have and compares it with
//! what is recorded on both activities.

use std::fmt;

use uuid::Uuid;

use crate::{
  activity::{Activity, FieldType},
  details::KeyDetails,
  relationship::{ActivityRelationship, RelationshipKind},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeViolation {
  /// A key field with a complete target has no `belongs_to` edge.
  MissingEdge { activity_id: Uuid, field_id: Uuid },
  /// The counterpart of an edge is absent from the other activity.
  MissingMirror { edge: ActivityRelationship },
  /// The same edge is recorded more than once on one activity.
  DuplicateEdge { edge: ActivityRelationship },
  /// A `belongs_to` edge no key field accounts for.
  OrphanEdge { edge: ActivityRelationship },
  /// A `belongs_to` edge whose target field no longer exists.
  DanglingEdge { edge: ActivityRelationship },
  /// A key field whose target field no longer exists.
  DanglingKey {
    activity_id:     Uuid,
    field_id:        Uuid,
    target_field_id: Uuid,
  },
}

impl fmt::Display for EdgeViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::MissingEdge { activity_id, field_id } => {
        write!(f, "key field {field_id} of {activity_id} has no edge")
      }
      Self::MissingMirror { edge } => write!(
        f,
        "{} edge on {} has no counterpart on {}",
        edge.kind, edge.activity_id, edge.related_activity_id
      ),
      Self::DuplicateEdge { edge } => {
        write!(f, "{} edge on {} is recorded twice", edge.kind, edge.activity_id)
      }
      Self::OrphanEdge { edge } => write!(
        f,
        "{} edge on {} concerns no key field",
        edge.kind, edge.activity_id
      ),
      Self::DanglingEdge { edge } => write!(
        f,
        "{} edge on {} points at missing field {} of {}",
        edge.kind, edge.activity_id, edge.field_id, edge.related_activity_id
      ),
      Self::DanglingKey { activity_id, field_id, target_field_id } => write!(
        f,
        "key field {field_id} of {activity_id} targets missing field {target_field_id}"
      ),
    }
  }
}

/// Check every edge on `activities`. Edges pointing at activities outside the
/// slice are reported as missing mirrors; target fields are only checked on
/// activities inside the slice.
pub fn check_edges(activities: &[Activity]) -> Vec<EdgeViolation> {
  let mut violations = Vec::new();
  let find = |id: Uuid| activities.iter().find(|a| a.activity_id == id);
  let field_missing = |activity_id: Uuid, field_id: Uuid| {
    find(activity_id).is_some_and(|a| a.field_by_id(field_id).is_none())
  };

  for activity in activities {
    for (i, edge) in activity.relationships.iter().enumerate() {
      if activity.relationships[..i].iter().any(|e| e.same_edge(edge)) {
        violations.push(EdgeViolation::DuplicateEdge { edge: edge.clone() });
        continue;
      }

      let mirror = edge.mirror();
      let mirrored = find(edge.related_activity_id)
        .is_some_and(|other| other.relationships.iter().any(|e| e.same_edge(&mirror)));
      if !mirrored {
        violations.push(EdgeViolation::MissingMirror { edge: edge.clone() });
      }

      if edge.kind == RelationshipKind::BelongsTo {
        let accounted = activity.field_by_id(edge.concerned_field_id).is_some_and(|f| {
          f.field_type == FieldType::Key
            && f.details.as_key().and_then(KeyDetails::target)
              == Some((edge.related_activity_id, edge.field_id))
        });
        if !accounted {
          violations.push(EdgeViolation::OrphanEdge { edge: edge.clone() });
        }
        if field_missing(edge.related_activity_id, edge.field_id) {
          violations.push(EdgeViolation::DanglingEdge { edge: edge.clone() });
        }
      }
    }

    for field in &activity.fields {
      let Some((target_activity, target_field)) =
        field.details.as_key().and_then(KeyDetails::target)
      else {
        continue;
      };
      if field_missing(target_activity, target_field) {
        violations.push(EdgeViolation::DanglingKey {
          activity_id:     activity.activity_id,
          field_id:        field.field_id,
          target_field_id: target_field,
        });
      }
      let expected = ActivityRelationship::belongs_to(
        activity.activity_id,
        field.field_id,
        target_activity,
        target_field,
      );
      if !activity.relationships.iter().any(|e| e.same_edge(&expected)) {
        violations.push(EdgeViolation::MissingEdge {
          activity_id: activity.activity_id,
          field_id:    field.field_id,
        });
      }
    }
  }

  violations
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{activity::NewField, details::FieldDetails};

  fn activity(fields: Vec<crate::activity::ActivityField>) -> Activity {
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

  fn linked() -> (Activity, Activity) {
    let mut b = activity(vec![
      NewField::new("Email", FieldType::from("text"), "email").into_field(),
    ]);
    let g = b.fields[0].field_id;
    let mut a = activity(vec![
      NewField::new("Customer", FieldType::Key, "customer")
        .with_details(FieldDetails::Key(KeyDetails::new(b.activity_id, g)))
        .into_field(),
    ]);
    let edge = ActivityRelationship::belongs_to(
      a.activity_id,
      a.fields[0].field_id,
      b.activity_id,
      g,
    );
    b.relationships.push(edge.mirror());
    a.relationships.push(edge);
    (a, b)
  }

  #[test]
  fn consistent_pair_has_no_violations() {
    let (a, b) = linked();
    assert!(check_edges(&[a, b]).is_empty());
  }

  #[test]
  fn missing_mirror_is_reported() {
    let (a, mut b) = linked();
    b.relationships.clear();
    let violations = check_edges(&[a, b]);
    assert_eq!(violations.len(), 1);
    assert!(matches!(violations[0], EdgeViolation::MissingMirror { .. }));
  }

  #[test]
  fn key_field_without_edge_is_reported() {
    let (mut a, mut b) = linked();
    a.relationships.clear();
    b.relationships.clear();
    assert_eq!(check_edges(&[a.clone(), b]), vec![EdgeViolation::MissingEdge {
      activity_id: a.activity_id,
      field_id:    a.fields[0].field_id,
    }]);
  }

  #[test]
  fn duplicates_and_orphans_are_reported() {
    let (mut a, b) = linked();
    let mut copy = a.relationships[0].clone();
    copy.relationship_id = Uuid::new_v4();
    a.relationships.push(copy);
    a.fields[0].details = FieldDetails::Key(KeyDetails::default());

    let violations = check_edges(&[a, b]);
    assert!(violations.iter().any(|v| matches!(v, EdgeViolation::DuplicateEdge { .. })));
    assert!(violations.iter().any(|v| matches!(v, EdgeViolation::OrphanEdge { .. })));
  }

  #[test]
  fn removed_target_field_is_reported() {
    let (a, mut b) = linked();
    let g = b.fields.remove(0).field_id;

    let violations = check_edges(&[a.clone(), b]);
    assert_eq!(violations.len(), 2);
    assert!(matches!(
      &violations[0],
      EdgeViolation::DanglingEdge { edge } if edge.field_id == g
    ));
    assert_eq!(violations[1], EdgeViolation::DanglingKey {
      activity_id:     a.activity_id,
      field_id:        a.fields[0].field_id,
      target_field_id: g,
    });
  }

  #[test]
  fn targets_outside_the_slice_are_not_dangling() {
    let (a, _) = linked();
    let violations = check_edges(&[a]);
    assert_eq!(violations.len(), 1);
    assert!(matches!(violations[0], EdgeViolation::MissingMirror { .. }));
  }
}
