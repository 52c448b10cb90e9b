//! The mutation coordinator: the only code path that changes an activity's
//! fields, and therefore the only one that writes relationship edges.
//!
//! Every operation runs against an explicit [`ActivityTransaction`] handle and
//! follows the same stages:
//!
//! ```text
//! started → delta_computed → edges_removed → edges_added → field_written → committed
//! ```
//!
//! Any error moves the mutation to `aborted` and the transaction is rolled
//! back, so the edge writes and the field write land together or not at all.

use serde_json::Value;
use strum::Display;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  activity::{Activity, ActivityField, FieldType, NewField},
  details::{FieldDetails, KeyDetails},
  indexer::{self, RelationshipDelta},
  path::{FieldLeaf, FieldPath},
  relationship::ActivityRelationship,
};

// ─── Persistence gateway seam ────────────────────────────────────────────────

/// A transaction on the activity document store.
///
/// All reads and writes are scoped to one organization and ignore
/// soft-deleted activities. Dropping a transaction without calling
/// [`commit`](Self::commit) must discard its writes.
pub trait ActivityTransaction: Sized {
  type Error: From<Error> + std::fmt::Display;

  fn find_activity(
    &mut self,
    organization_id: Uuid,
    activity_id: Uuid,
  ) -> Result<Option<Activity>, Self::Error>;

  /// Append `edge` to the relationships of `edge.activity_id`. An identical
  /// edge already present is left as is.
  fn push_relationship(
    &mut self,
    organization_id: Uuid,
    edge: &ActivityRelationship,
  ) -> Result<(), Self::Error>;

  /// Remove every edge of `edge.activity_id` that is the
  /// [same edge](ActivityRelationship::same_edge) as `edge`. No match is not
  /// an error.
  fn pull_relationship(
    &mut self,
    organization_id: Uuid,
    edge: &ActivityRelationship,
  ) -> Result<(), Self::Error>;

  /// Append a field; returns the updated activity.
  fn push_field(
    &mut self,
    organization_id: Uuid,
    activity_id: Uuid,
    field: &ActivityField,
  ) -> Result<Activity, Self::Error>;

  /// Replace the field at `position`, which must still carry
  /// `field.field_id`; returns the updated activity.
  fn set_field(
    &mut self,
    organization_id: Uuid,
    activity_id: Uuid,
    position: usize,
    field: &ActivityField,
  ) -> Result<Activity, Self::Error>;

  /// Splice out the field at `position`, which must still carry `field_id`;
  /// returns the updated activity.
  fn remove_field(
    &mut self,
    organization_id: Uuid,
    activity_id: Uuid,
    position: usize,
    field_id: Uuid,
  ) -> Result<Activity, Self::Error>;

  fn commit(self) -> Result<(), Self::Error>;

  fn abort(self) -> Result<(), Self::Error>;
}

// ─── Requests ────────────────────────────────────────────────────────────────

/// Input to [`update_field_set`].
#[derive(Debug, Clone)]
pub struct FieldSet {
  /// `fields.<position>[.<leaf>]`
  pub path:    String,
  pub value:   Value,
  /// Typed details to use instead of decoding them from `value`. For a
  /// `type` path these become the field's new details.
  pub details: Option<FieldDetails>,
}

impl FieldSet {
  pub fn new(path: impl Into<String>, value: Value) -> Self {
    Self { path: path.into(), value, details: None }
  }

  pub fn with_details(mut self, details: FieldDetails) -> Self {
    self.details = Some(details);
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MutationStage {
  Started,
  DeltaComputed,
  EdgesRemoved,
  EdgesAdded,
  FieldWritten,
  Committed,
  Aborted,
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Set one nested path of a field, maintaining the field's relationship
/// edges on both activities.
///
/// `activity` is the caller's snapshot; the edges to remove are looked up in
/// it rather than re-read inside the transaction.
pub fn update_field_set<T: ActivityTransaction>(
  tx: T,
  activity: &Activity,
  organization_id: Uuid,
  set: FieldSet,
) -> Result<Activity, T::Error> {
  run(tx, "update_field_set", activity.activity_id, |tx| {
    ensure_scope(activity, organization_id)?;
    let path = FieldPath::parse(&set.path)?;
    let field = activity.fields.get(path.position).ok_or_else(|| {
      Error::FieldNotFound {
        activity_id: activity.activity_id,
        field:       path.to_string(),
      }
    })?;

    let next = plan_field_set(activity, field, path, set.value, set.details)?;
    let delta = if path.touches_relationships() {
      indexer::compute_delta(activity, field, &next.field_type, &next.details)
    } else {
      RelationshipDelta::default()
    };
    stage(activity.activity_id, MutationStage::DeltaComputed, &delta);

    if !delta.to_add.is_empty() {
      check_key_target(tx, organization_id, activity, &next)?;
    }
    apply_delta(tx, organization_id, activity.activity_id, &delta)?;

    let updated = tx.set_field(
      organization_id,
      activity.activity_id,
      path.position,
      &next,
    )?;
    stage(activity.activity_id, MutationStage::FieldWritten, &delta);
    Ok(updated)
  })
}

/// Remove the field at `position`, together with its relationship edges.
///
/// The field must be named `field_name`, guarding against a stale position.
pub fn update_field_remove<T: ActivityTransaction>(
  tx: T,
  activity: &Activity,
  organization_id: Uuid,
  position: usize,
  field_name: &str,
) -> Result<Activity, T::Error> {
  run(tx, "update_field_remove", activity.activity_id, |tx| {
    ensure_scope(activity, organization_id)?;
    let field = activity
      .fields
      .get(position)
      .filter(|f| f.name == field_name)
      .ok_or_else(|| Error::FieldNotFound {
        activity_id: activity.activity_id,
        field:       format!("{field_name:?} at position {position}"),
      })?;

    let delta = indexer::delta_for_removal(activity, field);
    stage(activity.activity_id, MutationStage::DeltaComputed, &delta);
    apply_delta(tx, organization_id, activity.activity_id, &delta)?;

    let updated = tx.remove_field(
      organization_id,
      activity.activity_id,
      position,
      field.field_id,
    )?;
    stage(activity.activity_id, MutationStage::FieldWritten, &delta);
    Ok(updated)
  })
}

/// Append a new field. A key field with a complete target gets its edge pair
/// in the same transaction.
pub fn add_field<T: ActivityTransaction>(
  tx: T,
  activity: &Activity,
  organization_id: Uuid,
  new_field: NewField,
) -> Result<Activity, T::Error> {
  run(tx, "add_field", activity.activity_id, |tx| {
    ensure_scope(activity, organization_id)?;
    let mut field = new_field.into_field();
    field.details.check_type(&field.field_type)?;
    if activity.code_taken(&field.code, None) {
      return Err(Error::DuplicateCode(field.code).into());
    }
    // The new id cannot be known to the caller.
    if let FieldDetails::Key(key) = &mut field.details {
      key.field_to_use = None;
    }

    let delta = indexer::compute_delta(
      activity,
      &field,
      &field.field_type,
      &field.details,
    );
    stage(activity.activity_id, MutationStage::DeltaComputed, &delta);

    if !delta.to_add.is_empty() {
      check_key_target(tx, organization_id, activity, &field)?;
    }
    apply_delta(tx, organization_id, activity.activity_id, &delta)?;

    let updated = tx.push_field(organization_id, activity.activity_id, &field)?;
    stage(activity.activity_id, MutationStage::FieldWritten, &delta);
    Ok(updated)
  })
}

// ─── Stages ──────────────────────────────────────────────────────────────────

fn run<T, R>(
  mut tx: T,
  op: &'static str,
  activity_id: Uuid,
  body: impl FnOnce(&mut T) -> Result<R, T::Error>,
) -> Result<R, T::Error>
where
  T: ActivityTransaction,
{
  debug!(op, %activity_id, stage = %MutationStage::Started);
  match body(&mut tx) {
    Ok(out) => {
      tx.commit()?;
      debug!(op, %activity_id, stage = %MutationStage::Committed);
      Ok(out)
    }
    Err(e) => {
      warn!(op, %activity_id, stage = %MutationStage::Aborted, error = %e);
      if let Err(abort_err) = tx.abort() {
        warn!(op, %activity_id, error = %abort_err, "rollback failed");
      }
      Err(e)
    }
  }
}

fn stage(activity_id: Uuid, stage: MutationStage, delta: &RelationshipDelta) {
  debug!(
    %activity_id,
    %stage,
    remove = delta.to_remove.len(),
    add = delta.to_add.len(),
    "mutation stage"
  );
}

fn apply_delta<T: ActivityTransaction>(
  tx: &mut T,
  organization_id: Uuid,
  activity_id: Uuid,
  delta: &RelationshipDelta,
) -> Result<(), T::Error> {
  for edge in &delta.to_remove {
    tx.pull_relationship(organization_id, edge)?;
  }
  stage(activity_id, MutationStage::EdgesRemoved, delta);
  for edge in &delta.to_add {
    tx.push_relationship(organization_id, edge)?;
  }
  stage(activity_id, MutationStage::EdgesAdded, delta);
  Ok(())
}

fn ensure_scope(activity: &Activity, organization_id: Uuid) -> Result<()> {
  if activity.organization_id != organization_id || activity.is_deleted() {
    return Err(Error::ActivityNotFound(activity.activity_id));
  }
  Ok(())
}

/// The activity and field a key points at must exist in the same
/// organization.
fn check_key_target<T: ActivityTransaction>(
  tx: &mut T,
  organization_id: Uuid,
  activity: &Activity,
  field: &ActivityField,
) -> Result<(), T::Error> {
  let Some((target_activity, target_field)) =
    field.details.as_key().and_then(KeyDetails::target)
  else {
    return Ok(());
  };

  let target = if target_activity == activity.activity_id {
    activity.clone()
  } else {
    tx.find_activity(organization_id, target_activity)?
      .ok_or(Error::ActivityNotFound(target_activity))?
  };
  if target.field_by_id(target_field).is_none() {
    return Err(
      Error::FieldNotFound {
        activity_id: target_activity,
        field:       target_field.to_string(),
      }
      .into(),
    );
  }
  Ok(())
}

// ─── Planning ────────────────────────────────────────────────────────────────

/// The field as it will be after writing `value` at `path`. Validates
/// everything that can be checked without the store.
fn plan_field_set(
  activity: &Activity,
  field: &ActivityField,
  path: FieldPath,
  value: Value,
  details: Option<FieldDetails>,
) -> Result<ActivityField> {
  let at = path.to_string();
  let mut next = field.clone();

  match path.leaf {
    None => {
      let mut value = value;
      if let Value::Object(map) = &mut value {
        map
          .entry("field_id")
          .or_insert_with(|| Value::String(field.field_id.to_string()));
      }
      next = serde_json::from_value(value).map_err(|e| invalid(&at, e))?;
      next.field_id = field.field_id;
      if let Some(details) = details {
        next.details = details;
      }
    }
    Some(FieldLeaf::Name) => next.name = string(&at, value)?,
    Some(FieldLeaf::Description) => next.description = optional_string(&at, value)?,
    Some(FieldLeaf::Type) => {
      next.field_type = FieldType::from(string(&at, value)?);
      next.details =
        details.unwrap_or_else(|| FieldDetails::for_type(&next.field_type));
    }
    Some(FieldLeaf::Details) => {
      next.details = match details {
        Some(details) => details,
        None => FieldDetails::decode(&next.field_type, value)?,
      };
    }
    Some(FieldLeaf::PrimaryKey) => next.primary_key = boolean(&at, value)?,
    Some(FieldLeaf::Code) => next.code = string(&at, value)?,
    Some(FieldLeaf::Options) => {
      next.options = serde_json::from_value(value).map_err(|e| invalid(&at, e))?;
    }
    Some(FieldLeaf::OptionsMultiple) => next.options.multiple = boolean(&at, value)?,
    Some(FieldLeaf::OptionsAuto) => next.options.auto = boolean(&at, value)?,
    Some(FieldLeaf::OptionsDefault) => {
      next.options.default = (!value.is_null()).then_some(value);
    }
    Some(FieldLeaf::OptionsReference) => {
      next.options.reference = optional_string(&at, value)?;
    }
  }

  next.details.check_type(&next.field_type)?;
  if activity.code_taken(&next.code, Some(next.field_id)) {
    return Err(Error::DuplicateCode(next.code));
  }
  if let FieldDetails::Key(key) = &mut next.details
    && let Some(given) = key.field_to_use.take()
    && given != field.field_id
  {
    return Err(Error::KeyFieldMismatch {
      expected: field.field_id,
      given,
    });
  }

  Ok(next)
}

fn invalid(path: &str, reason: impl ToString) -> Error {
  Error::InvalidFieldValue {
    path:   path.to_owned(),
    reason: reason.to_string(),
  }
}

fn string(path: &str, value: Value) -> Result<String> {
  match value {
    Value::String(s) => Ok(s),
    other => Err(invalid(path, format!("expected a string, got {other}"))),
  }
}

fn optional_string(path: &str, value: Value) -> Result<Option<String>> {
  match value {
    Value::Null => Ok(None),
    other => string(path, other).map(Some),
  }
}

fn boolean(path: &str, value: Value) -> Result<bool> {
  value
    .as_bool()
    .ok_or_else(|| invalid(path, format!("expected a boolean, got {value}")))
}
