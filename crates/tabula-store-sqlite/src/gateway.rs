//! [`SqliteTransaction`] — the transaction handle the mutation coordinator
//! drives.
//!
//! Each primitive loads the activity document inside the transaction,
//! changes its embedded arrays and writes it back, returning the post-image
//! where the coordinator needs one.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tabula_core::{
  activity::{Activity, ActivityField},
  mutation::ActivityTransaction,
  relationship::ActivityRelationship,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{ACTIVITY_COLUMNS, RawActivity, encode_dt, encode_uuid},
};

/// A write transaction on the activities table.
///
/// Dropping it without [`commit`](ActivityTransaction::commit) rolls back.
pub struct SqliteTransaction<'c> {
  tx:        rusqlite::Transaction<'c>,
  cancelled: Arc<AtomicBool>,
}

impl<'c> SqliteTransaction<'c> {
  /// Begin an immediate transaction. `cancelled` is checked again at commit
  /// time; once set, the transaction can only roll back.
  pub fn begin(
    conn: &'c mut rusqlite::Connection,
    cancelled: Arc<AtomicBool>,
  ) -> Result<Self> {
    if cancelled.load(Ordering::SeqCst) {
      return Err(Error::Cancelled);
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    Ok(Self { tx, cancelled })
  }

  fn load(
    &self,
    organization_id: Uuid,
    activity_id: Uuid,
  ) -> Result<Option<Activity>> {
    let raw = self
      .tx
      .query_row(
        &format!(
          "SELECT {ACTIVITY_COLUMNS} FROM activities
           WHERE activity_id = ?1 AND organization_id = ?2
             AND deleted_at IS NULL"
        ),
        rusqlite::params![encode_uuid(activity_id), encode_uuid(organization_id)],
        RawActivity::from_row,
      )
      .optional()?;
    raw.map(RawActivity::into_activity).transpose()
  }

  fn load_required(
    &self,
    organization_id: Uuid,
    activity_id: Uuid,
  ) -> Result<Activity> {
    self
      .load(organization_id, activity_id)?
      .ok_or(Error::Core(tabula_core::Error::ActivityNotFound(activity_id)))
  }

  /// Write back the embedded arrays of `activity` and bump `updated_at`.
  fn save(&self, mut activity: Activity) -> Result<Activity> {
    activity.updated_at = Utc::now();
    self.tx.execute(
      "UPDATE activities
       SET fields_json = ?1, relationships_json = ?2, updated_at = ?3
       WHERE activity_id = ?4",
      rusqlite::params![
        serde_json::to_string(&activity.fields)?,
        serde_json::to_string(&activity.relationships)?,
        encode_dt(activity.updated_at),
        encode_uuid(activity.activity_id),
      ],
    )?;
    Ok(activity)
  }

  fn check_position(
    activity: &Activity,
    position: usize,
    field_id: Uuid,
  ) -> Result<()> {
    match activity.fields.get(position) {
      Some(f) if f.field_id == field_id => Ok(()),
      _ => Err(Error::Core(tabula_core::Error::FieldNotFound {
        activity_id: activity.activity_id,
        field:       format!("{field_id} at position {position}"),
      })),
    }
  }
}

impl ActivityTransaction for SqliteTransaction<'_> {
  type Error = Error;

  fn find_activity(
    &mut self,
    organization_id: Uuid,
    activity_id: Uuid,
  ) -> Result<Option<Activity>> {
    self.load(organization_id, activity_id)
  }

  fn push_relationship(
    &mut self,
    organization_id: Uuid,
    edge: &ActivityRelationship,
  ) -> Result<()> {
    let mut doc = self.load_required(organization_id, edge.activity_id)?;
    if doc.relationships.iter().any(|e| e.same_edge(edge)) {
      debug!(activity_id = %edge.activity_id, kind = %edge.kind, "edge already present");
      return Ok(());
    }
    doc.relationships.push(edge.clone());
    self.save(doc)?;
    Ok(())
  }

  fn pull_relationship(
    &mut self,
    organization_id: Uuid,
    edge: &ActivityRelationship,
  ) -> Result<()> {
    let Some(mut doc) = self.load(organization_id, edge.activity_id)? else {
      debug!(activity_id = %edge.activity_id, "edge owner gone, nothing to pull");
      return Ok(());
    };
    let before = doc.relationships.len();
    doc.relationships.retain(|e| !e.same_edge(edge));
    if doc.relationships.len() != before {
      self.save(doc)?;
    }
    Ok(())
  }

  fn push_field(
    &mut self,
    organization_id: Uuid,
    activity_id: Uuid,
    field: &ActivityField,
  ) -> Result<Activity> {
    let mut doc = self.load_required(organization_id, activity_id)?;
    doc.fields.push(field.clone());
    self.save(doc)
  }

  fn set_field(
    &mut self,
    organization_id: Uuid,
    activity_id: Uuid,
    position: usize,
    field: &ActivityField,
  ) -> Result<Activity> {
    let mut doc = self.load_required(organization_id, activity_id)?;
    Self::check_position(&doc, position, field.field_id)?;
    doc.fields[position] = field.clone();
    self.save(doc)
  }

  fn remove_field(
    &mut self,
    organization_id: Uuid,
    activity_id: Uuid,
    position: usize,
    field_id: Uuid,
  ) -> Result<Activity> {
    let mut doc = self.load_required(organization_id, activity_id)?;
    Self::check_position(&doc, position, field_id)?;
    doc.fields.remove(position);
    self.save(doc)
  }

  fn commit(self) -> Result<()> {
    if self.cancelled.load(Ordering::SeqCst) {
      self.tx.rollback()?;
      return Err(Error::Cancelled);
    }
    self.tx.commit()?;
    Ok(())
  }

  fn abort(self) -> Result<()> {
    self.tx.rollback()?;
    Ok(())
  }
}
