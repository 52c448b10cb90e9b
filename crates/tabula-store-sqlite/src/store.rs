//! [`SqliteStore`] — the SQLite implementation of [`ActivityStore`].

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tabula_core::{
  activity::{Activity, NewActivity, NewField},
  mutation::{self, FieldSet},
  store::ActivityStore,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{ACTIVITY_COLUMNS, RawActivity, encode_dt, encode_uuid},
  gateway::SqliteTransaction,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An activity store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one write transaction on the connection thread.
  ///
  /// If this future is dropped before `f` commits, the transaction is rolled
  /// back instead.
  async fn transact<R, F>(&self, f: F) -> Result<R>
  where
    F: FnOnce(SqliteTransaction<'_>) -> Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let guard = CancelOnDrop::default();
    let cancelled = guard.flag.clone();

    let outcome = self
      .conn
      .call(move |conn| Ok(SqliteTransaction::begin(conn, cancelled).and_then(f)))
      .await?;

    guard.disarm();
    outcome
  }
}

/// Raises the shared flag when dropped while still armed.
#[derive(Default)]
struct CancelOnDrop {
  flag:     Arc<AtomicBool>,
  disarmed: bool,
}

impl CancelOnDrop {
  fn disarm(mut self) { self.disarmed = true; }
}

impl Drop for CancelOnDrop {
  fn drop(&mut self) {
    if !self.disarmed {
      self.flag.store(true, Ordering::SeqCst);
    }
  }
}

// ─── ActivityStore impl ──────────────────────────────────────────────────────

impl ActivityStore for SqliteStore {
  type Error = Error;

  // ── Activities ────────────────────────────────────────────────────────────

  async fn create_activity(&self, input: NewActivity) -> Result<Activity> {
    let now = Utc::now();
    let activity = Activity {
      activity_id:     Uuid::new_v4(),
      organization_id: input.organization_id,
      created_by:      input.created_by,
      name:            input.name,
      description:     input.description,
      fields:          Vec::new(),
      relationships:   Vec::new(),
      created_at:      now,
      updated_at:      now,
      deleted_at:      None,
    };

    let id_str      = encode_uuid(activity.activity_id);
    let org_str     = encode_uuid(activity.organization_id);
    let creator_str = encode_uuid(activity.created_by);
    let name        = activity.name.clone();
    let description = activity.description.clone();
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activities (
             activity_id, organization_id, created_by, name, description,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![id_str, org_str, creator_str, name, description, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(activity_id = %activity.activity_id, "activity created");
    Ok(activity)
  }

  async fn get_activity(
    &self,
    organization_id: Uuid,
    activity_id: Uuid,
  ) -> Result<Option<Activity>> {
    let id_str  = encode_uuid(activity_id);
    let org_str = encode_uuid(organization_id);

    let raw: Option<RawActivity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities
                 WHERE activity_id = ?1 AND organization_id = ?2
                   AND deleted_at IS NULL"
              ),
              rusqlite::params![id_str, org_str],
              RawActivity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawActivity::into_activity).transpose()
  }

  async fn list_activities(&self, organization_id: Uuid) -> Result<Vec<Activity>> {
    let org_str = encode_uuid(organization_id);

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACTIVITY_COLUMNS} FROM activities
           WHERE organization_id = ?1 AND deleted_at IS NULL
           ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![org_str], RawActivity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  async fn rename_activity(
    &self,
    organization_id: Uuid,
    activity_id: Uuid,
    name: String,
    description: Option<String>,
  ) -> Result<Activity> {
    let id_str  = encode_uuid(activity_id);
    let org_str = encode_uuid(organization_id);
    let at_str  = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE activities SET name = ?1, description = ?2, updated_at = ?3
           WHERE activity_id = ?4 AND organization_id = ?5
             AND deleted_at IS NULL",
          rusqlite::params![name, description, at_str, id_str, org_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(tabula_core::Error::ActivityNotFound(activity_id).into());
    }
    self
      .get_activity(organization_id, activity_id)
      .await?
      .ok_or(Error::Core(tabula_core::Error::ActivityNotFound(activity_id)))
  }

  async fn soft_delete_activity(
    &self,
    organization_id: Uuid,
    activity_id: Uuid,
  ) -> Result<()> {
    let id_str  = encode_uuid(activity_id);
    let org_str = encode_uuid(organization_id);
    let at_str  = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE activities SET deleted_at = ?1, updated_at = ?1
           WHERE activity_id = ?2 AND organization_id = ?3
             AND deleted_at IS NULL",
          rusqlite::params![at_str, id_str, org_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(tabula_core::Error::ActivityNotFound(activity_id).into());
    }
    debug!(%activity_id, "activity soft-deleted");
    Ok(())
  }

  // ── Fields ────────────────────────────────────────────────────────────────

  async fn add_field<'a>(
    &'a self,
    activity: &'a Activity,
    organization_id: Uuid,
    field: NewField,
  ) -> Result<Activity> {
    let snapshot = activity.clone();
    self
      .transact(move |tx| mutation::add_field(tx, &snapshot, organization_id, field))
      .await
  }

  async fn update_field_set<'a>(
    &'a self,
    activity: &'a Activity,
    organization_id: Uuid,
    set: FieldSet,
  ) -> Result<Activity> {
    let snapshot = activity.clone();
    self
      .transact(move |tx| {
        mutation::update_field_set(tx, &snapshot, organization_id, set)
      })
      .await
  }

  async fn update_field_remove<'a>(
    &'a self,
    activity: &'a Activity,
    organization_id: Uuid,
    position: usize,
    field_name: &'a str,
  ) -> Result<Activity> {
    let snapshot = activity.clone();
    let field_name = field_name.to_owned();
    self
      .transact(move |tx| {
        mutation::update_field_remove(
          tx,
          &snapshot,
          organization_id,
          position,
          &field_name,
        )
      })
      .await
  }
}
