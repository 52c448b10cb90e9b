//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! the embedded fields and relationships compact JSON arrays.

use chrono::{DateTime, Utc};
use tabula_core::activity::Activity;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawActivity::from_row`].
pub const ACTIVITY_COLUMNS: &str = "activity_id, organization_id, created_by, \
  name, description, fields_json, relationships_json, created_at, \
  updated_at, deleted_at";

/// Raw strings read directly from an `activities` row.
pub struct RawActivity {
  pub activity_id:        String,
  pub organization_id:    String,
  pub created_by:         String,
  pub name:               String,
  pub description:        Option<String>,
  pub fields_json:        String,
  pub relationships_json: String,
  pub created_at:         String,
  pub updated_at:         String,
  pub deleted_at:         Option<String>,
}

impl RawActivity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      activity_id:        row.get(0)?,
      organization_id:    row.get(1)?,
      created_by:         row.get(2)?,
      name:               row.get(3)?,
      description:        row.get(4)?,
      fields_json:        row.get(5)?,
      relationships_json: row.get(6)?,
      created_at:         row.get(7)?,
      updated_at:         row.get(8)?,
      deleted_at:         row.get(9)?,
    })
  }

  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      activity_id:     decode_uuid(&self.activity_id)?,
      organization_id: decode_uuid(&self.organization_id)?,
      created_by:      decode_uuid(&self.created_by)?,
      name:            self.name,
      description:     self.description,
      fields:          serde_json::from_str(&self.fields_json)?,
      relationships:   serde_json::from_str(&self.relationships_json)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
      deleted_at:      self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
