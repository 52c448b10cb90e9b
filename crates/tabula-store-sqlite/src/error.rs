//! Error type for `tabula-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tabula_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The caller stopped waiting before the transaction committed; it was
  /// rolled back.
  #[error("transaction cancelled before commit")]
  Cancelled,
}

impl Error {
  /// Whether the error reports a missing activity or field.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::Core(
        tabula_core::Error::ActivityNotFound(_)
          | tabula_core::Error::FieldNotFound { .. }
      )
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
