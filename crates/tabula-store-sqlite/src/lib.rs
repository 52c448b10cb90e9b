//! SQLite backend for the Tabula schema engine.
//!
//! Activities are stored as documents: one row per activity, with the
//! embedded fields and relationship edges held as JSON arrays. Wraps
//! [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod gateway;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use gateway::SqliteTransaction;
pub use store::SqliteStore;
