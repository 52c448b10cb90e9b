//! Core types and trait definitions for the Tabula schema engine.
//!
//! Activities are organization-defined record schemas. Their fields may be
//! typed as `key`, which links them to a field of another activity; the
//! resulting relationship edges are stored on both activities and maintained
//! exclusively by the [`mutation`] coordinator.
//!
//! This crate is free of database dependencies. Storage backends implement
//! [`mutation::ActivityTransaction`] and [`store::ActivityStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod details;
pub mod error;
pub mod indexer;
pub mod invariant;
pub mod mutation;
pub mod path;
pub mod relationship;
pub mod store;

pub use error::{Error, Result};
