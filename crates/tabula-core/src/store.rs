//! The `ActivityStore` trait.
//!
//! Implemented by storage backends (e.g. `tabula-store-sqlite`). Field-level
//! mutations go through [`crate::mutation`] inside one backend transaction;
//! the remaining methods are single-document operations.

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::{Activity, NewActivity, NewField},
  mutation::FieldSet,
};

/// Abstraction over an activity document store.
///
/// Every method is scoped to one organization; activities of other
/// organizations and soft-deleted activities behave as if absent.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait ActivityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Activities ────────────────────────────────────────────────────────

  /// Create and persist an activity with no fields.
  fn create_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  /// Retrieve a live activity. Returns `None` if not found.
  fn get_activity(
    &self,
    organization_id: Uuid,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<Option<Activity>, Self::Error>> + Send + '_;

  /// List the live activities of an organization, oldest first.
  fn list_activities(
    &self,
    organization_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;

  /// Change an activity's name and description.
  fn rename_activity(
    &self,
    organization_id: Uuid,
    activity_id: Uuid,
    name: String,
    description: Option<String>,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  /// Mark an activity deleted. It disappears from every default query.
  fn soft_delete_activity(
    &self,
    organization_id: Uuid,
    activity_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Fields ────────────────────────────────────────────────────────────

  /// See [`crate::mutation::add_field`].
  fn add_field<'a>(
    &'a self,
    activity: &'a Activity,
    organization_id: Uuid,
    field: NewField,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + 'a;

  /// See [`crate::mutation::update_field_set`]. `activity` is the snapshot
  /// the relationship delta is computed from.
  fn update_field_set<'a>(
    &'a self,
    activity: &'a Activity,
    organization_id: Uuid,
    set: FieldSet,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + 'a;

  /// See [`crate::mutation::update_field_remove`].
  fn update_field_remove<'a>(
    &'a self,
    activity: &'a Activity,
    organization_id: Uuid,
    position: usize,
    field_name: &'a str,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + 'a;
}
