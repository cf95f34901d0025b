//! The `UserStore` trait: the storage gateway seam.
//!
//! Implemented by storage backends (e.g. `usermirror-store-sqlite`). The
//! dispatcher and the HTTP layer depend on this abstraction, never on a
//! concrete backend.

use std::future::Future;

use crate::user::UserRecord;

/// Errors raised by a [`UserStore`] backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// `true` when the write was refused by a uniqueness constraint.
  ///
  /// The upsert handler logs these and carries on instead of failing the
  /// event.
  fn is_unique_violation(&self) -> bool { false }
}

/// Abstraction over the table that mirrors identity-provider users.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait UserStore: Send + Sync {
  type Error: StoreError;

  /// Insert the record, or overwrite every column of the existing row with
  /// the same `user_id`. Absent optional fields are written as NULL.
  fn upsert_user(
    &self,
    record: UserRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete the row for `user_id`. Returns whether a row was removed; a
  /// missing row is not an error.
  fn delete_user<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Look up the row for `user_id`. Returns `None` if not found.
  fn get_user<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + 'a;
}
