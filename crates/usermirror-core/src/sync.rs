//! Event dispatch and the two user handlers.
//!
//! Handler failures are logged with the subject identifier and returned to
//! the caller unchanged. Nothing here retries.

use crate::{
  event::{Event, EventKind},
  store::{StoreError, UserStore},
  user::UserRecord,
};

/// What a dispatched event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
  Upserted { user_id: String, created: bool },
  /// The write hit a uniqueness constraint and was skipped.
  Duplicate { user_id: String },
  /// `existed` is `false` when there was no row to delete.
  Deleted { user_id: String, existed: bool },
  Unhandled { kind: String },
}

/// Route `event` to its handler.
pub async fn dispatch<S>(store: &S, event: Event) -> Result<Dispatched, S::Error>
where
  S: UserStore,
{
  match event {
    Event::Upsert { id, created, record } => {
      tracing::debug!(event_id = %id, user_id = %record.user_id(), "dispatching upsert");
      handle_user_upsert(store, record, created).await
    }
    Event::Delete { id, user_id } => {
      tracing::debug!(event_id = %id, user_id = %user_id, "dispatching delete");
      handle_user_delete(store, &user_id).await
    }
    Event::Unhandled { id, kind } => {
      tracing::warn!(event_id = %id, kind = %kind, "event type not handled");
      Ok(Dispatched::Unhandled { kind })
    }
  }
}

/// Insert or fully replace the row for `record`.
pub async fn handle_user_upsert<S>(
  store:   &S,
  record:  UserRecord,
  created: bool,
) -> Result<Dispatched, S::Error>
where
  S: UserStore,
{
  let user_id = record.user_id().to_owned();
  let kind = if created { EventKind::UserCreated } else { EventKind::UserUpdated };

  match store.upsert_user(record).await {
    Ok(()) => {
      tracing::info!(user_id = %user_id, event = kind.as_str(), "user written");
      Ok(Dispatched::Upserted { user_id, created })
    }
    Err(e) if e.is_unique_violation() => {
      tracing::warn!(user_id = %user_id, error = %e, "duplicate user, skipping write");
      Ok(Dispatched::Duplicate { user_id })
    }
    Err(e) => {
      tracing::error!(user_id = %user_id, error = %e, "database error while writing user");
      Err(e)
    }
  }
}

/// Delete the row for `user_id`, if any.
pub async fn handle_user_delete<S>(store: &S, user_id: &str) -> Result<Dispatched, S::Error>
where
  S: UserStore,
{
  match store.delete_user(user_id).await {
    Ok(existed) => {
      if existed {
        tracing::info!(user_id = %user_id, "user deleted");
      } else {
        tracing::info!(user_id = %user_id, "user to delete was not present");
      }
      Ok(Dispatched::Deleted { user_id: user_id.to_owned(), existed })
    }
    Err(e) => {
      tracing::error!(user_id = %user_id, error = %e, "database error while deleting user");
      Err(e)
    }
  }
}
