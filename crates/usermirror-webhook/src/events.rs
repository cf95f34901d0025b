//! `POST /events` — the identity-provider webhook.
//!
//! | Outcome | Status |
//! |---------|--------|
//! | envelope or user payload does not parse | `400 {"error":"Invalid JSON payload"}` |
//! | store failure | `500 {"error":"Internal server error"}` |
//! | written, deleted, duplicate, or unhandled type | `204` |

use axum::{extract::State, http::StatusCode};
use bytes::Bytes;
use usermirror_core::{event::Envelope, store::UserStore, sync};

use crate::{AppState, auth::BearerAuth, error::Error};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  _auth: BearerAuth,
  body: Bytes,
) -> Result<StatusCode, Error>
where
  S: UserStore + 'static,
{
  let envelope = Envelope::from_slice(&body).inspect_err(|e| {
    tracing::warn!(error = %e, "rejecting malformed envelope");
  })?;

  tracing::debug!(body = %String::from_utf8_lossy(&body), "received event");
  tracing::info!(event_id = %envelope.id, kind = %envelope.kind, "received event");

  let event = envelope.into_event().inspect_err(|e| {
    tracing::warn!(error = %e, "rejecting event with malformed payload");
  })?;
  let event_id = event.id().to_owned();

  let outcome = sync::dispatch(state.store.as_ref(), event)
    .await
    .map_err(|e| {
      tracing::error!(event_id = %event_id, error = %e, "error processing webhook");
      Error::Store(Box::new(e))
    })?;

  tracing::info!(event_id = %event_id, outcome = ?outcome, "event committed");
  Ok(StatusCode::NO_CONTENT)
}
