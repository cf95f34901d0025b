//! HTTP layer for usermirror.
//!
//! Exposes an axum [`Router`] that accepts identity-provider webhooks on
//! `POST /events` and mirrors them into any [`UserStore`].

pub mod auth;
pub mod error;
pub mod events;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, extract::DefaultBodyLimit, routing::post};
use config::{ConfigBuilder, ConfigError, builder::DefaultState};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use usermirror_core::store::UserStore;

use auth::AuthConfig;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `USERMIRROR_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Bearer secret shared with the identity provider.
  pub auth_token: String,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8787 }

fn default_store_path() -> PathBuf { PathBuf::from("usermirror.db") }

impl ServerConfig {
  /// Layer environment variables over `builder` and deserialise.
  pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    builder
      .add_source(config::Environment::with_prefix("USERMIRROR"))
      .build()?
      .try_deserialize()
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: UserStore> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthConfig>,
}

impl<S: UserStore> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), auth: Arc::clone(&self.auth) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the webhook receiver.
///
/// Anything other than `POST /events` answers `404 Not Found`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: UserStore + 'static,
{
  Router::new()
    .route("/events", post(events::handler::<S>).fallback(not_found))
    .fallback(not_found)
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn not_found() -> Error { Error::NotFound }

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use usermirror_core::{store::StoreError, user::UserRecord};
  use usermirror_store_sqlite::SqliteStore;

  const TOKEN: &str = "test-token";

  async fn make_state() -> AppState<SqliteStore> {
    AppState {
      store: Arc::new(SqliteStore::open_in_memory().await.unwrap()),
      auth:  Arc::new(AuthConfig::new(TOKEN)),
    }
  }

  fn bearer(token: &str) -> String { format!("Bearer {token}") }

  async fn oneshot_raw<S>(
    state:  AppState<S>,
    method: &str,
    uri:    &str,
    token:  Option<&str>,
    body:   &str,
  ) -> Response
  where
    S: UserStore + 'static,
  {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, bearer(t));
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(state).oneshot(req).await.unwrap()
  }

  async fn post_event(state: AppState<SqliteStore>, envelope: &Value) -> Response {
    oneshot_raw(state, "POST", "/events", Some(TOKEN), &envelope.to_string()).await
  }

  async fn body_string(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  async fn body_json(resp: Response) -> Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
  }

  fn envelope(kind: &str, time: &str, object: Value) -> Value {
    json!({
      "id":   "evt1",
      "type": kind,
      "time": time,
      "data": { "object": object }
    })
  }

  // ── Created / deleted scenarios ─────────────────────────────────────────────

  #[tokio::test]
  async fn user_created_inserts_row_and_returns_204() {
    let state = make_state().await;
    let resp = post_event(
      state.clone(),
      &envelope(
        "user.created",
        "2024-01-01T00:00:00Z",
        json!({ "user_id": "auth0|1", "email": "a@example.com" }),
      ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_string(resp).await.is_empty());

    let row = state.store.get_user("auth0|1").await.unwrap().expect("row");
    assert_eq!(row.user.email.as_deref(), Some("a@example.com"));
    assert_eq!(row.user.nickname, None);
    assert_eq!(row.last_event_processed.as_str(), "2024-01-01T00:00:00Z");
  }

  #[tokio::test]
  async fn event_time_with_millis_is_stored_as_sent() {
    let state = make_state().await;
    let resp = post_event(
      state.clone(),
      &envelope("user.created", "2024-01-01T00:00:00.000Z", json!({ "user_id": "auth0|1" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let row = state.store.get_user("auth0|1").await.unwrap().unwrap();
    assert_eq!(row.last_event_processed.as_str(), "2024-01-01T00:00:00.000Z");
  }

  #[tokio::test]
  async fn user_deleted_removes_row_and_returns_204() {
    let state = make_state().await;
    post_event(
      state.clone(),
      &envelope(
        "user.created",
        "2024-01-01T00:00:00Z",
        json!({ "user_id": "auth0|1", "email": "a@example.com" }),
      ),
    )
    .await;

    let resp = post_event(
      state.clone(),
      &envelope("user.deleted", "2024-01-02T00:00:00Z", json!({ "user_id": "auth0|1" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(state.store.get_user("auth0|1").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn deleting_unknown_user_returns_204() {
    let state = make_state().await;
    let resp = post_event(
      state.clone(),
      &envelope("user.deleted", "2024-01-02T00:00:00Z", json!({ "user_id": "auth0|9" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.store.user_count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn user_updated_replaces_whole_row() {
    let state = make_state().await;
    post_event(
      state.clone(),
      &envelope(
        "user.created",
        "2024-01-01T00:00:00Z",
        json!({ "user_id": "auth0|1", "email": "a@example.com", "nickname": "al" }),
      ),
    )
    .await;
    let resp = post_event(
      state.clone(),
      &envelope(
        "user.updated",
        "2024-01-03T00:00:00Z",
        json!({ "user_id": "auth0|1", "email": "b@example.com" }),
      ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let row = state.store.get_user("auth0|1").await.unwrap().unwrap();
    assert_eq!(row.user.email.as_deref(), Some("b@example.com"));
    assert_eq!(row.user.nickname, None);
    assert_eq!(state.store.user_count().await.unwrap(), 1);
  }

  // ── Malformed and unhandled input ───────────────────────────────────────────

  #[tokio::test]
  async fn malformed_json_returns_400() {
    let state = make_state().await;
    let resp = oneshot_raw(state.clone(), "POST", "/events", Some(TOKEN), "{not json").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await, json!({ "error": "Invalid JSON payload" }));
    assert_eq!(state.store.user_count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn user_event_without_user_id_returns_400() {
    let state = make_state().await;
    let resp = post_event(
      state.clone(),
      &envelope("user.created", "2024-01-01T00:00:00Z", json!({ "email": "a@example.com" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.store.user_count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn unhandled_type_returns_204_without_writing() {
    let state = make_state().await;
    let resp = post_event(
      state.clone(),
      &envelope(
        "organization.created",
        "2024-01-01T00:00:00Z",
        json!({ "user_id": "auth0|1" }),
      ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.store.user_count().await.unwrap(), 0);
  }

  // ── Store failure ───────────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("disk I/O error")]
  struct DiskError;

  impl StoreError for DiskError {}

  struct BrokenStore;

  impl UserStore for BrokenStore {
    type Error = DiskError;
    async fn upsert_user(&self, _: UserRecord) -> Result<(), DiskError> { Err(DiskError) }
    async fn delete_user(&self, _: &str) -> Result<bool, DiskError> { Err(DiskError) }
    async fn get_user(&self, _: &str) -> Result<Option<UserRecord>, DiskError> { Err(DiskError) }
  }

  #[derive(Debug, thiserror::Error)]
  #[error("UNIQUE constraint failed: users.email")]
  struct EmailTaken;

  impl StoreError for EmailTaken {
    fn is_unique_violation(&self) -> bool { true }
  }

  struct TakenEmailStore;

  impl UserStore for TakenEmailStore {
    type Error = EmailTaken;
    async fn upsert_user(&self, _: UserRecord) -> Result<(), EmailTaken> { Err(EmailTaken) }
    async fn delete_user(&self, _: &str) -> Result<bool, EmailTaken> { Ok(false) }
    async fn get_user(&self, _: &str) -> Result<Option<UserRecord>, EmailTaken> { Ok(None) }
  }

  #[tokio::test]
  async fn duplicate_user_returns_204() {
    let state = AppState {
      store: Arc::new(TakenEmailStore),
      auth:  Arc::new(AuthConfig::new(TOKEN)),
    };
    let body = envelope(
      "user.created",
      "2024-01-01T00:00:00Z",
      json!({ "user_id": "auth0|2", "email": "a@example.com" }),
    );
    let resp = oneshot_raw(state, "POST", "/events", Some(TOKEN), &body.to_string()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_string(resp).await.is_empty());
  }

  #[tokio::test]
  async fn store_failure_returns_generic_500() {
    let state = AppState {
      store: Arc::new(BrokenStore),
      auth:  Arc::new(AuthConfig::new(TOKEN)),
    };
    let body = envelope("user.created", "2024-01-01T00:00:00Z", json!({ "user_id": "u" }));
    let resp = oneshot_raw(state, "POST", "/events", Some(TOKEN), &body.to_string()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({ "error": "Internal server error" }));
  }

  // ── Auth ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_token_returns_401_without_writing() {
    let state = make_state().await;
    let body = envelope("user.created", "2024-01-01T00:00:00Z", json!({ "user_id": "u" }));
    let resp = oneshot_raw(state.clone(), "POST", "/events", None, &body.to_string()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(state.store.user_count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn wrong_token_returns_401() {
    let state = make_state().await;
    let body = envelope("user.created", "2024-01-01T00:00:00Z", json!({ "user_id": "u" }));
    let resp = oneshot_raw(state.clone(), "POST", "/events", Some("guess"), &body.to_string()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(state.store.user_count().await.unwrap(), 0);
  }

  // ── Body limit ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn oversized_body_returns_413_without_writing() {
    let state = make_state().await;
    let body = "x".repeat(MAX_BODY_BYTES + 1);
    let resp = oneshot_raw(state.clone(), "POST", "/events", Some(TOKEN), &body).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(state.store.user_count().await.unwrap(), 0);
  }

  #[tokio::test]
  async fn body_at_the_limit_is_read() {
    let state = make_state().await;
    let mut body = envelope("user.created", "2024-01-01T00:00:00Z", json!({ "user_id": "u" }))
      .to_string();
    body.push_str(&" ".repeat(MAX_BODY_BYTES - body.len()));
    let resp = oneshot_raw(state.clone(), "POST", "/events", Some(TOKEN), &body).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.store.user_count().await.unwrap(), 1);
  }

  // ── Routing ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn get_on_events_returns_404() {
    let state = make_state().await;
    let resp = oneshot_raw(state, "GET", "/events", Some(TOKEN), "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(resp).await, "Not Found");
  }

  #[tokio::test]
  async fn unknown_path_returns_404() {
    let state = make_state().await;
    let resp = oneshot_raw(state, "POST", "/webhooks", Some(TOKEN), "{}").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(resp).await, "Not Found");
  }

  // ── Configuration ───────────────────────────────────────────────────────────

  fn parse_config(toml: &str) -> Result<ServerConfig, ConfigError> {
    ServerConfig::from_builder(
      config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml)),
    )
  }

  #[test]
  fn config_defaults_fill_everything_but_the_token() {
    let cfg = parse_config("auth_token = \"abc\"").unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8787);
    assert_eq!(cfg.store_path, PathBuf::from("usermirror.db"));
    assert_eq!(cfg.auth_token, "abc");
  }

  #[test]
  fn config_without_token_is_rejected() {
    assert!(parse_config("port = 9000").is_err());
  }
}
