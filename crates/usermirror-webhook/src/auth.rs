//! Bearer-token extractor and standalone verifier.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{AppState, error::Error};
use usermirror_core::store::UserStore;

/// The shared secret callers must present.
///
/// Only the SHA-256 digest is kept. Presented tokens are hashed and compared
/// in constant time, so neither their length nor a matching prefix shows up
/// in response timing.
#[derive(Clone)]
pub struct AuthConfig {
  token_digest: [u8; 32],
}

impl AuthConfig {
  pub fn new(token: &str) -> Self {
    Self { token_digest: Sha256::digest(token.as_bytes()).into() }
  }

  fn matches(&self, presented: &str) -> bool {
    let digest: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
    self.token_digest[..].ct_eq(&digest[..]).into()
  }
}

/// Zero-size marker: present in the handler means the request was authenticated.
pub struct BearerAuth;

/// Verify the `Authorization: Bearer <token>` header.
pub fn verify_bearer(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let token = header_val
    .strip_prefix("Bearer ")
    .map(str::trim)
    .ok_or(Error::Unauthorized)?;

  if token.is_empty() || !config.matches(token) {
    return Err(Error::Unauthorized);
  }

  Ok(())
}

impl<S> FromRequestParts<AppState<S>> for BearerAuth
where
  S: UserStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_bearer(&parts.headers, &state.auth).inspect_err(|_| {
      tracing::warn!(uri = %parts.uri, "rejected request with missing or invalid bearer token");
    })?;
    Ok(BearerAuth)
  }
}
