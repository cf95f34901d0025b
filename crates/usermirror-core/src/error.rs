//! Error types for `usermirror-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The envelope or its `data.object` does not have the expected shape.
  #[error("invalid event payload: {0}")]
  InvalidPayload(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
