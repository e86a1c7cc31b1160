//! Error type for `mingle-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] mingle_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column value could not be decoded (bad timestamp, bad code).
  #[error("decode error: {0}")]
  Decode(String),
}

impl From<rusqlite::Error> for Error {
  fn from(err: rusqlite::Error) -> Self {
    Self::Database(tokio_rusqlite::Error::Rusqlite(err))
  }
}

/// Collapse the backend error into the domain taxonomy at the trait
/// boundary. Anything that is not already a domain failure surfaces as the
/// persistence fallback.
impl From<Error> for mingle_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Json(e) => mingle_core::Error::Serialization(e),
      other => mingle_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
