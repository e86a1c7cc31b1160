//! Error types for `mingle-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot connect with yourself")]
  SelfConnection,

  #[error("no identity with code {0:?}")]
  CodeNotFound(String),

  #[error("identity not found: {0}")]
  IdentityNotFound(Uuid),

  #[error("no active connection to {0}")]
  ConnectionNotFound(Uuid),

  #[error("already connected to {0}")]
  AlreadyConnected(Uuid),

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("connect-code space exhausted")]
  CodeSpaceExhausted,

  #[error("avatar generation attempts exhausted")]
  AvatarAttemptsExhausted,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
