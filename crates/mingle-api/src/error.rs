//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure surfaces as `{ "error": <message> }` with a message short
//! enough for direct display. Unclassified store failures collapse to a
//! generic 500 body so no internal detail leaks to clients.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Map a store failure through the domain taxonomy into an HTTP-shaped
  /// error.
  pub fn from_store(err: impl Into<mingle_core::Error>) -> Self {
    err.into().into()
  }
}

impl From<mingle_core::Error> for ApiError {
  fn from(err: mingle_core::Error) -> Self {
    use mingle_core::Error as E;
    match err {
      E::SelfConnection => {
        Self::BadRequest("You cannot connect with yourself".to_owned())
      }
      E::CodeNotFound(_) => {
        Self::NotFound("Invalid user or connection code".to_owned())
      }
      E::IdentityNotFound(_) => Self::NotFound("User not found".to_owned()),
      E::ConnectionNotFound(_) => {
        Self::NotFound("Connection not found".to_owned())
      }
      E::AlreadyConnected(_) => {
        Self::Conflict("Connection already exists".to_owned())
      }
      E::EmailTaken(_) => {
        Self::Conflict("Email is already registered".to_owned())
      }
      E::AvatarAttemptsExhausted => {
        Self::Conflict("Avatar generation attempts exhausted".to_owned())
      }
      E::CodeSpaceExhausted | E::Serialization(_) | E::Storage(_) => {
        Self::Internal(err.to_string())
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned())
      }
      ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_owned()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      // The detail stays server-side.
      ApiError::Internal(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"mingle\""),
      );
    }
    res
  }
}
