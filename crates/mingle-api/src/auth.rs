//! HTTP Basic-auth caller extractor and password-hash helpers.
//!
//! Credentials are `email:password`, verified against the argon2 PHC string
//! stored on the member's identity. Extracting [`Caller`] in a handler means
//! the request was authenticated and resolves to that member's record.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use mingle_core::{identity::Identity, store::IdentityStore};
use rand_core::OsRng;

use crate::{ApiState, error::ApiError};

/// The authenticated member making the request.
pub struct Caller(pub Identity);

/// Hash a freshly chosen password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// Pull `(email, password)` out of a Basic Authorization header.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((email.to_owned(), password.to_owned()))
}

/// Verify a password against a stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

impl<S> FromRequestParts<ApiState<S>> for Caller
where
  S: IdentityStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) = basic_credentials(&parts.headers)?;

    let identity = state
      .store
      .identity_by_email(&email)
      .await
      .map_err(ApiError::from_store)?
      .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&password, &identity.password_hash) {
      return Err(ApiError::Unauthorized);
    }

    Ok(Caller(identity))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use axum::http::{Request, header};
  use chrono::Utc;
  use mingle_core::{
    code::ConnectCode,
    connection::ConnectionView,
    identity::{NewIdentity, ProfileUpdate, PublicProfile},
    store::{LeaderboardEntry, Stats},
  };
  use uuid::Uuid;

  /// A store holding exactly one member — enough to drive the extractor.
  #[derive(Clone)]
  struct SingleUserStore {
    identity: Identity,
  }

  impl IdentityStore for SingleUserStore {
    type Error = mingle_core::Error;

    async fn register(&self, _: NewIdentity) -> Result<Identity, Self::Error> { unimplemented!() }
    async fn identity(&self, _: Uuid) -> Result<Option<Identity>, Self::Error> { unimplemented!() }
    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, Self::Error> {
      Ok((email == self.identity.email).then(|| self.identity.clone()))
    }
    async fn identity_by_code(&self, _: &str) -> Result<Option<Identity>, Self::Error> { unimplemented!() }
    async fn update_profile(&self, _: Uuid, _: ProfileUpdate) -> Result<Identity, Self::Error> { unimplemented!() }
    async fn record_avatar(&self, _: Uuid, _: String) -> Result<Identity, Self::Error> { unimplemented!() }
    async fn record_invitation(&self, _: Uuid, _: String) -> Result<Identity, Self::Error> { unimplemented!() }
    async fn connect(&self, _: &str, _: &str) -> Result<ConnectionView, Self::Error> { unimplemented!() }
    async fn disconnect(&self, _: Uuid, _: Uuid) -> Result<(), Self::Error> { unimplemented!() }
    async fn connections_of(&self, _: Uuid) -> Result<Vec<ConnectionView>, Self::Error> { unimplemented!() }
    async fn record_interest(&self, _: Uuid, _: Uuid) -> Result<(), Self::Error> { unimplemented!() }
    async fn withdraw_interest(&self, _: Uuid, _: Uuid) -> Result<(), Self::Error> { unimplemented!() }
    async fn outgoing_interests(&self, _: Uuid) -> Result<Vec<PublicProfile>, Self::Error> { unimplemented!() }
    async fn incoming_interests(&self, _: Uuid) -> Result<Vec<PublicProfile>, Self::Error> { unimplemented!() }
    async fn directory(&self, _: Uuid, _: Option<usize>, _: Option<usize>) -> Result<Vec<PublicProfile>, Self::Error> { unimplemented!() }
    async fn leaderboard(&self, _: Option<usize>) -> Result<Vec<LeaderboardEntry>, Self::Error> { unimplemented!() }
    async fn stats(&self) -> Result<Stats, Self::Error> { unimplemented!() }
  }

  fn make_state(password: &str) -> ApiState<SingleUserStore> {
    let identity = Identity {
      identity_id:     Uuid::new_v4(),
      display_name:    "Alice".to_owned(),
      email:           "alice@example.com".to_owned(),
      password_hash:   hash_password(password).unwrap(),
      code:            ConnectCode::new("1234"),
      organization:    None,
      interests:       vec![],
      facts:           vec![],
      avatar_ref:      None,
      invitation_ref:  None,
      avatar_attempts: 0,
      created_at:      Utc::now(),
    };
    ApiState {
      store:       Arc::new(SingleUserStore { identity }),
      admin_email: None,
    }
  }

  async fn extract(
    req:   Request<axum::body::Body>,
    state: &ApiState<SingleUserStore>,
  ) -> Result<Caller, ApiError> {
    let (mut parts, _) = req.into_parts();
    Caller::from_request_parts(&mut parts, state).await
  }

  fn basic(email: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{email}:{pass}")))
  }

  #[tokio::test]
  async fn correct_credentials_resolve_the_member() {
    let state = make_state("secret");
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("alice@example.com", "secret"))
      .body(axum::body::Body::empty())
      .unwrap();
    let caller = extract(req, &state).await.unwrap();
    assert_eq!(caller.0.email, "alice@example.com");
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let state = make_state("secret");
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("alice@example.com", "wrong"))
      .body(axum::body::Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }

  #[tokio::test]
  async fn unknown_email_is_rejected() {
    let state = make_state("secret");
    let req = Request::builder()
      .header(header::AUTHORIZATION, basic("bob@example.com", "secret"))
      .body(axum::body::Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }

  #[tokio::test]
  async fn missing_header_is_rejected() {
    let state = make_state("secret");
    let req = Request::builder().body(axum::body::Body::empty()).unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }

  #[tokio::test]
  async fn invalid_base64_is_rejected() {
    let state = make_state("secret");
    let req = Request::builder()
      .header(header::AUTHORIZATION, "Basic !!!not-base64!!!")
      .body(axum::body::Body::empty())
      .unwrap();
    assert!(matches!(extract(req, &state).await, Err(ApiError::Unauthorized)));
  }

  #[test]
  fn verify_rejects_a_malformed_phc_string() {
    assert!(!verify_password("secret", "not-a-phc-string"));
  }
}
