//! Handlers for registration and the member's own account.
//!
//! | Method  | Path             | Notes |
//! |---------|------------------|-------|
//! | `POST`  | `/register`      | Open; returns the new account with its code |
//! | `GET`   | `/me`            | Basic auth |
//! | `PATCH` | `/me`            | Partial profile edit |
//! | `POST`  | `/me/avatar`     | Record a generated avatar reference |
//! | `POST`  | `/me/invitation` | Record a generated invitation reference |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use mingle_core::{
  identity::{AccountView, NewIdentity, ProfileUpdate},
  store::IdentityStore,
};
use serde::Deserialize;

use crate::{ApiState, auth::{Caller, hash_password}, error::ApiError};

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub display_name: String,
  pub email:        String,
  pub password:     String,
  #[serde(default)]
  pub organization: Option<String>,
  #[serde(default)]
  pub interests:    Vec<String>,
  #[serde(default)]
  pub facts:        Vec<String>,
}

/// `POST /register`
pub async fn register<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IdentityStore,
{
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("Password must not be empty".to_owned()));
  }

  let input = NewIdentity {
    display_name:  body.display_name,
    email:         body.email,
    password_hash: hash_password(&body.password)?,
    organization:  body.organization,
    interests:     body.interests,
    facts:         body.facts,
  };

  let identity = state
    .store
    .register(input)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(AccountView::from(identity))))
}

// ─── Own account ─────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn me(Caller(identity): Caller) -> Json<AccountView> {
  Json(AccountView::from(identity))
}

/// `PATCH /me`
pub async fn update<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
  Json(body): Json<ProfileUpdate>,
) -> Result<Json<AccountView>, ApiError>
where
  S: IdentityStore,
{
  let updated = state
    .store
    .update_profile(identity.identity_id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(AccountView::from(updated)))
}

// ─── Generated assets ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssetBody {
  pub reference: String,
}

/// `POST /me/avatar`
pub async fn set_avatar<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
  Json(body): Json<AssetBody>,
) -> Result<Json<AccountView>, ApiError>
where
  S: IdentityStore,
{
  let updated = state
    .store
    .record_avatar(identity.identity_id, body.reference)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(AccountView::from(updated)))
}

/// `POST /me/invitation`
pub async fn set_invitation<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
  Json(body): Json<AssetBody>,
) -> Result<Json<AccountView>, ApiError>
where
  S: IdentityStore,
{
  let updated = state
    .store
    .record_invitation(identity.identity_id, body.reference)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(AccountView::from(updated)))
}
