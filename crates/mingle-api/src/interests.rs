//! Handlers for the "see you soon" interest-signal endpoints.
//!
//! | Method   | Path                  | Notes |
//! |----------|-----------------------|-------|
//! | `POST`   | `/interests/{peer_id}`| Idempotent add |
//! | `DELETE` | `/interests/{peer_id}`| No-op if absent |
//! | `GET`    | `/interests/outgoing` | Members I signaled |
//! | `GET`    | `/interests/incoming` | Members who signaled me |

use axum::{
  Json,
  extract::{Path, State},
};
use mingle_core::{identity::PublicProfile, store::IdentityStore};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{ApiState, auth::Caller, error::ApiError};

#[derive(Debug, Serialize)]
pub struct InterestList {
  pub users: Vec<PublicProfile>,
  pub count: usize,
}

/// `POST /interests/{peer_id}`
pub async fn add<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
  Path(peer_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: IdentityStore,
{
  state
    .store
    .record_interest(identity.identity_id, peer_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(json!({ "message": "Interest recorded" })))
}

/// `DELETE /interests/{peer_id}`
pub async fn withdraw<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
  Path(peer_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: IdentityStore,
{
  state
    .store
    .withdraw_interest(identity.identity_id, peer_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(json!({ "message": "Interest withdrawn" })))
}

/// `GET /interests/outgoing`
pub async fn outgoing<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
) -> Result<Json<InterestList>, ApiError>
where
  S: IdentityStore,
{
  let users = state
    .store
    .outgoing_interests(identity.identity_id)
    .await
    .map_err(ApiError::from_store)?;
  let count = users.len();
  Ok(Json(InterestList { users, count }))
}

/// `GET /interests/incoming`
pub async fn incoming<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
) -> Result<Json<InterestList>, ApiError>
where
  S: IdentityStore,
{
  let users = state
    .store
    .incoming_interests(identity.identity_id)
    .await
    .map_err(ApiError::from_store)?;
  let count = users.len();
  Ok(Json(InterestList { users, count }))
}
