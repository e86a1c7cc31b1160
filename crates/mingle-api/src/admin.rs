//! Handler for the admin statistics endpoint.
//!
//! Admin access is by configured email: the authenticated caller's address
//! must match `admin_email`. With no admin configured the route always
//! returns 403.

use axum::{Json, extract::State};
use mingle_core::store::{IdentityStore, Stats};

use crate::{ApiState, auth::Caller, error::ApiError};

/// `GET /admin/stats`
pub async fn stats<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
) -> Result<Json<Stats>, ApiError>
where
  S: IdentityStore,
{
  let is_admin = state
    .admin_email
    .as_deref()
    .is_some_and(|admin| admin == identity.email);
  if !is_admin {
    return Err(ApiError::Forbidden);
  }

  let stats = state.store.stats().await.map_err(ApiError::from_store)?;
  Ok(Json(stats))
}
