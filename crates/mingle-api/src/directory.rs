//! Handlers for the read-only member projections.
//!
//! | Method | Path           | Notes |
//! |--------|----------------|-------|
//! | `GET`  | `/directory`   | `?limit&offset`; excludes the viewer |
//! | `GET`  | `/leaderboard` | `?limit`; ranked by active connections |

use axum::{
  Json,
  extract::{Query, State},
};
use mingle_core::{
  identity::PublicProfile,
  store::{IdentityStore, LeaderboardEntry},
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, auth::Caller, error::ApiError};

// ─── Directory ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct DirectoryParams {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct DirectoryResponse {
  pub users: Vec<PublicProfile>,
  pub count: usize,
}

/// `GET /directory[?limit=...][&offset=...]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
  Query(params): Query<DirectoryParams>,
) -> Result<Json<DirectoryResponse>, ApiError>
where
  S: IdentityStore,
{
  let users = state
    .store
    .directory(identity.identity_id, params.limit, params.offset)
    .await
    .map_err(ApiError::from_store)?;
  let count = users.len();
  Ok(Json(DirectoryResponse { users, count }))
}

// ─── Leaderboard ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct LeaderboardParams {
  pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
  pub entries: Vec<LeaderboardEntry>,
}

/// `GET /leaderboard[?limit=...]`
pub async fn leaderboard<S>(
  State(state): State<ApiState<S>>,
  Caller(_): Caller,
  Query(params): Query<LeaderboardParams>,
) -> Result<Json<LeaderboardResponse>, ApiError>
where
  S: IdentityStore,
{
  let entries = state
    .store
    .leaderboard(params.limit)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(LeaderboardResponse { entries }))
}
