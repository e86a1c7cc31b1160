//! Handlers for the connection endpoints.
//!
//! | Method   | Path                    | Notes |
//! |----------|-------------------------|-------|
//! | `POST`   | `/connections`          | Caller identified by supplied code, no session |
//! | `GET`    | `/connections`          | Basic auth; active + full history |
//! | `DELETE` | `/connections/{peer_id}`| Basic auth; soft disconnect |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mingle_core::{connection::ConnectionView, store::IdentityStore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{ApiState, auth::Caller, error::ApiError};

// ─── Create / reconnect ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConnectBody {
  pub caller_code: String,
  pub target_code: String,
}

/// `POST /connections`
///
/// Deliberately unauthenticated: the caller is identified by the code they
/// supply, mirroring how codes are exchanged out of band.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<ConnectBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: IdentityStore,
{
  let view = state
    .store
    .connect(&body.caller_code, &body.target_code)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(json!({ "connection": view }))))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
  /// Active connections only.
  pub connections:       Vec<ConnectionView>,
  /// Full history including disconnected edges.
  pub all_connections:   Vec<ConnectionView>,
  pub total_connections: usize,
}

/// `GET /connections`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
) -> Result<Json<ConnectionsResponse>, ApiError>
where
  S: IdentityStore,
{
  let all = state
    .store
    .connections_of(identity.identity_id)
    .await
    .map_err(ApiError::from_store)?;

  let connections: Vec<ConnectionView> =
    all.iter().filter(|c| !c.disconnected).cloned().collect();
  let total_connections = connections.len();

  Ok(Json(ConnectionsResponse {
    connections,
    all_connections: all,
    total_connections,
  }))
}

// ─── Remove ──────────────────────────────────────────────────────────────────

/// `DELETE /connections/{peer_id}`
pub async fn remove<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
  Path(peer_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: IdentityStore,
{
  state
    .store
    .disconnect(identity.identity_id, peer_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(json!({ "message": "Connection removed" })))
}
