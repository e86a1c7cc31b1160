//! Connection edges and the pure transition rules over them.
//!
//! A relationship between members A and B is stored as two mirrored edges:
//! one owned by A referencing B, one owned by B referencing A. After any
//! successful operation both edges carry the same `disconnected` flag; the
//! store enforces this by writing both sides in one transaction.
//!
//! The edge pair is a two-state machine: `Connect` takes it from nonexistent
//! to Active and from Disconnected back to Active; `Disconnect` takes it from
//! Active to Disconnected. Edges are never removed once created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, identity::PublicProfile};

/// One side of a stored relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEdge {
  pub owner_id:     Uuid,
  pub peer_id:      Uuid,
  pub disconnected: bool,
  pub created_at:   DateTime<Utc>,
}

/// What `Connect` must do to the pair, decided from the caller's side alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPlan {
  /// No edge exists yet: insert an active edge on both sides.
  CreatePair,
  /// A disconnected edge exists: reactivate the caller's edge and upsert
  /// the mirror, repairing it if it is missing.
  Reactivate,
}

/// Decide how `Connect` proceeds given the caller's existing edge to the
/// target, if any.
pub fn plan_connect(caller_edge: Option<&ConnectionEdge>) -> Result<ConnectPlan> {
  match caller_edge {
    None => Ok(ConnectPlan::CreatePair),
    Some(edge) if edge.disconnected => Ok(ConnectPlan::Reactivate),
    Some(edge) => Err(Error::AlreadyConnected(edge.peer_id)),
  }
}

/// Validate that `Disconnect` may proceed: the caller must hold an active
/// edge to the peer. A missing edge and an already-disconnected edge are
/// both rejected, and nothing is modified.
pub fn plan_disconnect(
  peer_id:     Uuid,
  caller_edge: Option<&ConnectionEdge>,
) -> Result<()> {
  match caller_edge {
    Some(edge) if !edge.disconnected => Ok(()),
    _ => Err(Error::ConnectionNotFound(peer_id)),
  }
}

/// An edge joined with the peer's public profile — what connection listings
/// and the `Connect` response carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionView {
  #[serde(flatten)]
  pub peer:         PublicProfile,
  pub disconnected: bool,
  pub connected_at: DateTime<Utc>,
}
