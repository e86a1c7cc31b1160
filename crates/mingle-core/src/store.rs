//! The `IdentityStore` trait and supporting query/result types.
//!
//! The trait is implemented by storage backends (e.g. `mingle-store-sqlite`).
//! Higher layers (`mingle-api`, `mingle-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  connection::ConnectionView,
  identity::{Identity, NewIdentity, ProfileUpdate, PublicProfile},
};

// ─── Result types ────────────────────────────────────────────────────────────

/// One leaderboard row: a member and their active-connection count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  #[serde(flatten)]
  pub member:             PublicProfile,
  pub active_connections: u32,
}

/// Admin-facing aggregates. Connection pairs are counted once, not once per
/// side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
  pub members:                 u64,
  pub active_connection_pairs: u64,
  pub total_connection_pairs:  u64,
  pub interest_signals:        u64,
  pub members_with_avatar:     u64,
  pub members_with_invitation: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Mingle identity store backend.
///
/// Single-identity reads and writes are atomic at the document (row) level.
/// `connect` and `disconnect` touch two identities' edges and must apply
/// both writes atomically so the mirror invariant holds after every
/// successful call.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). The error type
/// converts into [`crate::Error`] so callers can match on the domain
/// taxonomy without knowing the backend.
pub trait IdentityStore: Send + Sync {
  type Error: Into<crate::Error>
    + std::error::Error
    + Send
    + Sync
    + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  /// Register a new member, allocating a unique connect code.
  ///
  /// Fails with `EmailTaken` if the email is already registered, or
  /// `CodeSpaceExhausted` if bounded rejection sampling runs out of
  /// attempts at every width.
  fn register(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Retrieve an identity by id. Returns `None` if not found.
  fn identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Retrieve an identity by email — the authentication lookup.
  fn identity_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Retrieve an identity by connect code.
  fn identity_by_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  /// Apply a partial profile edit and return the updated identity.
  fn update_profile(
    &self,
    id: Uuid,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Store an externally generated avatar reference and spend one
  /// generation attempt. Fails with `AvatarAttemptsExhausted` once
  /// [`MAX_AVATAR_ATTEMPTS`](crate::identity::MAX_AVATAR_ATTEMPTS) attempts
  /// have been used.
  fn record_avatar(
    &self,
    id: Uuid,
    reference: String,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Store an externally generated invitation-image reference.
  fn record_invitation(
    &self,
    id: Uuid,
    reference: String,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  // ── Connections ───────────────────────────────────────────────────────

  /// Create or reactivate the mirrored edge pair between the members
  /// holding the two codes. Returns the target's side of the new pair.
  fn connect<'a>(
    &'a self,
    caller_code: &'a str,
    target_code: &'a str,
  ) -> impl Future<Output = Result<ConnectionView, Self::Error>> + Send + 'a;

  /// Flag both sides of an active pair as disconnected. The edges stay in
  /// place for later reconnection.
  fn disconnect(
    &self,
    caller_id: Uuid,
    peer_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every edge owned by `id`, active or not, newest first.
  fn connections_of(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<ConnectionView>, Self::Error>> + Send + '_;

  // ── Interest signals ──────────────────────────────────────────────────

  /// Record that `caller_id` wants to meet `peer_id`. Idempotent; fails
  /// with `IdentityNotFound` if the peer does not exist.
  fn record_interest(
    &self,
    caller_id: Uuid,
    peer_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Withdraw a previously recorded signal. No-op if absent.
  fn withdraw_interest(
    &self,
    caller_id: Uuid,
    peer_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Members the caller has signaled, newest signal first.
  fn outgoing_interests(
    &self,
    caller_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PublicProfile>, Self::Error>> + Send + '_;

  /// Members who have signaled the caller (reverse lookup), newest first.
  fn incoming_interests(
    &self,
    caller_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PublicProfile>, Self::Error>> + Send + '_;

  // ── Projections ───────────────────────────────────────────────────────

  /// Member directory excluding the viewer, newest members first.
  fn directory(
    &self,
    viewer: Uuid,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> impl Future<Output = Result<Vec<PublicProfile>, Self::Error>> + Send + '_;

  /// Members ranked by active-connection count, descending; display name
  /// ascending breaks ties.
  fn leaderboard(
    &self,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, Self::Error>> + Send + '_;

  /// Admin aggregates over the whole store.
  fn stats(
    &self,
  ) -> impl Future<Output = Result<Stats, Self::Error>> + Send + '_;
}
