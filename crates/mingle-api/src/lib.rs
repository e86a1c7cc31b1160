//! JSON REST API for Mingle.
//!
//! Exposes an axum [`Router`] backed by any
//! [`mingle_core::store::IdentityStore`]. TLS and transport concerns are the
//! caller's responsibility; authentication is HTTP Basic against the stored
//! member credentials, verified per request by the [`auth::Caller`]
//! extractor.

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod connections;
pub mod directory;
pub mod error;
pub mod interests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use mingle_core::store::IdentityStore;

pub use error::ApiError;

/// Shared state threaded through all handlers.
#[derive(Clone)]
pub struct ApiState<S> {
  pub store:       Arc<S>,
  /// Email address of the member allowed to read `/admin/stats`.
  pub admin_email: Option<String>,
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: IdentityStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Accounts
    .route("/register", post(accounts::register::<S>))
    .route("/me", get(accounts::me).patch(accounts::update::<S>))
    .route("/me/avatar", post(accounts::set_avatar::<S>))
    .route("/me/invitation", post(accounts::set_invitation::<S>))
    // Connections
    .route(
      "/connections",
      post(connections::create::<S>).get(connections::list::<S>),
    )
    .route("/connections/{peer_id}", delete(connections::remove::<S>))
    // Interest signals
    .route("/interests/outgoing", get(interests::outgoing::<S>))
    .route("/interests/incoming", get(interests::incoming::<S>))
    .route(
      "/interests/{peer_id}",
      post(interests::add::<S>).delete(interests::withdraw::<S>),
    )
    // Projections
    .route("/directory", get(directory::list::<S>))
    .route("/leaderboard", get(directory::leaderboard::<S>))
    .route("/admin/stats", get(admin::stats::<S>))
    .with_state(state)
}
