//! HTTP server assembly for Mingle.
//!
//! Wraps the [`mingle_api`] router with request tracing and owns the
//! runtime configuration the binary deserialises from `config.toml`.

use std::path::PathBuf;

use axum::Router;
use mingle_api::ApiState;
use mingle_core::store::IdentityStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Runtime server configuration, deserialised from `config.toml` plus
/// `MINGLE_*` environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  pub store_path:  PathBuf,
  /// Member allowed to read `/admin/stats`; unset means nobody.
  #[serde(default)]
  pub admin_email: Option<String>,
}

/// Build the application router for `state`.
pub fn router<S>(state: ApiState<S>) -> Router
where
  S: IdentityStore + Clone + Send + Sync + 'static,
{
  mingle_api::api_router(state).layer(TraceLayer::new_for_http())
}

// ─── Integration tests ───────────────────────────────────────────────────────
