//! Identity — a registered member record, plus its outward-facing views.
//!
//! The full [`Identity`] carries the password hash and is never serialized
//! directly; handlers return [`AccountView`] (the member's own record) or
//! [`PublicProfile`] (what other members see).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::code::ConnectCode;

/// How many avatar generations a member may trigger before the cap.
pub const MAX_AVATAR_ATTEMPTS: u32 = 3;

/// A registered member.
#[derive(Debug, Clone)]
pub struct Identity {
  pub identity_id:     Uuid,
  pub display_name:    String,
  pub email:           String,
  /// Argon2 PHC string. Intentionally not serializable.
  pub password_hash:   String,
  pub code:            ConnectCode,
  pub organization:    Option<String>,
  pub interests:       Vec<String>,
  pub facts:           Vec<String>,
  pub avatar_ref:      Option<String>,
  pub invitation_ref:  Option<String>,
  pub avatar_attempts: u32,
  pub created_at:      DateTime<Utc>,
}

/// Input for registering a new member. The code, id, and timestamp are
/// assigned by the store; the password is already hashed by the caller.
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub display_name:  String,
  pub email:         String,
  pub password_hash: String,
  pub organization:  Option<String>,
  pub interests:     Vec<String>,
  pub facts:         Vec<String>,
}

/// A partial profile edit. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
  pub display_name: Option<String>,
  pub organization: Option<String>,
  pub interests:    Option<Vec<String>>,
  pub facts:        Option<Vec<String>>,
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// The connection-facing fields of a member, shown to other members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
  pub identity_id:  Uuid,
  pub display_name: String,
  pub code:         ConnectCode,
  pub email:        String,
  pub organization: Option<String>,
  pub interests:    Vec<String>,
  pub avatar_ref:   Option<String>,
  pub created_at:   DateTime<Utc>,
}

impl From<Identity> for PublicProfile {
  fn from(identity: Identity) -> Self {
    Self {
      identity_id:  identity.identity_id,
      display_name: identity.display_name,
      code:         identity.code,
      email:        identity.email,
      organization: identity.organization,
      interests:    identity.interests,
      avatar_ref:   identity.avatar_ref,
      created_at:   identity.created_at,
    }
  }
}

/// A member's view of their own record — everything except the credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
  pub identity_id:     Uuid,
  pub display_name:    String,
  pub email:           String,
  pub code:            ConnectCode,
  pub organization:    Option<String>,
  pub interests:       Vec<String>,
  pub facts:           Vec<String>,
  pub avatar_ref:      Option<String>,
  pub invitation_ref:  Option<String>,
  pub avatar_attempts: u32,
  pub created_at:      DateTime<Utc>,
}

impl From<Identity> for AccountView {
  fn from(identity: Identity) -> Self {
    Self {
      identity_id:     identity.identity_id,
      display_name:    identity.display_name,
      email:           identity.email,
      code:            identity.code,
      organization:    identity.organization,
      interests:       identity.interests,
      facts:           identity.facts,
      avatar_ref:      identity.avatar_ref,
      invitation_ref:  identity.invitation_ref,
      avatar_attempts: identity.avatar_attempts,
      created_at:      identity.created_at,
    }
  }
}
