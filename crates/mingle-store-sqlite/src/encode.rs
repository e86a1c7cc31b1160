//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. The interest and fact
//! lists are stored as compact JSON arrays. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use mingle_core::{
  code::ConnectCode,
  connection::{ConnectionEdge, ConnectionView},
  identity::{Identity, PublicProfile},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── ConnectCode ─────────────────────────────────────────────────────────────

pub fn decode_code(s: String) -> Result<ConnectCode> {
  if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
    return Err(Error::Decode(format!("malformed connect code: {s:?}")));
  }
  Ok(ConnectCode::new(s))
}

// ─── String lists ────────────────────────────────────────────────────────────

pub fn encode_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_list(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `identities` row.
pub struct RawIdentity {
  pub identity_id:     String,
  pub display_name:    String,
  pub email:           String,
  pub password_hash:   String,
  pub code:            String,
  pub organization:    Option<String>,
  pub interests:       String,
  pub facts:           String,
  pub avatar_ref:      Option<String>,
  pub invitation_ref:  Option<String>,
  pub avatar_attempts: i64,
  pub created_at:      String,
}

impl RawIdentity {
  /// The column list every identity SELECT uses, in `read` order.
  pub const COLUMNS: &'static str = "identity_id, display_name, email, \
     password_hash, code, organization, interests, facts, avatar_ref, \
     invitation_ref, avatar_attempts, created_at";

  /// [`Self::COLUMNS`] with every column qualified by a table alias, for
  /// SELECTs that join `identities` against a table with clashing names.
  pub fn columns_prefixed(alias: &str) -> String {
    Self::COLUMNS
      .split(',')
      .map(|c| format!("{alias}.{}", c.trim()))
      .collect::<Vec<_>>()
      .join(", ")
  }

  /// Map a row whose first columns follow [`Self::COLUMNS`], starting at
  /// `offset`.
  pub fn read(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      identity_id:     row.get(offset)?,
      display_name:    row.get(offset + 1)?,
      email:           row.get(offset + 2)?,
      password_hash:   row.get(offset + 3)?,
      code:            row.get(offset + 4)?,
      organization:    row.get(offset + 5)?,
      interests:       row.get(offset + 6)?,
      facts:           row.get(offset + 7)?,
      avatar_ref:      row.get(offset + 8)?,
      invitation_ref:  row.get(offset + 9)?,
      avatar_attempts: row.get(offset + 10)?,
      created_at:      row.get(offset + 11)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      identity_id:     decode_uuid(&self.identity_id)?,
      display_name:    self.display_name,
      email:           self.email,
      password_hash:   self.password_hash,
      code:            decode_code(self.code)?,
      organization:    self.organization,
      interests:       decode_list(&self.interests)?,
      facts:           decode_list(&self.facts)?,
      avatar_ref:      self.avatar_ref,
      invitation_ref:  self.invitation_ref,
      avatar_attempts: u32::try_from(self.avatar_attempts).map_err(|_| {
        Error::Decode(format!(
          "avatar_attempts out of range: {}",
          self.avatar_attempts
        ))
      })?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }

  pub fn into_profile(self) -> Result<PublicProfile> {
    self.into_identity().map(PublicProfile::from)
  }
}

/// Raw strings read directly from a `connections` row.
pub struct RawEdge {
  pub owner_id:     String,
  pub peer_id:      String,
  pub disconnected: bool,
  pub created_at:   String,
}

impl RawEdge {
  pub fn into_edge(self) -> Result<ConnectionEdge> {
    Ok(ConnectionEdge {
      owner_id:     decode_uuid(&self.owner_id)?,
      peer_id:      decode_uuid(&self.peer_id)?,
      disconnected: self.disconnected,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// A `connections` row joined with the peer's identity row.
pub struct RawConnection {
  pub disconnected: bool,
  pub created_at:   String,
  pub peer:         RawIdentity,
}

impl RawConnection {
  pub fn into_view(self) -> Result<ConnectionView> {
    Ok(ConnectionView {
      peer:         self.peer.into_profile()?,
      disconnected: self.disconnected,
      connected_at: decode_dt(&self.created_at)?,
    })
  }
}
