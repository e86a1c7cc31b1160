//! [`SqliteStore`] — the SQLite implementation of [`IdentityStore`].
//!
//! Every trait method delegates to a plain function that runs on the
//! dedicated connection thread via [`tokio_rusqlite::Connection::call`].
//! Operations with cross-row invariants (`register`, `connect`,
//! `disconnect`) run inside a transaction, so the mirror invariant on
//! connection pairs cannot be observed half-written.

use std::path::Path;

use chrono::Utc;
use rand_core::OsRng;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use mingle_core::{
  Error as CoreError,
  code::{allocation_schedule, random_code},
  connection::{ConnectPlan, ConnectionEdge, ConnectionView, plan_connect, plan_disconnect},
  identity::{Identity, MAX_AVATAR_ATTEMPTS, NewIdentity, ProfileUpdate, PublicProfile},
  store::{IdentityStore, LeaderboardEntry, Stats},
};

use crate::{
  Error, Result,
  encode::{RawConnection, RawEdge, RawIdentity, encode_dt, encode_list, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mingle identity store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run arbitrary SQL against the backing database, for tests that need
  /// to stage row states no store operation produces.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// SQLite treats a negative `LIMIT` as unlimited, so an out-of-range
/// `usize` must clamp rather than wrap.
fn sql_bound(n: usize) -> i64 {
  i64::try_from(n).unwrap_or(i64::MAX)
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

/// Fetch one identity by an exact match on `column` (always a literal at
/// the call site: `identity_id`, `email`, or `code`).
fn find_identity(
  conn:   &rusqlite::Connection,
  column: &str,
  value:  &str,
) -> Result<Option<Identity>> {
  let sql = format!(
    "SELECT {} FROM identities WHERE {column} = ?1",
    RawIdentity::COLUMNS
  );
  let raw = conn
    .query_row(&sql, rusqlite::params![value], |row| {
      RawIdentity::read(row, 0)
    })
    .optional()?;
  raw.map(RawIdentity::into_identity).transpose()
}

fn require_identity(
  conn: &rusqlite::Connection,
  id:   Uuid,
) -> Result<Identity> {
  find_identity(conn, "identity_id", &encode_uuid(id))?
    .ok_or_else(|| CoreError::IdentityNotFound(id).into())
}

fn find_edge(
  conn:  &rusqlite::Connection,
  owner: Uuid,
  peer:  Uuid,
) -> Result<Option<ConnectionEdge>> {
  let raw = conn
    .query_row(
      "SELECT owner_id, peer_id, disconnected, created_at
       FROM connections WHERE owner_id = ?1 AND peer_id = ?2",
      rusqlite::params![encode_uuid(owner), encode_uuid(peer)],
      |row| {
        Ok(RawEdge {
          owner_id:     row.get(0)?,
          peer_id:      row.get(1)?,
          disconnected: row.get(2)?,
          created_at:   row.get(3)?,
        })
      },
    )
    .optional()?;
  raw.map(RawEdge::into_edge).transpose()
}

fn row_exists(
  conn:   &rusqlite::Connection,
  sql:    &str,
  value:  &str,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![value], |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

// ─── Write operations (run on the connection thread) ─────────────────────────

fn register_tx(
  conn:  &mut rusqlite::Connection,
  input: NewIdentity,
) -> Result<Identity> {
  let tx = conn.transaction()?;

  if row_exists(&tx, "SELECT 1 FROM identities WHERE email = ?1", &input.email)? {
    return Err(CoreError::EmailTaken(input.email).into());
  }

  // Bounded rejection sampling: 4-digit codes first, widening on
  // exhaustion instead of looping forever.
  let mut code = None;
  for width in allocation_schedule() {
    let candidate = random_code(width, &mut OsRng);
    let taken = row_exists(
      &tx,
      "SELECT 1 FROM identities WHERE code = ?1",
      candidate.as_str(),
    )?;
    if !taken {
      code = Some(candidate);
      break;
    }
  }
  let Some(code) = code else {
    return Err(CoreError::CodeSpaceExhausted.into());
  };

  let identity = Identity {
    identity_id:     Uuid::new_v4(),
    display_name:    input.display_name,
    email:           input.email,
    password_hash:   input.password_hash,
    code,
    organization:    input.organization,
    interests:       input.interests,
    facts:           input.facts,
    avatar_ref:      None,
    invitation_ref:  None,
    avatar_attempts: 0,
    created_at:      Utc::now(),
  };

  tx.execute(
    "INSERT INTO identities (
       identity_id, display_name, email, password_hash, code, organization,
       interests, facts, avatar_ref, invitation_ref, avatar_attempts,
       created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    rusqlite::params![
      encode_uuid(identity.identity_id),
      identity.display_name,
      identity.email,
      identity.password_hash,
      identity.code.as_str(),
      identity.organization,
      encode_list(&identity.interests)?,
      encode_list(&identity.facts)?,
      identity.avatar_ref,
      identity.invitation_ref,
      identity.avatar_attempts,
      encode_dt(identity.created_at),
    ],
  )?;

  tx.commit()?;
  Ok(identity)
}

fn connect_tx(
  conn:        &mut rusqlite::Connection,
  caller_code: &str,
  target_code: &str,
) -> Result<ConnectionView> {
  let tx = conn.transaction()?;

  let caller = find_identity(&tx, "code", caller_code)?
    .ok_or_else(|| CoreError::CodeNotFound(caller_code.to_owned()))?;
  let target = find_identity(&tx, "code", target_code)?
    .ok_or_else(|| CoreError::CodeNotFound(target_code.to_owned()))?;

  let edge = find_edge(&tx, caller.identity_id, target.identity_id)?;
  let plan = plan_connect(edge.as_ref()).map_err(Error::Core)?;

  let now = Utc::now();
  let caller_id = encode_uuid(caller.identity_id);
  let target_id = encode_uuid(target.identity_id);

  let connected_at = match plan {
    ConnectPlan::CreatePair => {
      let insert = "INSERT INTO connections (owner_id, peer_id, disconnected, created_at)
                    VALUES (?1, ?2, 0, ?3)";
      // The compound PK is the atomic backstop against a racing duplicate
      // connect: the second insert fails instead of creating a second pair.
      if let Err(e) = tx.execute(
        insert,
        rusqlite::params![caller_id, target_id, encode_dt(now)],
      ) {
        if is_constraint_violation(&e) {
          return Err(CoreError::AlreadyConnected(target.identity_id).into());
        }
        return Err(e.into());
      }
      // Upsert the mirror: a stray mirror-only row gets repaired instead
      // of tripping the PK.
      tx.execute(
        "INSERT INTO connections (owner_id, peer_id, disconnected, created_at)
         VALUES (?1, ?2, 0, ?3)
         ON CONFLICT (owner_id, peer_id) DO UPDATE SET disconnected = 0",
        rusqlite::params![target_id, caller_id, encode_dt(now)],
      )?;
      now
    }
    ConnectPlan::Reactivate => {
      tx.execute(
        "UPDATE connections SET disconnected = 0
         WHERE owner_id = ?1 AND peer_id = ?2",
        rusqlite::params![caller_id, target_id],
      )?;
      // Upsert the mirror: a missing mirror row is a data anomaly that
      // reconnection repairs rather than preserves.
      tx.execute(
        "INSERT INTO connections (owner_id, peer_id, disconnected, created_at)
         VALUES (?1, ?2, 0, ?3)
         ON CONFLICT (owner_id, peer_id) DO UPDATE SET disconnected = 0",
        rusqlite::params![target_id, caller_id, encode_dt(now)],
      )?;
      edge.as_ref().map(|e| e.created_at).unwrap_or(now)
    }
  };

  tx.commit()?;

  Ok(ConnectionView {
    peer:         PublicProfile::from(target),
    disconnected: false,
    connected_at,
  })
}

fn disconnect_tx(
  conn:      &mut rusqlite::Connection,
  caller_id: Uuid,
  peer_id:   Uuid,
) -> Result<()> {
  let tx = conn.transaction()?;

  let edge = find_edge(&tx, caller_id, peer_id)?;
  plan_disconnect(peer_id, edge.as_ref()).map_err(Error::Core)?;

  tx.execute(
    "UPDATE connections SET disconnected = 1
     WHERE owner_id = ?1 AND peer_id = ?2",
    rusqlite::params![encode_uuid(caller_id), encode_uuid(peer_id)],
  )?;
  // Mirror side, if present. Zero rows affected is fine.
  tx.execute(
    "UPDATE connections SET disconnected = 1
     WHERE owner_id = ?1 AND peer_id = ?2",
    rusqlite::params![encode_uuid(peer_id), encode_uuid(caller_id)],
  )?;

  tx.commit()?;
  Ok(())
}

fn update_profile_tx(
  conn:   &rusqlite::Connection,
  id:     Uuid,
  update: ProfileUpdate,
) -> Result<Identity> {
  let mut identity = require_identity(conn, id)?;

  if let Some(name) = update.display_name {
    identity.display_name = name;
  }
  if let Some(org) = update.organization {
    identity.organization = Some(org);
  }
  if let Some(interests) = update.interests {
    identity.interests = interests;
  }
  if let Some(facts) = update.facts {
    identity.facts = facts;
  }

  conn.execute(
    "UPDATE identities
     SET display_name = ?2, organization = ?3, interests = ?4, facts = ?5
     WHERE identity_id = ?1",
    rusqlite::params![
      encode_uuid(id),
      identity.display_name,
      identity.organization,
      encode_list(&identity.interests)?,
      encode_list(&identity.facts)?,
    ],
  )?;

  Ok(identity)
}

fn record_avatar_tx(
  conn:      &rusqlite::Connection,
  id:        Uuid,
  reference: String,
) -> Result<Identity> {
  let mut identity = require_identity(conn, id)?;

  if identity.avatar_attempts >= MAX_AVATAR_ATTEMPTS {
    return Err(CoreError::AvatarAttemptsExhausted.into());
  }
  identity.avatar_ref = Some(reference);
  identity.avatar_attempts += 1;

  conn.execute(
    "UPDATE identities SET avatar_ref = ?2, avatar_attempts = ?3
     WHERE identity_id = ?1",
    rusqlite::params![
      encode_uuid(id),
      identity.avatar_ref,
      identity.avatar_attempts,
    ],
  )?;

  Ok(identity)
}

fn record_invitation_tx(
  conn:      &rusqlite::Connection,
  id:        Uuid,
  reference: String,
) -> Result<Identity> {
  let mut identity = require_identity(conn, id)?;
  identity.invitation_ref = Some(reference);

  conn.execute(
    "UPDATE identities SET invitation_ref = ?2 WHERE identity_id = ?1",
    rusqlite::params![encode_uuid(id), identity.invitation_ref],
  )?;

  Ok(identity)
}

fn record_interest_tx(
  conn:      &rusqlite::Connection,
  caller_id: Uuid,
  peer_id:   Uuid,
) -> Result<()> {
  let peer_exists = row_exists(
    conn,
    "SELECT 1 FROM identities WHERE identity_id = ?1",
    &encode_uuid(peer_id),
  )?;
  if !peer_exists {
    return Err(CoreError::IdentityNotFound(peer_id).into());
  }

  // Idempotent: the compound PK swallows repeats.
  conn.execute(
    "INSERT OR IGNORE INTO interest_signals (owner_id, peer_id, created_at)
     VALUES (?1, ?2, ?3)",
    rusqlite::params![
      encode_uuid(caller_id),
      encode_uuid(peer_id),
      encode_dt(Utc::now()),
    ],
  )?;
  Ok(())
}

// ─── Read operations (run on the connection thread) ──────────────────────────

fn connections_of_rows(
  conn: &rusqlite::Connection,
  id:   Uuid,
) -> Result<Vec<ConnectionView>> {
  let sql = format!(
    "SELECT c.disconnected, c.created_at, {}
     FROM connections c
     JOIN identities i ON i.identity_id = c.peer_id
     WHERE c.owner_id = ?1
     ORDER BY c.created_at DESC",
    RawIdentity::columns_prefixed("i")
  );

  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(rusqlite::params![encode_uuid(id)], |row| {
      Ok(RawConnection {
        disconnected: row.get(0)?,
        created_at:   row.get(1)?,
        peer:         RawIdentity::read(row, 2)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows.into_iter().map(RawConnection::into_view).collect()
}

fn interest_profiles(
  conn:     &rusqlite::Connection,
  id:       Uuid,
  incoming: bool,
) -> Result<Vec<PublicProfile>> {
  // Outgoing: members I signaled. Incoming: members whose signal lists
  // contain me (the reverse lookup).
  let (join_col, where_col) = if incoming {
    ("s.owner_id", "s.peer_id")
  } else {
    ("s.peer_id", "s.owner_id")
  };

  let sql = format!(
    "SELECT {}
     FROM interest_signals s
     JOIN identities i ON i.identity_id = {join_col}
     WHERE {where_col} = ?1
     ORDER BY s.created_at DESC",
    RawIdentity::columns_prefixed("i")
  );

  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(rusqlite::params![encode_uuid(id)], |row| {
      RawIdentity::read(row, 0)
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows.into_iter().map(RawIdentity::into_profile).collect()
}

fn directory_rows(
  conn:   &rusqlite::Connection,
  viewer: Uuid,
  limit:  usize,
  offset: usize,
) -> Result<Vec<PublicProfile>> {
  let sql = format!(
    "SELECT {} FROM identities
     WHERE identity_id != ?1
     ORDER BY created_at DESC
     LIMIT ?2 OFFSET ?3",
    RawIdentity::COLUMNS
  );

  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(
      rusqlite::params![encode_uuid(viewer), sql_bound(limit), sql_bound(offset)],
      |row| RawIdentity::read(row, 0),
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows.into_iter().map(RawIdentity::into_profile).collect()
}

fn leaderboard_rows(
  conn:  &rusqlite::Connection,
  limit: usize,
) -> Result<Vec<LeaderboardEntry>> {
  let sql = format!(
    "SELECT {}, COUNT(c.peer_id) AS active_connections
     FROM identities i
     LEFT JOIN connections c
       ON c.owner_id = i.identity_id AND c.disconnected = 0
     GROUP BY i.identity_id
     ORDER BY active_connections DESC, i.display_name ASC
     LIMIT ?1",
    RawIdentity::columns_prefixed("i")
  );

  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(rusqlite::params![sql_bound(limit)], |row| {
      Ok((RawIdentity::read(row, 0)?, row.get::<_, i64>(12)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(raw, count)| {
      Ok(LeaderboardEntry {
        member:             raw.into_profile()?,
        active_connections: count as u32,
      })
    })
    .collect()
}

fn stats_rows(conn: &rusqlite::Connection) -> Result<Stats> {
  fn scalar(conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<u64> {
    conn.query_row(sql, [], |r| r.get::<_, i64>(0)).map(|v| v as u64)
  }

  Ok(Stats {
    members: scalar(conn, "SELECT COUNT(*) FROM identities")?,
    // A pair is two mirrored rows; `owner_id < peer_id` picks one of them.
    active_connection_pairs: scalar(
      conn,
      "SELECT COUNT(*) FROM connections
       WHERE disconnected = 0 AND owner_id < peer_id",
    )?,
    total_connection_pairs: scalar(
      conn,
      "SELECT COUNT(*) FROM connections WHERE owner_id < peer_id",
    )?,
    interest_signals: scalar(conn, "SELECT COUNT(*) FROM interest_signals")?,
    members_with_avatar: scalar(
      conn,
      "SELECT COUNT(*) FROM identities WHERE avatar_ref IS NOT NULL",
    )?,
    members_with_invitation: scalar(
      conn,
      "SELECT COUNT(*) FROM identities WHERE invitation_ref IS NOT NULL",
    )?,
  })
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn register(&self, input: NewIdentity) -> Result<Identity> {
    self.conn.call(move |conn| Ok(register_tx(conn, input))).await?
  }

  async fn identity(&self, id: Uuid) -> Result<Option<Identity>> {
    self
      .conn
      .call(move |conn| Ok(find_identity(conn, "identity_id", &encode_uuid(id))))
      .await?
  }

  async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
    let email = email.to_owned();
    self
      .conn
      .call(move |conn| Ok(find_identity(conn, "email", &email)))
      .await?
  }

  async fn identity_by_code(&self, code: &str) -> Result<Option<Identity>> {
    let code = code.to_owned();
    self
      .conn
      .call(move |conn| Ok(find_identity(conn, "code", &code)))
      .await?
  }

  async fn update_profile(
    &self,
    id: Uuid,
    update: ProfileUpdate,
  ) -> Result<Identity> {
    self
      .conn
      .call(move |conn| Ok(update_profile_tx(conn, id, update)))
      .await?
  }

  async fn record_avatar(&self, id: Uuid, reference: String) -> Result<Identity> {
    self
      .conn
      .call(move |conn| Ok(record_avatar_tx(conn, id, reference)))
      .await?
  }

  async fn record_invitation(
    &self,
    id: Uuid,
    reference: String,
  ) -> Result<Identity> {
    self
      .conn
      .call(move |conn| Ok(record_invitation_tx(conn, id, reference)))
      .await?
  }

  // ── Connections ───────────────────────────────────────────────────────────

  async fn connect(
    &self,
    caller_code: &str,
    target_code: &str,
  ) -> Result<ConnectionView> {
    // Codes are unique, so equal codes resolve to the same identity.
    if caller_code == target_code {
      return Err(CoreError::SelfConnection.into());
    }
    let caller_code = caller_code.to_owned();
    let target_code = target_code.to_owned();
    self
      .conn
      .call(move |conn| Ok(connect_tx(conn, &caller_code, &target_code)))
      .await?
  }

  async fn disconnect(&self, caller_id: Uuid, peer_id: Uuid) -> Result<()> {
    self
      .conn
      .call(move |conn| Ok(disconnect_tx(conn, caller_id, peer_id)))
      .await?
  }

  async fn connections_of(&self, id: Uuid) -> Result<Vec<ConnectionView>> {
    self
      .conn
      .call(move |conn| Ok(connections_of_rows(conn, id)))
      .await?
  }

  // ── Interest signals ──────────────────────────────────────────────────────

  async fn record_interest(&self, caller_id: Uuid, peer_id: Uuid) -> Result<()> {
    self
      .conn
      .call(move |conn| Ok(record_interest_tx(conn, caller_id, peer_id)))
      .await?
  }

  async fn withdraw_interest(
    &self,
    caller_id: Uuid,
    peer_id: Uuid,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM interest_signals WHERE owner_id = ?1 AND peer_id = ?2",
          rusqlite::params![encode_uuid(caller_id), encode_uuid(peer_id)],
        )?;
        Ok(Ok(()))
      })
      .await?
  }

  async fn outgoing_interests(
    &self,
    caller_id: Uuid,
  ) -> Result<Vec<PublicProfile>> {
    self
      .conn
      .call(move |conn| Ok(interest_profiles(conn, caller_id, false)))
      .await?
  }

  async fn incoming_interests(
    &self,
    caller_id: Uuid,
  ) -> Result<Vec<PublicProfile>> {
    self
      .conn
      .call(move |conn| Ok(interest_profiles(conn, caller_id, true)))
      .await?
  }

  // ── Projections ───────────────────────────────────────────────────────────

  async fn directory(
    &self,
    viewer: Uuid,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> Result<Vec<PublicProfile>> {
    let limit = limit.unwrap_or(100);
    let offset = offset.unwrap_or(0);
    self
      .conn
      .call(move |conn| Ok(directory_rows(conn, viewer, limit, offset)))
      .await?
  }

  async fn leaderboard(&self, limit: Option<usize>) -> Result<Vec<LeaderboardEntry>> {
    let limit = limit.unwrap_or(100);
    self
      .conn
      .call(move |conn| Ok(leaderboard_rows(conn, limit)))
      .await?
  }

  async fn stats(&self) -> Result<Stats> {
    self.conn.call(move |conn| Ok(stats_rows(conn))).await?
  }
}
