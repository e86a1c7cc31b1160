//! Integration tests for `SqliteStore` against an in-memory database.

use mingle_core::{
  Error as CoreError,
  identity::{MAX_AVATAR_ATTEMPTS, NewIdentity, ProfileUpdate},
  store::IdentityStore,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_member(name: &str, email: &str) -> NewIdentity {
  NewIdentity {
    display_name:  name.to_owned(),
    email:         email.to_owned(),
    password_hash: "$argon2id$stub".to_owned(),
    organization:  Some("Acme".to_owned()),
    interests:     vec!["rust".to_owned(), "hiking".to_owned()],
    facts:         vec!["has a dog".to_owned()],
  }
}

fn core_err(err: Error) -> CoreError { err.into() }

// ─── Registration ────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_assigns_a_four_digit_code() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  assert_eq!(a.code.width(), 4);
  assert!(a.code.as_str().bytes().all(|b| b.is_ascii_digit()));
  assert_eq!(a.avatar_attempts, 0);
  assert!(a.avatar_ref.is_none());
}

#[tokio::test]
async fn registered_members_get_distinct_codes() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();
  assert_ne!(a.code, b.code);
}

#[tokio::test]
async fn register_duplicate_email_is_rejected() {
  let s = store().await;
  s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  let err = s
    .register(new_member("Imposter", "alice@example.com"))
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::EmailTaken(_)));
}

#[tokio::test]
async fn lookup_by_code_and_email() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  let by_code = s.identity_by_code(a.code.as_str()).await.unwrap().unwrap();
  assert_eq!(by_code.identity_id, a.identity_id);

  let by_email = s.identity_by_email("alice@example.com").await.unwrap().unwrap();
  assert_eq!(by_email.identity_id, a.identity_id);

  assert!(s.identity_by_code("0000").await.unwrap().is_none() || a.code.as_str() == "0000");
  assert!(s.identity_by_email("nobody@example.com").await.unwrap().is_none());
}

// ─── Connect ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_creates_a_mirrored_active_pair() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  let view = s.connect(a.code.as_str(), b.code.as_str()).await.unwrap();
  assert!(!view.disconnected);
  assert_eq!(view.peer.identity_id, b.identity_id);
  assert_eq!(view.peer.display_name, "Bob");
  assert_eq!(view.peer.code, b.code);
  assert_eq!(view.peer.email, "bob@example.com");

  // Both sides hold exactly one active edge referencing the other.
  let a_conns = s.connections_of(a.identity_id).await.unwrap();
  let b_conns = s.connections_of(b.identity_id).await.unwrap();
  assert_eq!(a_conns.len(), 1);
  assert_eq!(b_conns.len(), 1);
  assert_eq!(a_conns[0].peer.identity_id, b.identity_id);
  assert_eq!(b_conns[0].peer.identity_id, a.identity_id);
  assert!(!a_conns[0].disconnected);
  assert!(!b_conns[0].disconnected);
}

#[tokio::test]
async fn connect_with_own_code_is_rejected_and_writes_nothing() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  let err = s.connect(a.code.as_str(), a.code.as_str()).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::SelfConnection));

  assert!(s.connections_of(a.identity_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn connect_with_unknown_code_is_rejected() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  // Pick a code that cannot collide with Alice's 4-digit one.
  let err = s.connect(a.code.as_str(), "999999").await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::CodeNotFound(c) if c == "999999"));

  let err = s.connect("999999", a.code.as_str()).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::CodeNotFound(_)));
}

#[tokio::test]
async fn duplicate_connect_is_rejected_leaving_one_pair() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  s.connect(a.code.as_str(), b.code.as_str()).await.unwrap();
  let err = s.connect(a.code.as_str(), b.code.as_str()).await.unwrap_err();
  assert!(
    matches!(core_err(err), CoreError::AlreadyConnected(id) if id == b.identity_id)
  );

  // The reverse direction is the same pair, so it is rejected too.
  let err = s.connect(b.code.as_str(), a.code.as_str()).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::AlreadyConnected(_)));

  assert_eq!(s.connections_of(a.identity_id).await.unwrap().len(), 1);
  assert_eq!(s.connections_of(b.identity_id).await.unwrap().len(), 1);
}

// ─── Disconnect / reconnect ──────────────────────────────────────────────────

#[tokio::test]
async fn disconnect_flags_both_sides_and_keeps_the_edges() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  s.connect(a.code.as_str(), b.code.as_str()).await.unwrap();
  s.disconnect(a.identity_id, b.identity_id).await.unwrap();

  let a_conns = s.connections_of(a.identity_id).await.unwrap();
  let b_conns = s.connections_of(b.identity_id).await.unwrap();
  assert_eq!(a_conns.len(), 1, "edge must survive disconnect");
  assert_eq!(b_conns.len(), 1);
  assert!(a_conns[0].disconnected);
  assert!(b_conns[0].disconnected);
}

#[tokio::test]
async fn disconnect_without_an_active_edge_is_rejected() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  // Never connected.
  let err = s.disconnect(a.identity_id, b.identity_id).await.unwrap_err();
  assert!(
    matches!(core_err(err), CoreError::ConnectionNotFound(id) if id == b.identity_id)
  );

  // Unknown peer.
  let ghost = Uuid::new_v4();
  let err = s.disconnect(a.identity_id, ghost).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::ConnectionNotFound(_)));
}

#[tokio::test]
async fn disconnect_twice_is_rejected() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  s.connect(a.code.as_str(), b.code.as_str()).await.unwrap();
  s.disconnect(a.identity_id, b.identity_id).await.unwrap();

  let err = s.disconnect(a.identity_id, b.identity_id).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::ConnectionNotFound(_)));
}

#[tokio::test]
async fn reconnect_round_trip_restores_both_sides_without_duplicates() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  s.connect(a.code.as_str(), b.code.as_str()).await.unwrap();
  s.disconnect(a.identity_id, b.identity_id).await.unwrap();

  // Reconnection may come from either side; use the target this time.
  let view = s.connect(b.code.as_str(), a.code.as_str()).await.unwrap();
  assert!(!view.disconnected);
  assert_eq!(view.peer.identity_id, a.identity_id);

  let a_conns = s.connections_of(a.identity_id).await.unwrap();
  let b_conns = s.connections_of(b.identity_id).await.unwrap();
  assert_eq!(a_conns.len(), 1, "reconnect must not duplicate edges");
  assert_eq!(b_conns.len(), 1);
  assert!(!a_conns[0].disconnected);
  assert!(!b_conns[0].disconnected);
}

#[tokio::test]
async fn reconnect_recreates_a_missing_mirror_row() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  // Stage a one-sided disconnected edge: no store operation produces this,
  // but reconnection must repair it rather than preserve the asymmetry.
  s.execute_raw(format!(
    "INSERT INTO connections (owner_id, peer_id, disconnected, created_at)
     VALUES ('{}', '{}', 1, '2024-01-01T00:00:00+00:00')",
    a.identity_id, b.identity_id
  ))
  .await
  .unwrap();

  let view = s.connect(a.code.as_str(), b.code.as_str()).await.unwrap();
  assert!(!view.disconnected);

  let a_conns = s.connections_of(a.identity_id).await.unwrap();
  let b_conns = s.connections_of(b.identity_id).await.unwrap();
  assert_eq!(a_conns.len(), 1);
  assert_eq!(b_conns.len(), 1, "the mirror row must be recreated");
  assert!(!a_conns[0].disconnected);
  assert!(!b_conns[0].disconnected);
}

#[tokio::test]
async fn connect_repairs_a_stray_reverse_edge() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  // The reverse direction only: the caller side sees no edge at all.
  s.execute_raw(format!(
    "INSERT INTO connections (owner_id, peer_id, disconnected, created_at)
     VALUES ('{}', '{}', 1, '2024-01-01T00:00:00+00:00')",
    b.identity_id, a.identity_id
  ))
  .await
  .unwrap();

  let view = s.connect(a.code.as_str(), b.code.as_str()).await.unwrap();
  assert!(!view.disconnected);

  let a_conns = s.connections_of(a.identity_id).await.unwrap();
  let b_conns = s.connections_of(b.identity_id).await.unwrap();
  assert_eq!(a_conns.len(), 1);
  assert_eq!(b_conns.len(), 1, "the stray edge must be reused, not duplicated");
  assert!(!a_conns[0].disconnected);
  assert!(!b_conns[0].disconnected);
}

// ─── Interest signals ────────────────────────────────────────────────────────

#[tokio::test]
async fn interest_signal_is_idempotent() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  s.record_interest(a.identity_id, b.identity_id).await.unwrap();
  s.record_interest(a.identity_id, b.identity_id).await.unwrap();

  let outgoing = s.outgoing_interests(a.identity_id).await.unwrap();
  assert_eq!(outgoing.len(), 1);
  assert_eq!(outgoing[0].identity_id, b.identity_id);
}

#[tokio::test]
async fn interest_signal_requires_an_existing_target() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  let ghost = Uuid::new_v4();
  let err = s.record_interest(a.identity_id, ghost).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::IdentityNotFound(id) if id == ghost));
}

#[tokio::test]
async fn incoming_interests_is_a_reverse_lookup() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();
  let c = s.register(new_member("Carol", "carol@example.com")).await.unwrap();

  s.record_interest(a.identity_id, c.identity_id).await.unwrap();
  s.record_interest(b.identity_id, c.identity_id).await.unwrap();

  let incoming = s.incoming_interests(c.identity_id).await.unwrap();
  assert_eq!(incoming.len(), 2);

  // Signals are one-directional: C has signaled nobody.
  assert!(s.outgoing_interests(c.identity_id).await.unwrap().is_empty());
  assert!(s.incoming_interests(a.identity_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn withdraw_removes_the_signal_and_is_a_noop_when_absent() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();

  s.record_interest(a.identity_id, b.identity_id).await.unwrap();
  s.record_interest(a.identity_id, b.identity_id).await.unwrap();
  s.withdraw_interest(a.identity_id, b.identity_id).await.unwrap();

  assert!(s.outgoing_interests(a.identity_id).await.unwrap().is_empty());
  assert!(s.incoming_interests(b.identity_id).await.unwrap().is_empty());

  // Withdrawing again is not an error.
  s.withdraw_interest(a.identity_id, b.identity_id).await.unwrap();
}

// ─── Profile / assets ────────────────────────────────────────────────────────

#[tokio::test]
async fn update_profile_changes_only_the_supplied_fields() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  let updated = s
    .update_profile(a.identity_id, ProfileUpdate {
      display_name: Some("Alicia".to_owned()),
      interests: Some(vec!["pottery".to_owned()]),
      ..ProfileUpdate::default()
    })
    .await
    .unwrap();

  assert_eq!(updated.display_name, "Alicia");
  assert_eq!(updated.interests, vec!["pottery".to_owned()]);
  assert_eq!(updated.organization.as_deref(), Some("Acme"));
  assert_eq!(updated.facts, vec!["has a dog".to_owned()]);
  assert_eq!(updated.code, a.code);

  // The edit is persisted, not just echoed.
  let fetched = s.identity(a.identity_id).await.unwrap().unwrap();
  assert_eq!(fetched.display_name, "Alicia");
}

#[tokio::test]
async fn update_profile_unknown_identity_is_rejected() {
  let s = store().await;
  let err = s
    .update_profile(Uuid::new_v4(), ProfileUpdate::default())
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::IdentityNotFound(_)));
}

#[tokio::test]
async fn avatar_attempts_are_capped() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  for n in 1..=MAX_AVATAR_ATTEMPTS {
    let updated = s
      .record_avatar(a.identity_id, format!("avatars/alice-{n}.png"))
      .await
      .unwrap();
    assert_eq!(updated.avatar_attempts, n);
  }

  let err = s
    .record_avatar(a.identity_id, "avatars/one-too-many.png".to_owned())
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::AvatarAttemptsExhausted));

  // The last successful reference is retained.
  let fetched = s.identity(a.identity_id).await.unwrap().unwrap();
  assert_eq!(fetched.avatar_ref.as_deref(), Some("avatars/alice-3.png"));
  assert_eq!(fetched.avatar_attempts, MAX_AVATAR_ATTEMPTS);
}

#[tokio::test]
async fn invitation_reference_has_no_attempt_cap() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  for n in 0..5 {
    s.record_invitation(a.identity_id, format!("invites/alice-{n}.png"))
      .await
      .unwrap();
  }

  let fetched = s.identity(a.identity_id).await.unwrap().unwrap();
  assert_eq!(fetched.invitation_ref.as_deref(), Some("invites/alice-4.png"));
}

#[tokio::test]
async fn corrupt_avatar_attempts_column_is_a_decode_error() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();

  s.execute_raw(format!(
    "UPDATE identities SET avatar_attempts = -1 WHERE identity_id = '{}'",
    a.identity_id
  ))
  .await
  .unwrap();

  assert!(s.identity(a.identity_id).await.is_err());
}

// ─── Projections ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn directory_excludes_the_viewer() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  s.register(new_member("Bob", "bob@example.com")).await.unwrap();
  s.register(new_member("Carol", "carol@example.com")).await.unwrap();

  let listing = s.directory(a.identity_id, None, None).await.unwrap();
  assert_eq!(listing.len(), 2);
  assert!(listing.iter().all(|p| p.identity_id != a.identity_id));
}

#[tokio::test]
async fn directory_honours_limit_and_offset() {
  let s = store().await;
  let viewer = s.register(new_member("Viewer", "viewer@example.com")).await.unwrap();
  for n in 0..5 {
    s.register(new_member(&format!("M{n}"), &format!("m{n}@example.com")))
      .await
      .unwrap();
  }

  let page = s.directory(viewer.identity_id, Some(2), None).await.unwrap();
  assert_eq!(page.len(), 2);

  let rest = s.directory(viewer.identity_id, Some(10), Some(2)).await.unwrap();
  assert_eq!(rest.len(), 3);

  // A limit beyond i64 clamps instead of wrapping into SQLite's
  // "negative means unlimited".
  let all = s
    .directory(viewer.identity_id, Some(usize::MAX), None)
    .await
    .unwrap();
  assert_eq!(all.len(), 5);
}

#[tokio::test]
async fn leaderboard_ranks_by_active_connections() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();
  let c = s.register(new_member("Carol", "carol@example.com")).await.unwrap();

  // Alice: 2 active. Bob: 1 active. Carol: 1 active + 1 disconnected.
  s.connect(a.code.as_str(), b.code.as_str()).await.unwrap();
  s.connect(a.code.as_str(), c.code.as_str()).await.unwrap();
  s.connect(b.code.as_str(), c.code.as_str()).await.unwrap();
  s.disconnect(b.identity_id, c.identity_id).await.unwrap();

  let board = s.leaderboard(None).await.unwrap();
  assert_eq!(board.len(), 3);
  assert_eq!(board[0].member.identity_id, a.identity_id);
  assert_eq!(board[0].active_connections, 2);
  // Tie at 1 active connection: display name breaks it.
  assert_eq!(board[1].member.display_name, "Bob");
  assert_eq!(board[2].member.display_name, "Carol");
  assert_eq!(board[1].active_connections, 1);
  assert_eq!(board[2].active_connections, 1);
}

#[tokio::test]
async fn stats_count_pairs_once() {
  let s = store().await;
  let a = s.register(new_member("Alice", "alice@example.com")).await.unwrap();
  let b = s.register(new_member("Bob", "bob@example.com")).await.unwrap();
  let c = s.register(new_member("Carol", "carol@example.com")).await.unwrap();

  s.connect(a.code.as_str(), b.code.as_str()).await.unwrap();
  s.connect(a.code.as_str(), c.code.as_str()).await.unwrap();
  s.disconnect(a.identity_id, c.identity_id).await.unwrap();
  s.record_interest(b.identity_id, a.identity_id).await.unwrap();
  s.record_avatar(a.identity_id, "avatars/alice.png".to_owned()).await.unwrap();

  let stats = s.stats().await.unwrap();
  assert_eq!(stats.members, 3);
  assert_eq!(stats.active_connection_pairs, 1);
  assert_eq!(stats.total_connection_pairs, 2);
  assert_eq!(stats.interest_signals, 1);
  assert_eq!(stats.members_with_avatar, 1);
  assert_eq!(stats.members_with_invitation, 0);
}
