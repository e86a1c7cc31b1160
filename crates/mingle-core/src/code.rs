//! Connect codes — the short numeric identifiers members exchange to
//! request a connection.
//!
//! Codes are allocated at registration by rejection sampling against the
//! codes already in use. Sampling is bounded: a fixed number of attempts at
//! the primary 4-digit width, then fallback to 5 and 6 digits, then
//! [`Error::CodeSpaceExhausted`](crate::Error::CodeSpaceExhausted).

use rand_core::RngCore;
use serde::{Deserialize, Serialize};

/// Width of codes handed out while the primary space has room.
pub const PRIMARY_CODE_WIDTH: u8 = 4;

/// Widest fallback space before allocation gives up.
pub const MAX_CODE_WIDTH: u8 = 6;

/// Samples drawn at each width before falling back to the next wider one.
pub const ATTEMPTS_PER_WIDTH: u32 = 20;

/// A member's connect code: a string of 4 to 6 decimal digits, unique
/// across all identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectCode(String);

impl ConnectCode {
  /// Wrap an already-allocated digit string. Callers are responsible for
  /// only passing values produced by [`random_code`] or read back from the
  /// store.
  pub fn new(code: impl Into<String>) -> Self { Self(code.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn width(&self) -> usize { self.0.len() }
}

impl std::fmt::Display for ConnectCode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Sample a uniformly random code of the given width, zero-padded.
pub fn random_code(width: u8, rng: &mut impl RngCore) -> ConnectCode {
  let span = 10u32.pow(u32::from(width));
  let value = rng.next_u32() % span;
  ConnectCode(format!("{value:0w$}", w = usize::from(width)))
}

/// The widths to try, in order, one entry per sampling attempt:
/// [`ATTEMPTS_PER_WIDTH`] fours, then fives, then sixes.
pub fn allocation_schedule() -> impl Iterator<Item = u8> {
  (PRIMARY_CODE_WIDTH..=MAX_CODE_WIDTH)
    .flat_map(|w| std::iter::repeat(w).take(ATTEMPTS_PER_WIDTH as usize))
}
