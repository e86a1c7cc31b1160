//! SQLite backend for the Mingle identity store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Operations that touch both sides of a
//! connection pair run inside a single transaction, so the mirror invariant
//! holds after every successful call.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
