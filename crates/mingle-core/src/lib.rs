//! Core types and trait definitions for the Mingle community-networking
//! server.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod code;
pub mod connection;
pub mod error;
pub mod identity;
pub mod store;

pub use error::{Error, Result};
