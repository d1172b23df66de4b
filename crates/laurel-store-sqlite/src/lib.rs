//! SQLite backend for the Laurel gamification ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. The two invariant-bearing writes
//! — season activation and the grant+event pair — run as single rusqlite
//! transactions.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
