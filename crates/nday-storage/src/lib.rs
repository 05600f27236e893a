//! nday storage crate - SQLite persistence for the bury ledger.
//!
//! Provides a WAL-mode SQLite database with migrations and the `BuryStore`
//! that maps card ids to hide-until dates, with expiry sweep and reconcile.

pub mod db;
pub mod migrations;
pub mod store;

pub use db::{sqlite_error, Database};
pub use store::{BatchWrite, BuryStore, Reconciliation, StoreStats};
