//! nday service crate - the call contract offered to the host application.
//!
//! Ties the duration assignor to the bury store: `bury` / `unbury` for user
//! commands, and the lifecycle hooks (profile load, before/after sync, tick)
//! that reconcile stored buries with the host scheduler.

pub mod hooks;
pub mod service;

pub use hooks::{HostScheduler, LifecycleHook, ReconcileReport};
pub use service::{BuryOutcome, BuryService};
