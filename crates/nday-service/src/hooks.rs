//! Host lifecycle hooks and the seam back into the host scheduler.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use nday_core::error::NdayError;
use nday_core::types::CardId;

/// Points in the host's lifecycle at which buries are reconciled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleHook {
    /// A profile (collection) was opened.
    ProfileLoad,
    /// A sync with the remote collection is about to start.
    BeforeSync,
    /// A sync finished; the host may have cleared its own bury flags.
    AfterSync,
    /// Periodic housekeeping.
    Tick,
}

impl LifecycleHook {
    pub const ALL: [LifecycleHook; 4] = [
        LifecycleHook::ProfileLoad,
        LifecycleHook::BeforeSync,
        LifecycleHook::AfterSync,
        LifecycleHook::Tick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleHook::ProfileLoad => "load",
            LifecycleHook::BeforeSync => "before-sync",
            LifecycleHook::AfterSync => "after-sync",
            LifecycleHook::Tick => "tick",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleHook {
    type Err = NdayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load" | "profile-load" => Ok(LifecycleHook::ProfileLoad),
            "before-sync" => Ok(LifecycleHook::BeforeSync),
            "after-sync" => Ok(LifecycleHook::AfterSync),
            "tick" => Ok(LifecycleHook::Tick),
            other => Err(NdayError::Config(format!("unknown lifecycle hook '{}'", other))),
        }
    }
}

/// What a hook found: cards to keep hidden and how much was cleaned up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub hook: LifecycleHook,
    pub as_of: NaiveDate,
    pub swept: usize,
    pub active: BTreeSet<CardId>,
    /// How many of `active` the host actually re-hid, when a host was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rehidden: Option<usize>,
}

impl ReconcileReport {
    /// One-line message for the host's status area.
    pub fn summary(&self) -> String {
        match self.rehidden {
            Some(n) => format!("Re-buried {} of {} cards.", n, self.active.len()),
            None => format!("{} cards remain buried.", self.active.len()),
        }
    }
}

/// The host scheduler's own "bury" flag, which its sync exchange may clear.
pub trait HostScheduler {
    /// Mark the given cards hidden. Returns how many were actually changed.
    fn bury_cards(&mut self, card_ids: &[CardId]) -> Result<usize, NdayError>;
}
