use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NdayError;

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque card identifier as handed out by the host's card database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub i64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CardId {
    type Err = NdayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(CardId)
            .map_err(|_| NdayError::InvalidSpec(format!("'{}' is not a card id", s.trim())))
    }
}

impl From<i64> for CardId {
    fn from(id: i64) -> Self {
        CardId(id)
    }
}

// =============================================================================
// Records
// =============================================================================

/// A persisted bury: the card stays hidden through the day before `hide_until`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuryRecord {
    pub card_id: CardId,
    /// First day on which the card is schedulable again.
    pub hide_until: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl BuryRecord {
    /// Whether the card is still hidden on `as_of`.
    pub fn is_active(&self, as_of: NaiveDate) -> bool {
        self.hide_until > as_of
    }

    /// Days left until release; zero once expired.
    pub fn days_remaining(&self, as_of: NaiveDate) -> i64 {
        (self.hide_until - as_of).num_days().max(0)
    }
}

/// One selected card together with the memory model's stability for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardSignal {
    pub card_id: CardId,
    /// Higher means better retained. `None` for cards never reviewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f64>,
}

impl CardSignal {
    pub fn new(card_id: CardId, stability: Option<f64>) -> Self {
        Self { card_id, stability }
    }

    /// A card with no stability signal.
    pub fn unscored(card_id: CardId) -> Self {
        Self {
            card_id,
            stability: None,
        }
    }

    /// The stability value if it can take part in normalization.
    ///
    /// NaN, infinite and negative values count as "no signal".
    pub fn usable_stability(&self) -> Option<f64> {
        self.stability.filter(|s| s.is_finite() && *s >= 0.0)
    }
}
