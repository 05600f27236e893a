//! Turns a duration spec and a card selection into concrete hide-until dates.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use rand::RngCore;
use serde::Serialize;
use tracing::debug;

use nday_core::config::{BuryConfig, DistributionMode};
use nday_core::error::NdayError;
use nday_core::types::{CardId, CardSignal};

use crate::spec::{DurationSpec, SpecRules};
use crate::strategy::{DistributionStrategy, StabilityRank, UniformRandom};

/// Date chosen for one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedBury {
    pub card_id: CardId,
    pub offset_days: u32,
    pub hide_until: NaiveDate,
    /// Name of the strategy that picked the offset.
    pub strategy: &'static str,
}

/// Result of assigning a spec over a selection. Nothing is persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub spec: DurationSpec,
    pub today: NaiveDate,
    pub entries: Vec<AssignedBury>,
    /// Cards that drew a zero-day offset and are left alone.
    pub skipped: Vec<CardId>,
}

impl Assignment {
    /// `(card, date)` pairs ready for the store.
    pub fn to_upserts(&self) -> Vec<(CardId, NaiveDate)> {
        self.entries
            .iter()
            .map(|e| (e.card_id, e.hide_until))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parses bury input and distributes durations over selected cards.
#[derive(Debug, Clone)]
pub struct DurationAssignor {
    rules: SpecRules,
    mode: DistributionMode,
}

impl Default for DurationAssignor {
    fn default() -> Self {
        Self::new(&BuryConfig::default())
    }
}

impl DurationAssignor {
    pub fn new(config: &BuryConfig) -> Self {
        Self {
            rules: SpecRules::from(config),
            mode: config.distribution,
        }
    }

    pub fn rules(&self) -> &SpecRules {
        &self.rules
    }

    /// Parse user input with this assignor's rules.
    pub fn parse(&self, text: &str) -> Result<DurationSpec, NdayError> {
        DurationSpec::parse(text, &self.rules)
    }

    /// Compute a hide-until date for every distinct card in `selection`.
    ///
    /// Duplicate card ids keep their first occurrence.
    pub fn assign(
        &self,
        selection: &[CardSignal],
        spec: DurationSpec,
        today: NaiveDate,
        rng: &mut dyn RngCore,
    ) -> Result<Assignment, NdayError> {
        let mut seen = HashSet::with_capacity(selection.len());
        let cards: Vec<&CardSignal> = selection
            .iter()
            .filter(|c| seen.insert(c.card_id))
            .collect();

        let rank = match self.mode {
            DistributionMode::Stability if !spec.is_fixed() => {
                StabilityRank::from_signals(cards.iter().filter_map(|c| c.usable_stability()))
            }
            _ => None,
        };

        let mut entries = Vec::with_capacity(cards.len());
        let mut skipped = Vec::new();

        for card in cards {
            let stability = card.usable_stability();
            let strategy: &dyn DistributionStrategy = match (&rank, stability) {
                (Some(rank), Some(_)) => rank,
                _ => &UniformRandom,
            };

            let offset_days = strategy.offset_days(stability, spec, rng);
            if offset_days == 0 {
                skipped.push(card.card_id);
                continue;
            }

            let hide_until = today
                .checked_add_days(Days::new(u64::from(offset_days)))
                .ok_or_else(|| {
                    NdayError::InvalidSpec(format!(
                        "{} days from {} is past the last representable date",
                        offset_days, today
                    ))
                })?;

            entries.push(AssignedBury {
                card_id: card.card_id,
                offset_days,
                hide_until,
                strategy: strategy.name(),
            });
        }

        debug!(
            spec = %spec,
            assigned = entries.len(),
            skipped = skipped.len(),
            ranked = rank.is_some(),
            "Bury durations assigned"
        );

        Ok(Assignment {
            spec,
            today,
            entries,
            skipped,
        })
    }
}
