//! Duration assignment for bury requests.
//!
//! Parses `N` / `LOW-HIGH` day specs and spreads range durations across the
//! selected cards, by relative stability where the memory model provides it
//! and by uniform draw where it does not.

pub mod assignor;
pub mod spec;
pub mod strategy;

pub use assignor::{AssignedBury, Assignment, DurationAssignor};
pub use spec::{DurationSpec, SpecRules};
pub use strategy::{DistributionStrategy, StabilityRank, UniformRandom};
