//! Boundary facade the host application calls into.
//!
//! `BuryService` owns the store for one profile session: it is opened when the
//! profile loads and closed (flushed) when the profile closes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{error, info, warn};

use nday_assign::{AssignedBury, DurationAssignor, DurationSpec};
use nday_core::clock::Clock;
use nday_core::config::NdayConfig;
use nday_core::error::NdayError;
use nday_core::types::{BuryRecord, CardId, CardSignal};
use nday_storage::{BuryStore, Database, StoreStats};

use crate::hooks::{HostScheduler, LifecycleHook, ReconcileReport};

/// Result of a successful bury request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuryOutcome {
    pub spec: DurationSpec,
    /// Records written.
    pub buried: usize,
    /// Cards whose duration came out as zero days; nothing is stored for them.
    pub skipped: Vec<CardId>,
    /// Skipped cards whose earlier bury was dropped.
    pub released: usize,
    pub entries: Vec<AssignedBury>,
}

impl BuryOutcome {
    /// Confirmation text for the user.
    pub fn summary(&self) -> String {
        if self.buried == 0 && self.skipped.is_empty() {
            return "No cards selected.".to_string();
        }

        let mut text = if self.spec.is_fixed() {
            format!("Buried {} cards for {} days.", self.buried, self.spec.low())
        } else {
            format!(
                "Buried {} cards for between {}-{} days.",
                self.buried,
                self.spec.low(),
                self.spec.high()
            )
        };
        if !self.skipped.is_empty() {
            text.push_str(&format!(
                " {} cards drew zero days and are not buried.",
                self.skipped.len()
            ));
        }
        text
    }
}

/// Bury engine for one profile session.
pub struct BuryService {
    store: BuryStore,
    assignor: DurationAssignor,
    rng: StdRng,
}

impl BuryService {
    pub fn new(store: BuryStore, assignor: DurationAssignor) -> Self {
        Self {
            store,
            assignor,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replace the random source, e.g. with a seeded one for reproducible runs.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Open the store in `profile_dir` and build the service from `config`.
    pub fn open(
        config: &NdayConfig,
        profile_dir: &Path,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NdayError> {
        let path = Self::store_path(config, profile_dir);
        let db = Database::open(&path, &config.storage)?;
        info!(path = %path.display(), "Bury store opened");
        Ok(Self::new(
            BuryStore::new(db, clock),
            DurationAssignor::new(&config.bury),
        ))
    }

    /// Throw away a damaged store and start over with an empty one.
    pub fn reinitialize(
        config: &NdayConfig,
        profile_dir: &Path,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NdayError> {
        let path = Self::store_path(config, profile_dir);
        warn!(path = %path.display(), "Reinitializing bury store; existing buries are discarded");
        let db = Database::reinitialize(&path, &config.storage)?;
        Ok(Self::new(
            BuryStore::new(db, clock),
            DurationAssignor::new(&config.bury),
        ))
    }

    pub fn store_path(config: &NdayConfig, profile_dir: &Path) -> PathBuf {
        profile_dir.join(&config.storage.file_name)
    }

    pub fn store(&self) -> &BuryStore {
        &self.store
    }

    pub fn assignor(&self) -> &DurationAssignor {
        &self.assignor
    }

    fn clock(&self) -> &Arc<dyn Clock> {
        self.store.clock()
    }

    /// Parse `spec`, compute a date per selected card and persist them all.
    ///
    /// Nothing is written when parsing or assignment fails. The batch is
    /// written in a single transaction, which also drops any earlier bury of
    /// a card that drew zero days.
    pub fn bury(&mut self, selection: &[CardSignal], spec: &str) -> Result<BuryOutcome, NdayError> {
        let spec = self.assignor.parse(spec).inspect_err(|e| {
            warn!(input = spec, error = %e, "Rejected bury input");
        })?;

        if selection.is_empty() {
            return Ok(BuryOutcome {
                spec,
                buried: 0,
                skipped: Vec::new(),
                released: 0,
                entries: Vec::new(),
            });
        }

        let today = self.clock().today();
        let assignment = self
            .assignor
            .assign(selection, spec, today, &mut self.rng)?;

        let batch = self
            .store
            .write_batch(&assignment.to_upserts(), &assignment.skipped, today)
            .inspect_err(|e| error!(error = %e, "Failed to persist buries"))?;

        info!(
            spec = %spec,
            buried = batch.upserted,
            skipped = assignment.skipped.len(),
            released = batch.released,
            "Cards buried"
        );

        Ok(BuryOutcome {
            spec,
            buried: batch.upserted,
            skipped: assignment.skipped,
            released: batch.released,
            entries: assignment.entries,
        })
    }

    /// Forget the buries of the given cards. Returns how many existed.
    pub fn unbury(&self, card_ids: &[CardId]) -> Result<usize, NdayError> {
        let removed = self
            .store
            .remove_many(card_ids)
            .inspect_err(|e| error!(error = %e, "Failed to unbury cards"))?;
        info!(requested = card_ids.len(), removed, "Cards unburied");
        Ok(removed)
    }

    /// The active bury for `card_id`, if any.
    pub fn record(&self, card_id: CardId) -> Result<Option<BuryRecord>, NdayError> {
        self.store.get(card_id)
    }

    /// Every active bury as of today.
    pub fn active_records(&self) -> Result<Vec<BuryRecord>, NdayError> {
        self.store.active_records(self.clock().today())
    }

    pub fn stats(&self) -> Result<StoreStats, NdayError> {
        self.store.stats(self.clock().today())
    }

    /// Remove expired records without listing the active ones.
    pub fn sweep(&self) -> Result<usize, NdayError> {
        self.store
            .sweep_expired(self.clock().today())
            .inspect_err(|e| error!(error = %e, "Failed to sweep expired buries"))
    }

    pub fn on_profile_load(&self) -> Result<ReconcileReport, NdayError> {
        self.run_hook(LifecycleHook::ProfileLoad)
    }

    pub fn on_before_sync(&self) -> Result<ReconcileReport, NdayError> {
        self.run_hook(LifecycleHook::BeforeSync)
    }

    pub fn on_after_sync(&self) -> Result<ReconcileReport, NdayError> {
        self.run_hook(LifecycleHook::AfterSync)
    }

    pub fn on_tick(&self) -> Result<ReconcileReport, NdayError> {
        self.run_hook(LifecycleHook::Tick)
    }

    /// Reconcile as of today and report which cards must stay hidden.
    pub fn run_hook(&self, hook: LifecycleHook) -> Result<ReconcileReport, NdayError> {
        let as_of = self.clock().today();
        let reconciliation = self.store.reconcile(as_of).inspect_err(|e| {
            error!(hook = %hook, error = %e, "Reconcile failed");
        })?;

        info!(
            hook = %hook,
            swept = reconciliation.swept,
            active = reconciliation.active.len(),
            "Lifecycle hook reconciled"
        );

        Ok(ReconcileReport {
            hook,
            as_of,
            swept: reconciliation.swept,
            active: reconciliation.active,
            rehidden: None,
        })
    }

    /// Reconcile, then push the active set into the host scheduler.
    pub fn apply_hook(
        &self,
        hook: LifecycleHook,
        host: &mut dyn HostScheduler,
    ) -> Result<ReconcileReport, NdayError> {
        let mut report = self.run_hook(hook)?;
        if !report.active.is_empty() {
            let ids: Vec<CardId> = report.active.iter().copied().collect();
            let rehidden = host.bury_cards(&ids)?;
            info!(hook = %hook, rehidden, active = ids.len(), "Buries re-applied to host");
            report.rehidden = Some(rehidden);
        } else {
            report.rehidden = Some(0);
        }
        Ok(report)
    }

    /// Profile teardown: flush and close the store.
    pub fn close(self) -> Result<(), NdayError> {
        self.store.close()
    }
}

impl std::fmt::Debug for BuryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuryService")
            .field("store", &self.store)
            .field("assignor", &self.assignor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nday_core::clock::FixedClock;

    fn service() -> BuryService {
        let clock = Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let store = BuryStore::new(Database::in_memory().unwrap(), clock);
        BuryService::new(store, DurationAssignor::default()).with_rng(StdRng::seed_from_u64(5))
    }

    #[test]
    fn test_summary_fixed() {
        let mut svc = service();
        let outcome = svc
            .bury(&[CardSignal::unscored(CardId(1)), CardSignal::unscored(CardId(2))], "10")
            .unwrap();
        assert_eq!(outcome.summary(), "Buried 2 cards for 10 days.");
    }

    #[test]
    fn test_summary_range() {
        let mut svc = service();
        let outcome = svc
            .bury(&[CardSignal::unscored(CardId(1))], "1-100")
            .unwrap();
        assert_eq!(outcome.summary(), "Buried 1 cards for between 1-100 days.");
    }

    #[test]
    fn test_summary_mentions_zero_day_cards() {
        let mut config = NdayConfig::default();
        config.bury.allow_zero_duration = true;
        let clock = Arc::new(FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let store = BuryStore::new(Database::in_memory().unwrap(), clock);
        let mut svc = BuryService::new(store, DurationAssignor::new(&config.bury));

        let outcome = svc.bury(&[CardSignal::unscored(CardId(1))], "0").unwrap();
        assert_eq!(
            outcome.summary(),
            "Buried 0 cards for 0 days. 1 cards drew zero days and are not buried."
        );
    }

    #[test]
    fn test_empty_selection_writes_nothing() {
        let mut svc = service();
        let outcome = svc.bury(&[], "10").unwrap();
        assert_eq!(outcome.buried, 0);
        assert_eq!(outcome.summary(), "No cards selected.");
        assert_eq!(svc.stats().unwrap().total, 0);
    }

    #[test]
    fn test_empty_selection_still_validates_spec() {
        let mut svc = service();
        assert!(matches!(svc.bury(&[], "abc"), Err(NdayError::InvalidSpec(_))));
    }

    #[test]
    fn test_store_path_uses_configured_file_name() {
        let mut config = NdayConfig::default();
        config.storage.file_name = "custom.db".to_string();
        assert_eq!(
            BuryService::store_path(&config, Path::new("/data/User 1")),
            PathBuf::from("/data/User 1/custom.db")
        );
    }
}
