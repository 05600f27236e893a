//! The bury ledger: card id -> hide-until date.
//!
//! Every mutation runs in one exclusive transaction. Reads decode each row
//! strictly; a row that cannot be decoded is reported as corruption instead of
//! being skipped, because silently dropping it would unhide a card.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension;
use serde::Serialize;
use tracing::{debug, info};

use nday_core::clock::Clock;
use nday_core::error::NdayError;
use nday_core::types::{BuryRecord, CardId};

use crate::db::{sqlite_error, Database};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw row as stored: (card_id, hide_until, created_at).
type RawRow = (i64, String, i64);

/// Outcome of a reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Expired records removed by the sweep.
    pub swept: usize,
    /// Cards that must stay hidden.
    pub active: BTreeSet<CardId>,
}

/// Rows touched by [`BuryStore::write_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchWrite {
    pub upserted: usize,
    /// Existing records deleted.
    pub released: usize,
}

/// Snapshot of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: u64,
    pub active: u64,
    /// Expired but not yet swept.
    pub expired: u64,
    /// Earliest day on which an active card is released.
    pub next_release: Option<NaiveDate>,
}

/// Durable mapping from card id to hide-until date.
pub struct BuryStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl BuryStore {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Insert or fully replace the record for `card_id`.
    pub fn upsert(&self, card_id: CardId, hide_until: NaiveDate) -> Result<(), NdayError> {
        self.upsert_many(&[(card_id, hide_until)]).map(|_| ())
    }

    /// Insert or replace a batch of records atomically.
    ///
    /// Every date must lie after today; otherwise nothing is written.
    pub fn upsert_many(&self, entries: &[(CardId, NaiveDate)]) -> Result<usize, NdayError> {
        self.write_batch(entries, &[], self.clock.today())
            .map(|batch| batch.upserted)
    }

    /// Upsert `entries` and delete the records of `releases` in one
    /// transaction, checking dates against the caller's `today`.
    ///
    /// Every upserted date must lie after `today`; otherwise nothing is
    /// written.
    pub fn write_batch(
        &self,
        entries: &[(CardId, NaiveDate)],
        releases: &[CardId],
        today: NaiveDate,
    ) -> Result<BatchWrite, NdayError> {
        if let Some((card_id, hide_until)) = entries.iter().find(|(_, until)| *until <= today) {
            return Err(NdayError::InvalidSpec(format!(
                "hide-until date {} for card {} is not after today ({})",
                hide_until, card_id, today
            )));
        }

        let created_at = self.clock.now().timestamp();
        let batch = self.db.with_tx(|tx| {
            let mut upsert = tx
                .prepare_cached(
                    "INSERT OR REPLACE INTO bury (card_id, hide_until, created_at)
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| sqlite_error("Failed to prepare upsert", e))?;
            for (card_id, hide_until) in entries {
                upsert
                    .execute(rusqlite::params![
                        card_id.0,
                        hide_until.format(DATE_FORMAT).to_string(),
                        created_at,
                    ])
                    .map_err(|e| sqlite_error("Failed to upsert bury record", e))?;
            }

            let mut released = 0;
            if !releases.is_empty() {
                let mut delete = tx
                    .prepare_cached("DELETE FROM bury WHERE card_id = ?1")
                    .map_err(|e| sqlite_error("Failed to prepare delete", e))?;
                for card_id in releases {
                    released += delete
                        .execute(rusqlite::params![card_id.0])
                        .map_err(|e| sqlite_error("Failed to delete bury record", e))?;
                }
            }

            Ok(BatchWrite {
                upserted: entries.len(),
                released,
            })
        })?;

        debug!(
            upserted = batch.upserted,
            released = batch.released,
            "Bury batch written"
        );
        Ok(batch)
    }

    /// The active record for `card_id` as of today.
    pub fn get(&self, card_id: CardId) -> Result<Option<BuryRecord>, NdayError> {
        self.get_as_of(card_id, self.clock.today())
    }

    /// The record for `card_id` if it is still active on `as_of`.
    ///
    /// Expired records read as absent even before the sweep removes them.
    pub fn get_as_of(
        &self,
        card_id: CardId,
        as_of: NaiveDate,
    ) -> Result<Option<BuryRecord>, NdayError> {
        let raw: Option<RawRow> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT card_id, hide_until, created_at FROM bury WHERE card_id = ?1",
                rusqlite::params![card_id.0],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| sqlite_error("Failed to read bury record", e))
        })?;

        match raw {
            Some(raw) => {
                let record = decode_row(raw)?;
                Ok(record.is_active(as_of).then_some(record))
            }
            None => Ok(None),
        }
    }

    /// Delete the record for `card_id`. Returns whether one existed.
    pub fn remove(&self, card_id: CardId) -> Result<bool, NdayError> {
        self.remove_many(&[card_id]).map(|n| n > 0)
    }

    /// Delete the records for all given cards. Returns how many existed.
    pub fn remove_many(&self, card_ids: &[CardId]) -> Result<usize, NdayError> {
        let removed = self.db.with_tx(|tx| {
            let mut stmt = tx
                .prepare_cached("DELETE FROM bury WHERE card_id = ?1")
                .map_err(|e| sqlite_error("Failed to prepare delete", e))?;
            let mut removed = 0;
            for card_id in card_ids {
                removed += stmt
                    .execute(rusqlite::params![card_id.0])
                    .map_err(|e| sqlite_error("Failed to delete bury record", e))?;
            }
            Ok(removed)
        })?;

        debug!(requested = card_ids.len(), removed, "Bury records removed");
        Ok(removed)
    }

    /// Ids of every card still hidden on `as_of`.
    pub fn active_card_ids(&self, as_of: NaiveDate) -> Result<BTreeSet<CardId>, NdayError> {
        Ok(self
            .active_records(as_of)?
            .into_iter()
            .map(|r| r.card_id)
            .collect())
    }

    /// Every record still active on `as_of`, soonest release first.
    pub fn active_records(&self, as_of: NaiveDate) -> Result<Vec<BuryRecord>, NdayError> {
        let raw = self
            .db
            .with_conn(|conn| select_active(conn, as_of))?;
        raw.into_iter().map(decode_row).collect()
    }

    /// Delete every record whose `hide_until` is on or before `as_of`.
    pub fn sweep_expired(&self, as_of: NaiveDate) -> Result<usize, NdayError> {
        let swept = self.db.with_tx(|tx| delete_expired(tx, as_of))?;
        if swept > 0 {
            info!(swept, as_of = %as_of, "Expired buries swept");
        }
        Ok(swept)
    }

    /// Sweep, then list what stays hidden, in a single transaction.
    pub fn reconcile(&self, as_of: NaiveDate) -> Result<Reconciliation, NdayError> {
        let (swept, raw) = self.db.with_tx(|tx| {
            let swept = delete_expired(tx, as_of)?;
            let raw = select_active(tx, as_of)?;
            Ok((swept, raw))
        })?;

        let active = raw
            .into_iter()
            .map(|r| decode_row(r).map(|rec| rec.card_id))
            .collect::<Result<BTreeSet<_>, _>>()?;

        info!(swept, active = active.len(), as_of = %as_of, "Buries reconciled");
        Ok(Reconciliation { swept, active })
    }

    /// Counts and next release date as of `as_of`.
    pub fn stats(&self, as_of: NaiveDate) -> Result<StoreStats, NdayError> {
        let as_of_text = as_of.format(DATE_FORMAT).to_string();
        let (total, active, next_release): (i64, i64, Option<String>) =
            self.db.with_conn(|conn| {
                conn.query_row(
                    "SELECT COUNT(*),
                            COALESCE(SUM(hide_until > ?1), 0),
                            MIN(CASE WHEN hide_until > ?1 THEN hide_until END)
                     FROM bury",
                    rusqlite::params![as_of_text],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .map_err(|e| sqlite_error("Failed to compute store stats", e))
            })?;

        let next_release = next_release.map(|s| decode_date(&s)).transpose()?;
        let total = total.max(0) as u64;
        let active = active.max(0) as u64;

        Ok(StoreStats {
            total,
            active,
            expired: total.saturating_sub(active),
            next_release,
        })
    }

    /// Flush and release the underlying database.
    pub fn close(self) -> Result<(), NdayError> {
        self.db.close()
    }
}

impl std::fmt::Debug for BuryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuryStore").field("db", &self.db).finish()
    }
}

fn select_active(conn: &rusqlite::Connection, as_of: NaiveDate) -> Result<Vec<RawRow>, NdayError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT card_id, hide_until, created_at
             FROM bury
             WHERE hide_until > ?1
             ORDER BY hide_until ASC, card_id ASC",
        )
        .map_err(|e| sqlite_error("Failed to prepare active query", e))?;

    let rows = stmt
        .query_map(
            rusqlite::params![as_of.format(DATE_FORMAT).to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .map_err(|e| sqlite_error("Failed to query active buries", e))?;

    let mut raw = Vec::new();
    for row in rows {
        raw.push(row.map_err(|e| sqlite_error("Failed to read bury row", e))?);
    }
    Ok(raw)
}

fn delete_expired(conn: &rusqlite::Connection, as_of: NaiveDate) -> Result<usize, NdayError> {
    conn.execute(
        "DELETE FROM bury WHERE hide_until <= ?1",
        rusqlite::params![as_of.format(DATE_FORMAT).to_string()],
    )
    .map_err(|e| sqlite_error("Failed to sweep expired buries", e))
}

fn decode_row((card_id, hide_until, created_at): RawRow) -> Result<BuryRecord, NdayError> {
    let created_at = DateTime::<Utc>::from_timestamp(created_at, 0).ok_or_else(|| {
        NdayError::StorageCorruption(format!(
            "card {} has out-of-range created_at {}",
            card_id, created_at
        ))
    })?;
    Ok(BuryRecord {
        card_id: CardId(card_id),
        hide_until: decode_date(&hide_until).map_err(|_| {
            NdayError::StorageCorruption(format!(
                "card {} has unreadable hide_until {:?}",
                card_id, hide_until
            ))
        })?,
        created_at,
    })
}

fn decode_date(text: &str) -> Result<NaiveDate, NdayError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| NdayError::StorageCorruption(format!("bad date {:?}: {}", text, e)))
}
