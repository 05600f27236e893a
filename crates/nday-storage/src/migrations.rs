//! Database schema migrations.
//!
//! v1 creates the `bury` ledger. v2 folds in the `buried` table written by the
//! earlier add-on (unix-second expiry timestamps) so existing buries survive
//! the upgrade.

use rusqlite::Connection;
use tracing::info;

use nday_core::error::NdayError;

use crate::db::sqlite_error;

/// Run all pending database migrations.
///
/// Each version is applied in its own transaction and recorded in
/// `schema_migrations`, so a crash mid-migration is retried on the next open.
pub fn run_migrations(conn: &Connection) -> Result<(), NdayError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| sqlite_error("Failed to create migrations table", e))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| sqlite_error("Failed to query migration version", e))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: bury_table");
    }

    if current_version < 2 {
        let imported = apply_v2(conn)?;
        info!(imported, "Applied migration v2: import_legacy_buried");
    }

    Ok(())
}

/// Version 1: the bury ledger.
///
/// `hide_until` is an ISO `YYYY-MM-DD` string so range predicates compare
/// lexicographically; `created_at` is unix seconds.
fn apply_v1(conn: &Connection) -> Result<(), NdayError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| sqlite_error("Failed to begin migration v1", e))?;

    tx.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS bury (
            card_id     INTEGER PRIMARY KEY NOT NULL,
            hide_until  TEXT NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bury_hide_until
            ON bury (hide_until);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'bury_table');
        ",
    )
    .map_err(|e| sqlite_error("Failed to apply migration v1", e))?;

    tx.commit()
        .map_err(|e| sqlite_error("Failed to commit migration v1", e))
}

/// Version 2: import rows from the legacy `buried(cid, until)` table.
///
/// Rows already present in `bury` win. Expired legacy rows are imported as-is
/// and removed by the next sweep. Returns the number of rows imported.
fn apply_v2(conn: &Connection) -> Result<usize, NdayError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| sqlite_error("Failed to begin migration v2", e))?;

    let has_legacy: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'buried'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map_err(|e| sqlite_error("Failed to inspect legacy schema", e))?
        > 0;

    let mut imported = 0;
    if has_legacy {
        imported = tx
            .execute(
                "INSERT OR IGNORE INTO bury (card_id, hide_until, created_at)
                 SELECT cid, date(until, 'unixepoch'), CAST(strftime('%s', 'now') AS INTEGER)
                 FROM buried
                 WHERE cid IS NOT NULL AND until IS NOT NULL",
                [],
            )
            .map_err(|e| sqlite_error("Failed to import legacy buries", e))?;

        tx.execute_batch("DROP TABLE buried;")
            .map_err(|e| sqlite_error("Failed to drop legacy table", e))?;
    }

    tx.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (2, 'import_legacy_buried')",
        [],
    )
    .map_err(|e| sqlite_error("Failed to record migration v2", e))?;

    tx.commit()
        .map_err(|e| sqlite_error("Failed to commit migration v2", e))?;

    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        // Running again should be idempotent.
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_bury_table_exists() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO bury (card_id, hide_until, created_at) VALUES (1, '2030-01-01', 1700000000)",
            [],
        )
        .unwrap();

        let hide_until: String = conn
            .query_row("SELECT hide_until FROM bury WHERE card_id = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(hide_until, "2030-01-01");
    }

    #[test]
    fn test_card_id_is_unique() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO bury (card_id, hide_until, created_at) VALUES (1, '2030-01-01', 0)",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO bury (card_id, hide_until, created_at) VALUES (1, '2031-01-01', 0)",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_hide_until_not_null() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO bury (card_id, hide_until, created_at) VALUES (1, NULL, 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_legacy_table_imported_and_dropped() {
        let conn = open_test_conn();
        conn.execute_batch(
            "CREATE TABLE buried (cid INTEGER PRIMARY KEY, until INTEGER);
             -- 2024-01-02T00:00:00Z and 2024-03-15T10:00:00Z
             INSERT INTO buried VALUES (100, 1704153600);
             INSERT INTO buried VALUES (200, 1710496800);
             INSERT INTO buried VALUES (300, NULL);",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let rows: Vec<(i64, String)> = {
            let mut stmt = conn
                .prepare("SELECT card_id, hide_until FROM bury ORDER BY card_id")
                .unwrap();
            let mapped = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .unwrap();
            mapped.map(|r| r.unwrap()).collect()
        };
        assert_eq!(
            rows,
            vec![
                (100, "2024-01-02".to_string()),
                (200, "2024-03-15".to_string()),
            ]
        );

        let legacy_left: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'buried'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(legacy_left, 0);
    }

    #[test]
    fn test_legacy_import_does_not_overwrite_existing_rows() {
        let conn = open_test_conn();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (
                version INTEGER PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
             );
             CREATE TABLE bury (
                card_id INTEGER PRIMARY KEY NOT NULL,
                hide_until TEXT NOT NULL,
                created_at INTEGER NOT NULL
             );
             INSERT INTO schema_migrations (version, name) VALUES (1, 'bury_table');
             INSERT INTO bury VALUES (100, '2099-12-31', 0);
             CREATE TABLE buried (cid INTEGER PRIMARY KEY, until INTEGER);
             INSERT INTO buried VALUES (100, 1704153600);",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let hide_until: String = conn
            .query_row("SELECT hide_until FROM bury WHERE card_id = 100", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(hide_until, "2099-12-31");
    }
}
