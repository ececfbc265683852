//! Startup upgrade steps.
//!
//! Each step inspects the live schema and only acts when its precondition
//! holds, so every step runs on every open and is a no-op once its work is
//! done. There is no version table. A failing step is logged and reported but
//! never aborts startup; its transaction rolls back and the database keeps
//! its previous shape.

use super::schema::{column_exists, table_exists, INTENTION_TABLES_SQL};
use crate::error::Result;
use crate::validate::parse_date;
use chrono::Datelike;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

/// A single upgrade step.
pub struct UpgradeStep {
    pub name: &'static str,
    run: fn(&Connection) -> Result<StepOutcome>,
}

/// What a step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Precondition absent; nothing touched.
    Skipped(String),
    /// The step changed the schema or data.
    Applied(String),
    /// The step failed and was rolled back.
    Failed(String),
}

/// Outcome of one step, for `parish migrate` and the server log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: &'static str,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Steps that must see the database before the main DDL runs.
pub const PRE_SCHEMA_STEPS: &[UpgradeStep] = &[UpgradeStep {
    name: "weekly_intentions_to_monthly",
    run: migrate_weekly_intentions,
}];

/// Steps that need the main tables in place.
pub const POST_SCHEMA_STEPS: &[UpgradeStep] = &[
    UpgradeStep {
        name: "gallery_image_category",
        run: add_gallery_image_category,
    },
    UpgradeStep {
        name: "intentions_month_index",
        run: ensure_intentions_index,
    },
];

/// Run steps in order, logging and collecting each outcome.
pub fn run_steps(conn: &Connection, steps: &[UpgradeStep]) -> Vec<StepReport> {
    steps
        .iter()
        .map(|step| {
            let outcome = match (step.run)(conn) {
                Ok(outcome) => outcome,
                Err(e) => StepOutcome::Failed(e.to_string()),
            };
            match &outcome {
                StepOutcome::Skipped(reason) => debug!(step = step.name, %reason, "Upgrade step skipped"),
                StepOutcome::Applied(detail) => info!(step = step.name, %detail, "Upgrade step applied"),
                StepOutcome::Failed(error) => {
                    warn!(step = step.name, %error, "Upgrade step failed, continuing startup");
                }
            }
            StepReport {
                step: step.name,
                outcome,
            }
        })
        .collect()
}

/// Convert the legacy weekly intentions shape to monthly records.
///
/// The legacy shape is `intention_weeks(id, start_date, end_date)` with
/// `intentions(id, week_id, date, time, intention)`. Every legacy intention is
/// re-parented under the (year, month) of its own date; month records are
/// created on demand with `INSERT OR IGNORE` against the unique key.
fn migrate_weekly_intentions(conn: &Connection) -> Result<StepOutcome> {
    if !table_exists(conn, "intention_weeks")? {
        return Ok(StepOutcome::Skipped("no intention_weeks table".into()));
    }
    if !table_exists(conn, "intentions")? || !column_exists(conn, "intentions", "week_id")? {
        return Ok(StepOutcome::Skipped("intentions are not keyed by week".into()));
    }

    let tx = conn.unchecked_transaction()?;
    let legacy_rows: i64 = tx.query_row("SELECT COUNT(*) FROM intentions", [], |row| row.get(0))?;

    if legacy_rows == 0 {
        tx.execute_batch("DROP TABLE intentions; DROP TABLE intention_weeks;")?;
        tx.execute_batch(INTENTION_TABLES_SQL)?;
        tx.commit()?;
        return Ok(StepOutcome::Applied("dropped empty weekly tables".into()));
    }

    tx.execute_batch("ALTER TABLE intentions RENAME TO intentions_weekly;")?;
    tx.execute_batch(INTENTION_TABLES_SQL)?;

    let legacy: Vec<(i64, String, String, String)> = tx
        .prepare("SELECT id, date, time, intention FROM intentions_weekly ORDER BY date, time, id")?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<rusqlite::Result<_>>()?;

    let now = chrono::Utc::now().timestamp_millis();
    let mut converted = 0usize;
    let mut skipped = 0usize;

    for (legacy_id, date, time, text) in &legacy {
        let Some(parsed) = parse_date(date.trim()) else {
            warn!(legacy_id, %date, "Skipping weekly intention with unparseable date");
            skipped += 1;
            continue;
        };

        tx.execute(
            "INSERT OR IGNORE INTO intention_months (year, month, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![parsed.year(), parsed.month(), now],
        )?;
        let month_id: i64 = tx.query_row(
            "SELECT id FROM intention_months WHERE year = ?1 AND month = ?2",
            params![parsed.year(), parsed.month()],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO intentions (month_id, date, time, intention) VALUES (?1, ?2, ?3, ?4)",
            params![month_id, date.trim(), time, text],
        )?;
        converted += 1;
    }

    tx.execute_batch("DROP TABLE intentions_weekly; DROP TABLE intention_weeks;")?;
    tx.commit()?;

    Ok(StepOutcome::Applied(format!(
        "converted {converted} weekly intentions ({skipped} skipped)"
    )))
}

/// Add the gallery image → category foreign key to databases created before
/// categories existed.
fn add_gallery_image_category(conn: &Connection) -> Result<StepOutcome> {
    let mut detail = None;
    if !column_exists(conn, "gallery_images", "category_id")? {
        conn.execute_batch(
            "ALTER TABLE gallery_images
             ADD COLUMN category_id INTEGER REFERENCES gallery_categories(id) ON DELETE SET NULL;",
        )?;
        detail = Some("added gallery_images.category_id");
    }

    let index_missing = !index_exists(conn, "idx_gallery_images_category")?;
    if index_missing {
        conn.execute_batch(
            "CREATE INDEX idx_gallery_images_category ON gallery_images(category_id);",
        )?;
    }

    Ok(match (detail, index_missing) {
        (Some(d), _) => StepOutcome::Applied(d.into()),
        (None, true) => StepOutcome::Applied("created category index".into()),
        (None, false) => StepOutcome::Skipped("category column and index present".into()),
    })
}

/// Index intentions by month once the table has the monthly shape.
fn ensure_intentions_index(conn: &Connection) -> Result<StepOutcome> {
    if !column_exists(conn, "intentions", "month_id")? {
        return Ok(StepOutcome::Skipped("intentions table is not monthly".into()));
    }
    if index_exists(conn, "idx_intentions_month")? {
        return Ok(StepOutcome::Skipped("index present".into()));
    }
    conn.execute_batch("CREATE INDEX idx_intentions_month ON intentions(month_id, date, time);")?;
    Ok(StepOutcome::Applied("created month index".into()))
}

fn index_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    const LEGACY_SQL: &str = "
        CREATE TABLE intention_weeks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL
        );
        CREATE TABLE intentions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            week_id INTEGER NOT NULL REFERENCES intention_weeks(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            intention TEXT NOT NULL
        );
    ";

    fn legacy_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(LEGACY_SQL).unwrap();
        conn
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    fn outcome_of<'a>(reports: &'a [StepReport], step: &str) -> &'a StepOutcome {
        &reports.iter().find(|r| r.step == step).unwrap().outcome
    }

    #[test]
    fn test_fresh_db_skips_conversion() {
        let conn = Connection::open_in_memory().unwrap();
        let reports = apply_schema(&conn).unwrap();
        assert!(matches!(
            outcome_of(&reports, "weekly_intentions_to_monthly"),
            StepOutcome::Skipped(_)
        ));
    }

    #[test]
    fn test_converts_weekly_rows_by_own_date() {
        let conn = legacy_db();
        // One week spanning a month boundary.
        conn.execute_batch(
            "INSERT INTO intention_weeks (id, start_date, end_date) VALUES (1, '2025-12-28', '2026-01-03');
             INSERT INTO intentions (week_id, date, time, intention) VALUES
                (1, '2025-12-28', '08:00', 'For the parish'),
                (1, '2025-12-31', '18:00', 'Thanksgiving'),
                (1, '2026-01-01', '10:00', 'New year');",
        )
        .unwrap();

        let reports = apply_schema(&conn).unwrap();
        assert!(matches!(
            outcome_of(&reports, "weekly_intentions_to_monthly"),
            StepOutcome::Applied(_)
        ));

        assert_eq!(count(&conn, "SELECT COUNT(*) FROM intention_months"), 2);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM intentions"), 3);
        assert_eq!(
            count(
                &conn,
                "SELECT COUNT(*) FROM intentions i JOIN intention_months m ON m.id = i.month_id
                 WHERE m.year = 2025 AND m.month = 12"
            ),
            2
        );
        assert!(!table_exists(&conn, "intention_weeks").unwrap());
        assert!(!table_exists(&conn, "intentions_weekly").unwrap());
        assert!(!column_exists(&conn, "intentions", "week_id").unwrap());
    }

    #[test]
    fn test_second_run_is_noop() {
        let conn = legacy_db();
        conn.execute_batch(
            "INSERT INTO intention_weeks (id, start_date, end_date) VALUES (1, '2026-01-05', '2026-01-11');
             INSERT INTO intentions (week_id, date, time, intention) VALUES (1, '2026-01-05', '07:00', 'A');",
        )
        .unwrap();

        apply_schema(&conn).unwrap();
        let reports = apply_schema(&conn).unwrap();

        assert!(matches!(
            outcome_of(&reports, "weekly_intentions_to_monthly"),
            StepOutcome::Skipped(_)
        ));
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM intention_months"), 1);
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM intentions"), 1);
    }

    #[test]
    fn test_empty_legacy_tables_are_dropped() {
        let conn = legacy_db();
        conn.execute(
            "INSERT INTO intention_weeks (start_date, end_date) VALUES ('2026-01-05', '2026-01-11')",
            [],
        )
        .unwrap();

        let reports = apply_schema(&conn).unwrap();
        assert_eq!(
            outcome_of(&reports, "weekly_intentions_to_monthly"),
            &StepOutcome::Applied("dropped empty weekly tables".into())
        );
        assert!(!table_exists(&conn, "intention_weeks").unwrap());
        assert!(column_exists(&conn, "intentions", "month_id").unwrap());
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM intention_months"), 0);
    }

    #[test]
    fn test_unparseable_dates_are_skipped() {
        let conn = legacy_db();
        conn.execute_batch(
            "INSERT INTO intention_weeks (id, start_date, end_date) VALUES (1, '2026-01-05', '2026-01-11');
             INSERT INTO intentions (week_id, date, time, intention) VALUES
                (1, '2026-01-05', '07:00', 'A'),
                (1, 'sometime', '07:00', 'B');",
        )
        .unwrap();

        let reports = apply_schema(&conn).unwrap();
        assert_eq!(
            outcome_of(&reports, "weekly_intentions_to_monthly"),
            &StepOutcome::Applied("converted 1 weekly intentions (1 skipped)".into())
        );
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM intentions"), 1);
    }

    #[test]
    fn test_weeks_table_without_week_column_is_noop() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute_batch(
            "CREATE TABLE intention_weeks (id INTEGER PRIMARY KEY, start_date TEXT, end_date TEXT);",
        )
        .unwrap();

        let reports = apply_schema(&conn).unwrap();
        assert!(matches!(
            outcome_of(&reports, "weekly_intentions_to_monthly"),
            StepOutcome::Skipped(_)
        ));
        // Left alone: the step only acts on the legacy foreign key.
        assert!(table_exists(&conn, "intention_weeks").unwrap());
    }

    #[test]
    fn test_gallery_category_column_added() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE gallery_images (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                image_url TEXT NOT NULL,
                description TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            INSERT INTO gallery_images (title, image_url, created_at, updated_at)
                VALUES ('Old photo', '/uploads/old.jpg', 0, 0);",
        )
        .unwrap();

        let reports = apply_schema(&conn).unwrap();
        assert_eq!(
            outcome_of(&reports, "gallery_image_category"),
            &StepOutcome::Applied("added gallery_images.category_id".into())
        );
        assert!(column_exists(&conn, "gallery_images", "category_id").unwrap());
        let category: Option<i64> = conn
            .query_row("SELECT category_id FROM gallery_images", [], |row| row.get(0))
            .unwrap();
        assert_eq!(category, None);

        let again = apply_schema(&conn).unwrap();
        assert!(matches!(
            outcome_of(&again, "gallery_image_category"),
            StepOutcome::Skipped(_)
        ));
    }

    #[test]
    fn test_failed_step_does_not_abort() {
        let conn = legacy_db();
        conn.execute_batch(
            "INSERT INTO intention_weeks (id, start_date, end_date) VALUES (1, '2026-01-05', '2026-01-11');
             INSERT INTO intentions (week_id, date, time, intention) VALUES (1, '2026-01-05', '07:00', 'A');
             CREATE TABLE intentions_weekly (id INTEGER);",
        )
        .unwrap();

        // The rename collides with the stray table, so the step fails and rolls back.
        let reports = run_steps(&conn, PRE_SCHEMA_STEPS);
        assert!(matches!(reports[0].outcome, StepOutcome::Failed(_)));
        assert!(column_exists(&conn, "intentions", "week_id").unwrap());
        assert!(table_exists(&conn, "intention_weeks").unwrap());

        // The rest of startup still succeeds.
        assert!(apply_schema(&conn).is_ok());
    }
}
