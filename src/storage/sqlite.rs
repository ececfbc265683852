//! SQLite storage implementation.
//!
//! All writes go through [`SqliteStorage::mutate`], which wraps the work in an
//! IMMEDIATE transaction and records audit events before committing.
//! Intention months live here; the other content types are in
//! [`super::content`].

use crate::error::{Error, Result};
use crate::model::{Intention, IntentionInput, IntentionMonth, MonthPayload};
use crate::storage::audit::{insert_event, AuditAction, AuditEvent};
use crate::storage::migrations::StepReport;
use crate::storage::schema::apply_schema;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
    upgrade_report: Vec<StepReport>,
}

/// Context for a mutation operation.
///
/// Passed to mutation closures to collect audit events, which are written in
/// the same transaction as the change itself.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation.
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<AuditEvent>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: impl ToString, action: AuditAction) {
        self.events.push(AuditEvent::new(
            entity_type,
            &entity_id.to_string(),
            action,
            &self.actor,
        ));
    }

    /// Record an event with a short free-text note.
    pub fn record_with_comment(
        &mut self,
        entity_type: &str,
        entity_id: impl ToString,
        action: AuditAction,
        comment: impl Into<String>,
    ) {
        self.events.push(
            AuditEvent::new(entity_type, &entity_id.to_string(), action, &self.actor)
                .with_comment(comment),
        );
    }
}

impl SqliteStorage {
    /// Open a database at the given path, creating it if needed.
    ///
    /// Applies the schema and runs the upgrade steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database that must already exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotInitialized` if the file is missing.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotInitialized {
                path: path.to_path_buf(),
            });
        }
        Self::open(path)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(timeout_ms.unwrap_or(5000)))?;

        let upgrade_report = apply_schema(&conn)?;
        Ok(Self {
            conn,
            upgrade_report,
        })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let upgrade_report = apply_schema(&conn)?;
        Ok(Self {
            conn,
            upgrade_report,
        })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Outcome of each upgrade step run when this handle was opened.
    #[must_use]
    pub fn upgrade_report(&self) -> &[StepReport] {
        &self.upgrade_report
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);
        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;
        debug!(op, actor, events = ctx.events.len(), "Mutation committed");

        Ok(result)
    }

    // ===================
    // Intention Months
    // ===================

    /// List month records with their intentions, ordered by year and month.
    ///
    /// Months whose intentions were all deleted are still returned, so a
    /// later save of that month updates the existing record.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_intention_months(&self, year: Option<i32>) -> Result<Vec<IntentionMonth>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, year, month FROM intention_months
             WHERE ?1 IS NULL OR year = ?1
             ORDER BY year, month",
        )?;
        let mut months = stmt
            .query_map([year], map_month_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT i.month_id, i.id, i.date, i.time, i.intention
             FROM intentions i JOIN intention_months m ON m.id = i.month_id
             WHERE ?1 IS NULL OR m.year = ?1
             ORDER BY i.date, i.time, i.id",
        )?;
        let mut by_month: HashMap<i64, Vec<Intention>> = HashMap::new();
        let rows = stmt.query_map([year], |row| Ok((row.get::<_, i64>(0)?, map_intention_row(row, 1)?)))?;
        for row in rows {
            let (month_id, intention) = row?;
            by_month.entry(month_id).or_default().push(intention);
        }

        for month in &mut months {
            month.intentions = by_month.remove(&month.id).unwrap_or_default();
        }
        Ok(months)
    }

    /// Get one month record with its intentions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_intention_month(&self, id: i64) -> Result<Option<IntentionMonth>> {
        let month = self
            .conn
            .query_row(
                "SELECT id, year, month FROM intention_months WHERE id = ?1",
                [id],
                map_month_row,
            )
            .optional()?;

        let Some(mut month) = month else {
            return Ok(None);
        };
        month.intentions = self.load_intentions(id)?;
        Ok(Some(month))
    }

    /// Find the month record for a calendar month.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_intention_month(&self, year: i32, month: u32) -> Result<Option<IntentionMonth>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM intention_months WHERE year = ?1 AND month = ?2",
                params![year, month],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => self.get_intention_month(id),
            None => Ok(None),
        }
    }

    fn load_intentions(&self, month_id: i64) -> Result<Vec<Intention>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, time, intention FROM intentions
             WHERE month_id = ?1
             ORDER BY date, time, id",
        )?;
        let rows = stmt.query_map([month_id], |row| map_intention_row(row, 0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Create a month record and its intentions.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad payload and `Error::MonthExists`
    /// if a record for (year, month) is already present.
    pub fn create_intention_month(&mut self, payload: &MonthPayload, actor: &str) -> Result<IntentionMonth> {
        let payload = payload.validate()?;
        let now = chrono::Utc::now().timestamp_millis();

        let id = self.mutate("create_intention_month", actor, |tx, ctx| {
            if month_id_for(tx, payload.year, payload.month)?.is_some() {
                return Err(Error::MonthExists {
                    year: payload.year,
                    month: payload.month,
                });
            }

            tx.execute(
                "INSERT INTO intention_months (year, month, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![payload.year, payload.month, now],
            )?;
            let id = tx.last_insert_rowid();
            insert_intentions(tx, id, &payload.intentions)?;

            ctx.record_with_comment(
                "intention_month",
                id,
                AuditAction::Created,
                summary(&payload),
            );
            Ok(id)
        })?;

        self.get_intention_month(id)?
            .ok_or(Error::MonthNotFound { id })
    }

    /// Replace a month's intentions with the payload's list.
    ///
    /// The old children are deleted and the new ones inserted in one
    /// transaction. The payload may move the record to another (year, month)
    /// as long as no other record owns it.
    ///
    /// # Errors
    ///
    /// Returns `Error::MonthNotFound` if the record does not exist,
    /// `Error::MonthExists` on a collision and `Error::Validation` for a bad
    /// payload.
    pub fn replace_intention_month(
        &mut self,
        id: i64,
        payload: &MonthPayload,
        actor: &str,
    ) -> Result<IntentionMonth> {
        let payload = payload.validate()?;
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("replace_intention_month", actor, |tx, ctx| {
            let exists = tx
                .query_row("SELECT 1 FROM intention_months WHERE id = ?1", [id], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Err(Error::MonthNotFound { id });
            }
            if let Some(other) = month_id_for(tx, payload.year, payload.month)? {
                if other != id {
                    return Err(Error::MonthExists {
                        year: payload.year,
                        month: payload.month,
                    });
                }
            }

            tx.execute(
                "UPDATE intention_months SET year = ?1, month = ?2, updated_at = ?3 WHERE id = ?4",
                params![payload.year, payload.month, now, id],
            )?;
            tx.execute("DELETE FROM intentions WHERE month_id = ?1", [id])?;
            insert_intentions(tx, id, &payload.intentions)?;

            ctx.record_with_comment(
                "intention_month",
                id,
                AuditAction::Replaced,
                summary(&payload),
            );
            Ok(())
        })?;

        self.get_intention_month(id)?
            .ok_or(Error::MonthNotFound { id })
    }

    /// Delete a month record and, by cascade, its intentions.
    ///
    /// # Errors
    ///
    /// Returns `Error::MonthNotFound` if the record does not exist.
    pub fn delete_intention_month(&mut self, id: i64, actor: &str) -> Result<()> {
        self.mutate("delete_intention_month", actor, |tx, ctx| {
            let rows = tx.execute("DELETE FROM intention_months WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::MonthNotFound { id });
            }
            ctx.record_event("intention_month", id, AuditAction::Deleted);
            Ok(())
        })
    }
}

fn month_id_for(tx: &Transaction, year: i32, month: u32) -> Result<Option<i64>> {
    Ok(tx
        .query_row(
            "SELECT id FROM intention_months WHERE year = ?1 AND month = ?2",
            params![year, month],
            |row| row.get(0),
        )
        .optional()?)
}

fn insert_intentions(tx: &Transaction, month_id: i64, rows: &[IntentionInput]) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO intentions (month_id, date, time, intention) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for row in rows {
        stmt.execute(params![month_id, row.date, row.time, row.intention])?;
    }
    Ok(())
}

fn summary(payload: &MonthPayload) -> String {
    format!(
        "{}-{:02}: {} intentions",
        payload.year,
        payload.month,
        payload.intentions.len()
    )
}

fn map_month_row(row: &rusqlite::Row) -> rusqlite::Result<IntentionMonth> {
    Ok(IntentionMonth {
        id: row.get(0)?,
        year: row.get(1)?,
        month: row.get(2)?,
        intentions: Vec::new(),
    })
}

fn map_intention_row(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Intention> {
    Ok(Intention {
        id: row.get(offset)?,
        date: row.get(offset + 1)?,
        time: row.get(offset + 2)?,
        intention: row.get(offset + 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::audit::get_events;

    fn row(date: &str, time: &str, text: &str) -> IntentionInput {
        IntentionInput {
            date: date.to_string(),
            time: time.to_string(),
            intention: text.to_string(),
        }
    }

    fn january(intentions: Vec<IntentionInput>) -> MonthPayload {
        MonthPayload {
            year: 2026,
            month: 1,
            intentions,
        }
    }

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory();
        assert!(storage.is_ok());
        assert!(!storage.unwrap().upgrade_report().is_empty());
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let err = SqliteStorage::open_existing(&path).unwrap_err();
        assert!(matches!(err, Error::NotInitialized { .. }));

        SqliteStorage::open(&path).unwrap();
        assert!(SqliteStorage::open_existing(&path).is_ok());
    }

    #[test]
    fn test_create_and_reload() {
        let mut storage = SqliteStorage::open_memory().unwrap();

        let created = storage
            .create_intention_month(
                &january(vec![
                    row("2026-01-04", "10:00", "For the parishioners"),
                    row("2026-01-04", "08:00", "For the sick"),
                ]),
                "tester",
            )
            .unwrap();

        assert!(created.is_for(2026, 1));
        assert_eq!(created.intentions.len(), 2);
        // Ordered by date then time.
        assert_eq!(created.intentions[0].time, "08:00");
        assert!(created.intentions.iter().all(|i| i.id > 0));

        let listed = storage.list_intention_months(Some(2026)).unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(storage.find_intention_month(2026, 1).unwrap(), Some(created));
        assert!(storage.list_intention_months(Some(2025)).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_month_conflicts() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.create_intention_month(&january(vec![]), "a").unwrap();

        let err = storage.create_intention_month(&january(vec![]), "b").unwrap_err();
        assert!(matches!(err, Error::MonthExists { year: 2026, month: 1 }));
        assert_eq!(storage.list_intention_months(None).unwrap().len(), 1);
    }

    #[test]
    fn test_replace_rewrites_children() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let created = storage
            .create_intention_month(
                &january(vec![
                    row("2026-01-04", "08:00", "A"),
                    row("2026-01-11", "08:00", "B"),
                ]),
                "a",
            )
            .unwrap();

        let replaced = storage
            .replace_intention_month(created.id, &january(vec![row("2026-01-11", "09:00", "B")]), "a")
            .unwrap();

        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.intentions.len(), 1);
        assert_eq!(replaced.intentions[0].time, "09:00");

        let total: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM intentions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_emptied_month_is_kept() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let created = storage
            .create_intention_month(&january(vec![row("2026-01-04", "08:00", "A")]), "a")
            .unwrap();
        storage.replace_intention_month(created.id, &january(vec![]), "a").unwrap();

        let months = storage.list_intention_months(Some(2026)).unwrap();
        assert_eq!(months.len(), 1);
        assert!(months[0].intentions.is_empty());
    }

    #[test]
    fn test_replace_missing_month() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage.replace_intention_month(42, &january(vec![]), "a").unwrap_err();
        assert!(matches!(err, Error::MonthNotFound { id: 42 }));
    }

    #[test]
    fn test_replace_cannot_collide_with_other_month() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.create_intention_month(&january(vec![]), "a").unwrap();
        let feb = storage
            .create_intention_month(
                &MonthPayload {
                    year: 2026,
                    month: 2,
                    intentions: vec![],
                },
                "a",
            )
            .unwrap();

        let err = storage.replace_intention_month(feb.id, &january(vec![]), "a").unwrap_err();
        assert!(matches!(err, Error::MonthExists { .. }));
    }

    #[test]
    fn test_invalid_payload_writes_nothing() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let err = storage
            .create_intention_month(&january(vec![row("2026-02-01", "08:00", "A")]), "a")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(storage.list_intention_months(None).unwrap().is_empty());
    }

    #[test]
    fn test_delete_cascades() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let created = storage
            .create_intention_month(&january(vec![row("2026-01-04", "08:00", "A")]), "a")
            .unwrap();
        storage.delete_intention_month(created.id, "a").unwrap();

        assert!(storage.get_intention_month(created.id).unwrap().is_none());
        assert!(matches!(
            storage.delete_intention_month(created.id, "a"),
            Err(Error::MonthNotFound { .. })
        ));
    }

    #[test]
    fn test_mutations_are_audited() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let created = storage.create_intention_month(&january(vec![]), "parson").unwrap();
        storage
            .replace_intention_month(created.id, &january(vec![row("2026-01-04", "08:00", "A")]), "curate")
            .unwrap();

        let events = get_events(storage.conn(), "intention_month", &created.id.to_string(), None).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::Replaced);
        assert_eq!(events[0].actor, "curate");
        assert_eq!(events[1].action, AuditAction::Created);
    }

    #[test]
    fn test_edit_time_then_save_keeps_row_count() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let created = storage
            .create_intention_month(&january(vec![row("2026-01-06", "18:00", "For peace")]), "a")
            .unwrap();

        let edited: Vec<IntentionInput> = created
            .intentions
            .iter()
            .map(|i| row(&i.date, "19:30", &i.intention))
            .collect();
        storage.replace_intention_month(created.id, &january(edited), "a").unwrap();

        let reloaded = storage.find_intention_month(2026, 1).unwrap().unwrap();
        assert_eq!(reloaded.intentions.len(), 1);
        assert_eq!(reloaded.intentions[0].time, "19:30");
        assert_eq!(reloaded.intentions[0].intention, "For peace");
    }
}
