//! Audit event storage and retrieval.
//!
//! Every admin write records who changed what, so an accidental overwrite of
//! a month's intentions can be traced back.

use rusqlite::{Connection, Result};
use serde::Serialize;

/// What happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    /// A month's whole intentions list was rewritten.
    Replaced,
    MarkedRead,
}

impl AuditAction {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Replaced => "replaced",
            Self::MarkedRead => "marked_read",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "created" => Self::Created,
            "deleted" => Self::Deleted,
            "replaced" => Self::Replaced,
            "marked_read" => Self::MarkedRead,
            _ => Self::Updated,
        }
    }
}

/// An audit event record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub action: AuditAction,
    pub actor: String,
    pub comment: Option<String>,
    pub created_at: i64,
}

impl AuditEvent {
    /// Create a new event (id will be assigned by database).
    #[must_use]
    pub fn new(entity_type: &str, entity_id: &str, action: AuditAction, actor: &str) -> Self {
        Self {
            id: 0,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action,
            actor: actor.to_string(),
            comment: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Insert an event into the database.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_event(conn: &Connection, event: &AuditEvent) -> Result<i64> {
    conn.execute(
        "INSERT INTO audit_events (entity_type, entity_id, action, actor, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            event.entity_type,
            event.entity_id,
            event.action.as_str(),
            event.actor,
            event.comment,
            event.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get events for an entity, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_events(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
    limit: Option<u32>,
) -> Result<Vec<AuditEvent>> {
    let limit = limit.unwrap_or(100);
    let mut stmt = conn.prepare(
        "SELECT id, entity_type, entity_id, action, actor, comment, created_at
         FROM audit_events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3",
    )?;

    let rows = stmt.query_map(rusqlite::params![entity_type, entity_id, limit], |row| {
        Ok(AuditEvent {
            id: row.get(0)?,
            entity_type: row.get(1)?,
            entity_id: row.get(2)?,
            action: AuditAction::parse(row.get::<_, String>(3)?.as_str()),
            actor: row.get(4)?,
            comment: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;

    rows.collect()
}
