//! Storage for the site's content types.
//!
//! Each type gets list/get/create/update/delete. Inputs are validated here so
//! every caller (REST handlers, the in-process client, the CLI) gets the
//! same checks.

use super::audit::AuditAction;
use super::sqlite::SqliteStorage;
use crate::error::{Error, FieldError, Result};
use crate::model::{
    AboutSection, AboutSectionInput, Announcement, AnnouncementInput, ClergyInput, ClergyMember,
    ContactMessage, ContactMessageInput, Event, EventInput, GalleryCategory, GalleryCategoryInput,
    GalleryImage, GalleryImageInput, HistoryEntry, HistoryEntryInput, MassTime, MassTimeInput,
    validate_about_key,
};
use crate::validate::find_similar_keys;
use rusqlite::{params, OptionalExtension, Row, Transaction};

/// Actor recorded for writes made through the public contact form.
pub const PUBLIC_ACTOR: &str = "public";

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn map_announcement(row: &Row) -> rusqlite::Result<Announcement> {
    Ok(Announcement {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        publish_date: row.get(3)?,
        is_published: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_mass_time(row: &Row) -> rusqlite::Result<MassTime> {
    Ok(MassTime {
        id: row.get(0)?,
        day_of_week: row.get(1)?,
        time: row.get(2)?,
        description: row.get(3)?,
        sort_order: row.get(4)?,
    })
}

fn map_clergy(row: &Row) -> rusqlite::Result<ClergyMember> {
    Ok(ClergyMember {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        bio: row.get(3)?,
        photo_url: row.get(4)?,
        sort_order: row.get(5)?,
    })
}

fn map_category(row: &Row) -> rusqlite::Result<GalleryCategory> {
    Ok(GalleryCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        sort_order: row.get(2)?,
    })
}

fn map_image(row: &Row) -> rusqlite::Result<GalleryImage> {
    Ok(GalleryImage {
        id: row.get(0)?,
        title: row.get(1)?,
        image_url: row.get(2)?,
        description: row.get(3)?,
        category_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_history(row: &Row) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get(0)?,
        year: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        sort_order: row.get(4)?,
    })
}

fn map_event(row: &Row) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        event_date: row.get(3)?,
        event_time: row.get(4)?,
        location: row.get(5)?,
    })
}

fn map_message(row: &Row) -> rusqlite::Result<ContactMessage> {
    Ok(ContactMessage {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        subject: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_about(row: &Row) -> rusqlite::Result<AboutSection> {
    Ok(AboutSection {
        key: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

const ANNOUNCEMENT_COLS: &str = "id, title, content, publish_date, is_published, created_at, updated_at";
const MASS_TIME_COLS: &str = "id, day_of_week, time, description, sort_order";
const CLERGY_COLS: &str = "id, name, role, bio, photo_url, sort_order";
const CATEGORY_COLS: &str = "id, name, sort_order";
const IMAGE_COLS: &str = "id, title, image_url, description, category_id, created_at";
const HISTORY_COLS: &str = "id, year, title, content, sort_order";
const EVENT_COLS: &str = "id, title, description, event_date, event_time, location";
const MESSAGE_COLS: &str = "id, name, email, subject, message, is_read, created_at";

/// Fail with `ContentNotFound` when an UPDATE or DELETE touched nothing.
fn ensure_found(rows: usize, kind: &'static str, id: i64) -> Result<()> {
    if rows == 0 {
        Err(Error::ContentNotFound { kind, id })
    } else {
        Ok(())
    }
}

fn ensure_category(tx: &Transaction, category_id: Option<i64>) -> Result<()> {
    let Some(id) = category_id else {
        return Ok(());
    };
    let found = tx
        .query_row("SELECT 1 FROM gallery_categories WHERE id = ?1", [id], |_| Ok(()))
        .optional()?
        .is_some();
    if found {
        Ok(())
    } else {
        Err(Error::Validation(vec![FieldError::new(
            "category_id",
            format!("no gallery category with id {id}"),
        )]))
    }
}

fn ensure_unique_category_name(tx: &Transaction, name: &str, except: Option<i64>) -> Result<()> {
    let clash: Option<i64> = tx
        .query_row(
            "SELECT id FROM gallery_categories WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    match clash {
        Some(id) if Some(id) != except => Err(Error::Validation(vec![FieldError::new(
            "name",
            "a category with this name already exists",
        )])),
        _ => Ok(()),
    }
}

impl SqliteStorage {
    fn get_by_id<T>(
        &self,
        table: &str,
        cols: &str,
        kind: &'static str,
        id: i64,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<T> {
        self.conn()
            .query_row(&format!("SELECT {cols} FROM {table} WHERE id = ?1"), [id], map)
            .optional()?
            .ok_or(Error::ContentNotFound { kind, id })
    }

    fn delete_by_id(&mut self, table: &str, entity: &'static str, id: i64, actor: &str) -> Result<()> {
        let sql = format!("DELETE FROM {table} WHERE id = ?1");
        self.mutate(&format!("delete_{entity}"), actor, |tx, ctx| {
            ensure_found(tx.execute(&sql, [id])?, entity, id)?;
            ctx.record_event(entity, id, AuditAction::Deleted);
            Ok(())
        })
    }

    // ===================
    // Announcements
    // ===================

    /// List announcements, newest first.
    ///
    /// Unpublished ones are only included when `include_unpublished` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_announcements(&self, include_unpublished: bool) -> Result<Vec<Announcement>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ANNOUNCEMENT_COLS} FROM announcements
             WHERE ?1 OR is_published = 1
             ORDER BY publish_date DESC, id DESC"
        ))?;
        let rows = stmt.query_map([include_unpublished], map_announcement)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no announcement has this id.
    pub fn get_announcement(&self, id: i64) -> Result<Announcement> {
        self.get_by_id("announcements", ANNOUNCEMENT_COLS, "announcement", id, map_announcement)
    }

    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad input.
    pub fn create_announcement(&mut self, input: &AnnouncementInput, actor: &str) -> Result<Announcement> {
        let input = input.validate()?;
        let now = now_ms();
        let id = self.mutate("create_announcement", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO announcements (title, content, publish_date, is_published, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![input.title, input.content, input.publish_date, input.is_published, now],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record_event("announcement", id, AuditAction::Created);
            Ok(id)
        })?;
        self.get_announcement(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` or `Error::Validation`.
    pub fn update_announcement(&mut self, id: i64, input: &AnnouncementInput, actor: &str) -> Result<Announcement> {
        let input = input.validate()?;
        let now = now_ms();
        self.mutate("update_announcement", actor, |tx, ctx| {
            let rows = tx.execute(
                "UPDATE announcements SET title = ?1, content = ?2, publish_date = ?3, is_published = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![input.title, input.content, input.publish_date, input.is_published, now, id],
            )?;
            ensure_found(rows, "announcement", id)?;
            ctx.record_event("announcement", id, AuditAction::Updated);
            Ok(())
        })?;
        self.get_announcement(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no announcement has this id.
    pub fn delete_announcement(&mut self, id: i64, actor: &str) -> Result<()> {
        self.delete_by_id("announcements", "announcement", id, actor)
    }

    // ===================
    // Mass Times
    // ===================

    /// List the weekly mass schedule, Sunday first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_mass_times(&self) -> Result<Vec<MassTime>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MASS_TIME_COLS} FROM mass_times ORDER BY day_of_week, time, sort_order, id"
        ))?;
        let rows = stmt.query_map([], map_mass_time)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no mass time has this id.
    pub fn get_mass_time(&self, id: i64) -> Result<MassTime> {
        self.get_by_id("mass_times", MASS_TIME_COLS, "mass_time", id, map_mass_time)
    }

    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad input.
    pub fn create_mass_time(&mut self, input: &MassTimeInput, actor: &str) -> Result<MassTime> {
        let input = input.validate()?;
        let now = now_ms();
        let id = self.mutate("create_mass_time", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO mass_times (day_of_week, time, description, sort_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![input.day_of_week, input.time, input.description, input.sort_order, now],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record_event("mass_time", id, AuditAction::Created);
            Ok(id)
        })?;
        self.get_mass_time(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` or `Error::Validation`.
    pub fn update_mass_time(&mut self, id: i64, input: &MassTimeInput, actor: &str) -> Result<MassTime> {
        let input = input.validate()?;
        let now = now_ms();
        self.mutate("update_mass_time", actor, |tx, ctx| {
            let rows = tx.execute(
                "UPDATE mass_times SET day_of_week = ?1, time = ?2, description = ?3, sort_order = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![input.day_of_week, input.time, input.description, input.sort_order, now, id],
            )?;
            ensure_found(rows, "mass_time", id)?;
            ctx.record_event("mass_time", id, AuditAction::Updated);
            Ok(())
        })?;
        self.get_mass_time(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no mass time has this id.
    pub fn delete_mass_time(&mut self, id: i64, actor: &str) -> Result<()> {
        self.delete_by_id("mass_times", "mass_time", id, actor)
    }

    // ===================
    // Clergy
    // ===================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_clergy(&self) -> Result<Vec<ClergyMember>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {CLERGY_COLS} FROM clergy ORDER BY sort_order, id"))?;
        let rows = stmt.query_map([], map_clergy)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no clergy member has this id.
    pub fn get_clergy(&self, id: i64) -> Result<ClergyMember> {
        self.get_by_id("clergy", CLERGY_COLS, "clergy", id, map_clergy)
    }

    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad input.
    pub fn create_clergy(&mut self, input: &ClergyInput, actor: &str) -> Result<ClergyMember> {
        let input = input.validate()?;
        let now = now_ms();
        let id = self.mutate("create_clergy", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO clergy (name, role, bio, photo_url, sort_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![input.name, input.role, input.bio, input.photo_url, input.sort_order, now],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record_event("clergy", id, AuditAction::Created);
            Ok(id)
        })?;
        self.get_clergy(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` or `Error::Validation`.
    pub fn update_clergy(&mut self, id: i64, input: &ClergyInput, actor: &str) -> Result<ClergyMember> {
        let input = input.validate()?;
        let now = now_ms();
        self.mutate("update_clergy", actor, |tx, ctx| {
            let rows = tx.execute(
                "UPDATE clergy SET name = ?1, role = ?2, bio = ?3, photo_url = ?4, sort_order = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![input.name, input.role, input.bio, input.photo_url, input.sort_order, now, id],
            )?;
            ensure_found(rows, "clergy", id)?;
            ctx.record_event("clergy", id, AuditAction::Updated);
            Ok(())
        })?;
        self.get_clergy(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no clergy member has this id.
    pub fn delete_clergy(&mut self, id: i64, actor: &str) -> Result<()> {
        self.delete_by_id("clergy", "clergy", id, actor)
    }

    // ===================
    // Gallery
    // ===================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_gallery_categories(&self) -> Result<Vec<GalleryCategory>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CATEGORY_COLS} FROM gallery_categories ORDER BY sort_order, name"
        ))?;
        let rows = stmt.query_map([], map_category)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no category has this id.
    pub fn get_gallery_category(&self, id: i64) -> Result<GalleryCategory> {
        self.get_by_id("gallery_categories", CATEGORY_COLS, "gallery_category", id, map_category)
    }

    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad input or a duplicate name.
    pub fn create_gallery_category(&mut self, input: &GalleryCategoryInput, actor: &str) -> Result<GalleryCategory> {
        let input = input.validate()?;
        let now = now_ms();
        let id = self.mutate("create_gallery_category", actor, |tx, ctx| {
            ensure_unique_category_name(tx, &input.name, None)?;
            tx.execute(
                "INSERT INTO gallery_categories (name, sort_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![input.name, input.sort_order, now],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record_event("gallery_category", id, AuditAction::Created);
            Ok(id)
        })?;
        self.get_gallery_category(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` or `Error::Validation`.
    pub fn update_gallery_category(
        &mut self,
        id: i64,
        input: &GalleryCategoryInput,
        actor: &str,
    ) -> Result<GalleryCategory> {
        let input = input.validate()?;
        let now = now_ms();
        self.mutate("update_gallery_category", actor, |tx, ctx| {
            ensure_unique_category_name(tx, &input.name, Some(id))?;
            let rows = tx.execute(
                "UPDATE gallery_categories SET name = ?1, sort_order = ?2, updated_at = ?3 WHERE id = ?4",
                params![input.name, input.sort_order, now, id],
            )?;
            ensure_found(rows, "gallery_category", id)?;
            ctx.record_event("gallery_category", id, AuditAction::Updated);
            Ok(())
        })?;
        self.get_gallery_category(id)
    }

    /// Delete a category. Its images stay, uncategorized.
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no category has this id.
    pub fn delete_gallery_category(&mut self, id: i64, actor: &str) -> Result<()> {
        self.delete_by_id("gallery_categories", "gallery_category", id, actor)
    }

    /// List gallery images, newest first, optionally for one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_gallery_images(&self, category_id: Option<i64>) -> Result<Vec<GalleryImage>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {IMAGE_COLS} FROM gallery_images
             WHERE ?1 IS NULL OR category_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([category_id], map_image)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no image has this id.
    pub fn get_gallery_image(&self, id: i64) -> Result<GalleryImage> {
        self.get_by_id("gallery_images", IMAGE_COLS, "gallery_image", id, map_image)
    }

    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad input or an unknown category.
    pub fn create_gallery_image(&mut self, input: &GalleryImageInput, actor: &str) -> Result<GalleryImage> {
        let input = input.validate()?;
        let now = now_ms();
        let id = self.mutate("create_gallery_image", actor, |tx, ctx| {
            ensure_category(tx, input.category_id)?;
            tx.execute(
                "INSERT INTO gallery_images (title, image_url, description, category_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![input.title, input.image_url, input.description, input.category_id, now],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record_event("gallery_image", id, AuditAction::Created);
            Ok(id)
        })?;
        self.get_gallery_image(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` or `Error::Validation`.
    pub fn update_gallery_image(&mut self, id: i64, input: &GalleryImageInput, actor: &str) -> Result<GalleryImage> {
        let input = input.validate()?;
        let now = now_ms();
        self.mutate("update_gallery_image", actor, |tx, ctx| {
            ensure_category(tx, input.category_id)?;
            let rows = tx.execute(
                "UPDATE gallery_images SET title = ?1, image_url = ?2, description = ?3, category_id = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![input.title, input.image_url, input.description, input.category_id, now, id],
            )?;
            ensure_found(rows, "gallery_image", id)?;
            ctx.record_event("gallery_image", id, AuditAction::Updated);
            Ok(())
        })?;
        self.get_gallery_image(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no image has this id.
    pub fn delete_gallery_image(&mut self, id: i64, actor: &str) -> Result<()> {
        self.delete_by_id("gallery_images", "gallery_image", id, actor)
    }

    // ===================
    // History
    // ===================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_history(&self) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {HISTORY_COLS} FROM history_entries ORDER BY year, sort_order, id"
        ))?;
        let rows = stmt.query_map([], map_history)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no entry has this id.
    pub fn get_history_entry(&self, id: i64) -> Result<HistoryEntry> {
        self.get_by_id("history_entries", HISTORY_COLS, "history_entry", id, map_history)
    }

    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad input.
    pub fn create_history_entry(&mut self, input: &HistoryEntryInput, actor: &str) -> Result<HistoryEntry> {
        let input = input.validate()?;
        let now = now_ms();
        let id = self.mutate("create_history_entry", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO history_entries (year, title, content, sort_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![input.year, input.title, input.content, input.sort_order, now],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record_event("history_entry", id, AuditAction::Created);
            Ok(id)
        })?;
        self.get_history_entry(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` or `Error::Validation`.
    pub fn update_history_entry(&mut self, id: i64, input: &HistoryEntryInput, actor: &str) -> Result<HistoryEntry> {
        let input = input.validate()?;
        let now = now_ms();
        self.mutate("update_history_entry", actor, |tx, ctx| {
            let rows = tx.execute(
                "UPDATE history_entries SET year = ?1, title = ?2, content = ?3, sort_order = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![input.year, input.title, input.content, input.sort_order, now, id],
            )?;
            ensure_found(rows, "history_entry", id)?;
            ctx.record_event("history_entry", id, AuditAction::Updated);
            Ok(())
        })?;
        self.get_history_entry(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no entry has this id.
    pub fn delete_history_entry(&mut self, id: i64, actor: &str) -> Result<()> {
        self.delete_by_id("history_entries", "history_entry", id, actor)
    }

    // ===================
    // Events
    // ===================

    /// List events by date. With `from`, only events on or after that
    /// `YYYY-MM-DD` date are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_events(&self, from: Option<&str>) -> Result<Vec<Event>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {EVENT_COLS} FROM events
             WHERE ?1 IS NULL OR event_date >= ?1
             ORDER BY event_date, event_time IS NOT NULL, event_time, id"
        ))?;
        let rows = stmt.query_map([from], map_event)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no event has this id.
    pub fn get_event(&self, id: i64) -> Result<Event> {
        self.get_by_id("events", EVENT_COLS, "event", id, map_event)
    }

    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad input.
    pub fn create_event(&mut self, input: &EventInput, actor: &str) -> Result<Event> {
        let input = input.validate()?;
        let now = now_ms();
        let id = self.mutate("create_event", actor, |tx, ctx| {
            tx.execute(
                "INSERT INTO events (title, description, event_date, event_time, location, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![input.title, input.description, input.event_date, input.event_time, input.location, now],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record_event("event", id, AuditAction::Created);
            Ok(id)
        })?;
        self.get_event(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` or `Error::Validation`.
    pub fn update_event(&mut self, id: i64, input: &EventInput, actor: &str) -> Result<Event> {
        let input = input.validate()?;
        let now = now_ms();
        self.mutate("update_event", actor, |tx, ctx| {
            let rows = tx.execute(
                "UPDATE events SET title = ?1, description = ?2, event_date = ?3, event_time = ?4, location = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![input.title, input.description, input.event_date, input.event_time, input.location, now, id],
            )?;
            ensure_found(rows, "event", id)?;
            ctx.record_event("event", id, AuditAction::Updated);
            Ok(())
        })?;
        self.get_event(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no event has this id.
    pub fn delete_event(&mut self, id: i64, actor: &str) -> Result<()> {
        self.delete_by_id("events", "event", id, actor)
    }

    // ===================
    // Contact Messages
    // ===================

    /// Store a message from the public contact form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad input.
    pub fn create_message(&mut self, input: &ContactMessageInput) -> Result<ContactMessage> {
        let input = input.validate()?;
        let now = now_ms();
        let id = self.mutate("create_message", PUBLIC_ACTOR, |tx, ctx| {
            tx.execute(
                "INSERT INTO contact_messages (name, email, subject, message, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![input.name, input.email, input.subject, input.message, now],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record_event("contact_message", id, AuditAction::Created);
            Ok(id)
        })?;
        self.get_message(id)
    }

    /// List messages, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_messages(&self, unread_only: bool) -> Result<Vec<ContactMessage>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLS} FROM contact_messages
             WHERE NOT ?1 OR is_read = 0
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map([unread_only], map_message)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no message has this id.
    pub fn get_message(&self, id: i64) -> Result<ContactMessage> {
        self.get_by_id("contact_messages", MESSAGE_COLS, "contact_message", id, map_message)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn unread_count(&self) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM contact_messages WHERE is_read = 0",
            [],
            |row| row.get(0),
        )?)
    }

    /// Mark a message read. Marking an already-read message is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no message has this id.
    pub fn mark_message_read(&mut self, id: i64, actor: &str) -> Result<ContactMessage> {
        self.mutate("mark_message_read", actor, |tx, ctx| {
            let rows = tx.execute("UPDATE contact_messages SET is_read = 1 WHERE id = ?1", [id])?;
            ensure_found(rows, "contact_message", id)?;
            ctx.record_event("contact_message", id, AuditAction::MarkedRead);
            Ok(())
        })?;
        self.get_message(id)
    }

    /// # Errors
    ///
    /// Returns `Error::ContentNotFound` if no message has this id.
    pub fn delete_message(&mut self, id: i64, actor: &str) -> Result<()> {
        self.delete_by_id("contact_messages", "contact_message", id, actor)
    }

    // ===================
    // About Sections
    // ===================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_about_sections(&self) -> Result<Vec<AboutSection>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT key, title, content, updated_at FROM about_sections ORDER BY key")?;
        let rows = stmt.query_map([], map_about)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Get a section by key.
    ///
    /// # Errors
    ///
    /// Returns `Error::AboutSectionNotFound` with up to three similar keys
    /// when the key is unknown.
    pub fn get_about_section(&self, key: &str) -> Result<AboutSection> {
        let found = self
            .conn()
            .query_row(
                "SELECT key, title, content, updated_at FROM about_sections WHERE key = ?1",
                [key],
                map_about,
            )
            .optional()?;

        match found {
            Some(section) => Ok(section),
            None => {
                let keys: Vec<String> = self
                    .conn()
                    .prepare("SELECT key FROM about_sections")?
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<_>>()?;
                Err(Error::AboutSectionNotFound {
                    key: key.to_string(),
                    similar: find_similar_keys(key, &keys, 3),
                })
            }
        }
    }

    /// Create or replace a section.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad key or input.
    pub fn upsert_about_section(&mut self, key: &str, input: &AboutSectionInput, actor: &str) -> Result<AboutSection> {
        let key = validate_about_key(key)?;
        let input = input.validate()?;
        let now = now_ms();
        self.mutate("upsert_about_section", actor, |tx, ctx| {
            let existed = tx
                .query_row("SELECT 1 FROM about_sections WHERE key = ?1", [&key], |_| Ok(()))
                .optional()?
                .is_some();
            tx.execute(
                "INSERT INTO about_sections (key, title, content, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET title = excluded.title, content = excluded.content,
                                                updated_at = excluded.updated_at",
                params![key, input.title, input.content, now],
            )?;
            let action = if existed { AuditAction::Updated } else { AuditAction::Created };
            ctx.record_event("about_section", &key, action);
            Ok(())
        })?;
        self.get_about_section(&key)
    }
}
