//! Content types served by the public site and edited in the admin panel.
//!
//! Each stored record has a matching `*Input` type used for create/update
//! request bodies. Inputs are validated and sanitized before they reach the
//! store; `validate` returns the cleaned copy.

use crate::error::Result;
use crate::validate::{FieldErrors, MAX_BODY_LEN, MAX_TITLE_LEN, YEAR_RANGE};
use serde::{Deserialize, Serialize};

const MAX_URL_LEN: usize = 2048;
const MAX_EMAIL_LEN: usize = 254;

fn check_url(errors: &mut FieldErrors, field: &str, url: Option<&str>) -> Option<String> {
    let url = errors.optional_text(field, url, MAX_URL_LEN)?;
    if !(url.starts_with("https://") || url.starts_with("http://") || url.starts_with('/')) {
        errors.push(field, "must be an http(s) URL or a site-relative path");
    }
    Some(url)
}

// ── Announcements ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub publish_date: String,
    pub is_published: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementInput {
    pub title: String,
    pub content: String,
    pub publish_date: String,
    #[serde(default = "default_true")]
    pub is_published: bool,
}

fn default_true() -> bool {
    true
}

impl AnnouncementInput {
    /// # Errors
    ///
    /// Returns `Error::Validation` for missing or malformed fields.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();
        let title = errors.required_text("title", &self.title, MAX_TITLE_LEN);
        let content = errors.required_text("content", &self.content, MAX_BODY_LEN);
        errors.date("publish_date", &self.publish_date);
        errors.finish(Self {
            title,
            content,
            publish_date: self.publish_date.trim().to_string(),
            is_published: self.is_published,
        })
    }
}

// ── Mass times ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassTime {
    pub id: i64,
    /// 0 = Sunday ... 6 = Saturday
    pub day_of_week: u32,
    pub time: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassTimeInput {
    pub day_of_week: u32,
    pub time: String,
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl MassTimeInput {
    /// # Errors
    ///
    /// Returns `Error::Validation` for an out-of-range day or a bad time.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();
        if self.day_of_week > 6 {
            errors.push("day_of_week", "must be between 0 (Sunday) and 6 (Saturday)");
        }
        let time = errors.time("time", &self.time);
        let description = errors.optional_text("description", self.description.as_deref(), MAX_TITLE_LEN);
        errors.finish(Self {
            day_of_week: self.day_of_week,
            time,
            description,
            sort_order: self.sort_order,
        })
    }
}

// ── Clergy ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClergyMember {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClergyInput {
    pub name: String,
    pub role: String,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}

impl ClergyInput {
    /// # Errors
    ///
    /// Returns `Error::Validation` for missing or malformed fields.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();
        let name = errors.required_text("name", &self.name, MAX_TITLE_LEN);
        let role = errors.required_text("role", &self.role, MAX_TITLE_LEN);
        let bio = errors.optional_text("bio", self.bio.as_deref(), MAX_BODY_LEN);
        let photo_url = check_url(&mut errors, "photo_url", self.photo_url.as_deref());
        errors.finish(Self {
            name,
            role,
            bio,
            photo_url,
            sort_order: self.sort_order,
        })
    }
}

// ── Gallery ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryCategory {
    pub id: i64,
    pub name: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryCategoryInput {
    pub name: String,
    #[serde(default)]
    pub sort_order: i64,
}

impl GalleryCategoryInput {
    /// # Errors
    ///
    /// Returns `Error::Validation` if the name is missing.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();
        let name = errors.required_text("name", &self.name, MAX_TITLE_LEN);
        errors.finish(Self {
            name,
            sort_order: self.sort_order,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: i64,
    pub title: String,
    pub image_url: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryImageInput {
    pub title: String,
    pub image_url: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
}

impl GalleryImageInput {
    /// # Errors
    ///
    /// Returns `Error::Validation` for missing or malformed fields.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();
        let title = errors.required_text("title", &self.title, MAX_TITLE_LEN);
        let image_url = match check_url(&mut errors, "image_url", Some(&self.image_url)) {
            Some(url) => url,
            None => {
                errors.push("image_url", "is required");
                String::new()
            }
        };
        let description = errors.optional_text("description", self.description.as_deref(), MAX_BODY_LEN);
        errors.finish(Self {
            title,
            image_url,
            description,
            category_id: self.category_id,
        })
    }
}

// ── History ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub year: i32,
    pub title: String,
    pub content: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntryInput {
    pub year: i32,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub sort_order: i64,
}

impl HistoryEntryInput {
    /// # Errors
    ///
    /// Returns `Error::Validation` for missing fields or a year out of range.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();
        // Parish histories reach back further than dated content.
        if !(1000..=*YEAR_RANGE.end()).contains(&self.year) {
            errors.push("year", format!("must be between 1000 and {}", YEAR_RANGE.end()));
        }
        let title = errors.required_text("title", &self.title, MAX_TITLE_LEN);
        let content = errors.required_text("content", &self.content, MAX_BODY_LEN);
        errors.finish(Self {
            year: self.year,
            title,
            content,
            sort_order: self.sort_order,
        })
    }
}

// ── Events ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub event_time: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInput {
    pub title: String,
    pub description: Option<String>,
    pub event_date: String,
    pub event_time: Option<String>,
    pub location: Option<String>,
}

impl EventInput {
    /// # Errors
    ///
    /// Returns `Error::Validation` for missing or malformed fields.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();
        let title = errors.required_text("title", &self.title, MAX_TITLE_LEN);
        let description = errors.optional_text("description", self.description.as_deref(), MAX_BODY_LEN);
        errors.date("event_date", &self.event_date);
        let event_time = match self.event_time.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => Some(errors.time("event_time", t)),
            _ => None,
        };
        let location = errors.optional_text("location", self.location.as_deref(), MAX_TITLE_LEN);
        errors.finish(Self {
            title,
            description,
            event_date: self.event_date.trim().to_string(),
            event_time,
            location,
        })
    }
}

// ── Contact messages ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessageInput {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactMessageInput {
    /// # Errors
    ///
    /// Returns `Error::Validation` for missing fields or an implausible email.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();
        let name = errors.required_text("name", &self.name, MAX_TITLE_LEN);
        let email = errors.required_text("email", &self.email, MAX_EMAIL_LEN);
        if !email.is_empty() && !looks_like_email(&email) {
            errors.push("email", "must be a valid email address");
        }
        let subject = errors.optional_text("subject", self.subject.as_deref(), MAX_TITLE_LEN);
        let message = errors.required_text("message", &self.message, 5000);
        errors.finish(Self {
            name,
            email,
            subject,
            message,
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

/// Count shown as a badge in the admin panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: i64,
}

// ── About sections ───────────────────────────────────────────

/// A singleton block of text keyed by section name (`parish`, `patron`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutSection {
    pub key: String,
    pub title: String,
    pub content: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutSectionInput {
    pub title: String,
    pub content: String,
}

impl AboutSectionInput {
    /// # Errors
    ///
    /// Returns `Error::Validation` if title or content is missing.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();
        let title = errors.required_text("title", &self.title, MAX_TITLE_LEN);
        let content = errors.required_text("content", &self.content, MAX_BODY_LEN);
        errors.finish(Self { title, content })
    }
}

/// Validate an about-section key taken from the URL path.
///
/// # Errors
///
/// Returns `Error::Validation` unless the key is 1-64 chars of `[a-z0-9-]`.
pub fn validate_about_key(key: &str) -> Result<String> {
    let mut errors = FieldErrors::new();
    let ok = !key.is_empty()
        && key.len() <= 64
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if !ok {
        errors.push("key", "must be 1-64 characters of a-z, 0-9 and '-'");
    }
    errors.finish(key.to_string())
}
