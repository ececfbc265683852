//! Data models for the parish CMS.
//!
//! This module contains all domain models:
//! - IntentionMonth / Intention (monthly Mass intentions)
//! - Announcement, MassTime, ClergyMember
//! - GalleryCategory / GalleryImage
//! - HistoryEntry, Event
//! - ContactMessage
//! - AboutSection

pub mod content;
pub mod intention;

pub use content::{
    AboutSection, AboutSectionInput, Announcement, AnnouncementInput, ClergyInput, ClergyMember,
    ContactMessage, ContactMessageInput, Event, EventInput, GalleryCategory, GalleryCategoryInput,
    GalleryImage, GalleryImageInput, HistoryEntry, HistoryEntryInput, MassTime, MassTimeInput,
    UnreadCount, validate_about_key,
};
pub use intention::{Intention, IntentionInput, IntentionMonth, MonthPayload};
