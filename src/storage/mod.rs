//! SQLite storage layer.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - IMMEDIATE transactions for atomic writes
//! - Audit events for history
//! - Existence-checked upgrade steps run on every open
//!
//! # Submodules
//!
//! - [`audit`] - Audit event storage
//! - [`content`] - Announcements, schedule, gallery and the other site content
//! - [`migrations`] - Startup upgrade steps
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Storage handle, mutation protocol and intention months

pub mod audit;
pub mod content;
pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use content::PUBLIC_ACTOR;
pub use migrations::{StepOutcome, StepReport};
pub use sqlite::{MutationContext, SqliteStorage};
