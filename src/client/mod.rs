//! Admin-side API clients.
//!
//! The edit session talks to the server through [`IntentionsApi`], which has
//! two implementations: [`AdminClient`] over HTTP and [`LocalApi`] straight
//! against a [`crate::storage::SqliteStorage`] in the same process.

pub mod http;
pub mod local;

pub use http::AdminClient;
pub use local::LocalApi;

use crate::error::Result;
use crate::model::{IntentionMonth, MonthPayload};
use std::future::Future;

/// Month-level intention operations used by the edit session.
pub trait IntentionsApi: Send + Sync {
    /// All month records for a year, emptied months included.
    fn list_months(&self, year: i32) -> impl Future<Output = Result<Vec<IntentionMonth>>> + Send;

    /// Create the record for a month that has none.
    fn create_month(&self, payload: &MonthPayload) -> impl Future<Output = Result<IntentionMonth>> + Send;

    /// Replace every intention of an existing month record.
    fn update_month(
        &self,
        id: i64,
        payload: &MonthPayload,
    ) -> impl Future<Output = Result<IntentionMonth>> + Send;
}

/// Contact-message badge used by the unread poll.
pub trait MessagesApi: Send + Sync {
    fn unread_count(&self) -> impl Future<Output = Result<i64>> + Send;
}
