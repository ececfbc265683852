//! Monthly Mass intentions editing.
//!
//! - [`calendar`] - pure month/day helpers
//! - [`session`] - the admin edit session with its local draft

pub mod calendar;
pub mod session;

pub use session::{
    delete_payload, save_payload, DraftRow, EditSession, LeaveChoice, LeaveOutcome, MonthSummary,
    Notice, NoticeLevel, RowField, View,
};
