//! The monthly intentions edit session.
//!
//! An [`EditSession`] holds the admin's local draft of one month. Adding and
//! editing rows only touches the draft; [`EditSession::save`] commits the
//! whole month in one replace-all write. Deleting a row that is already
//! stored is the exception: it is written immediately.
//!
//! The session has no UI. Results of network operations are queued as
//! [`Notice`]s for whatever front end drives it.

use super::calendar::{clamp_to_month, date_in_month, month_bounds, month_name};
use crate::client::IntentionsApi;
use crate::error::{Error, FieldError, Result};
use crate::model::{Intention, IntentionInput, IntentionMonth, MonthPayload};
use chrono::{Locale, NaiveDate};
use std::str::FromStr;
use tracing::debug;

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// The twelve months of a year with their intention counts.
    MonthList { year: i32 },
    /// Editing the draft of one month.
    MonthEdit { year: i32, month: u32 },
}

/// One row of the local draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftRow {
    /// Stored id; `None` for rows added since the last load.
    pub id: Option<i64>,
    pub date: String,
    pub time: String,
    pub text: String,
    pub is_new: bool,
    pub is_modified: bool,
}

impl DraftRow {
    fn from_intention(intention: &Intention) -> Self {
        Self {
            id: Some(intention.id),
            date: intention.date.clone(),
            time: intention.time.clone(),
            text: intention.intention.clone(),
            is_new: false,
            is_modified: false,
        }
    }

    /// Date, time and text are all filled in. Incomplete rows never reach
    /// the server.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.date.trim().is_empty() && !self.time.trim().is_empty() && !self.text.trim().is_empty()
    }

    fn to_input(&self) -> IntentionInput {
        IntentionInput {
            date: self.date.trim().to_string(),
            time: self.time.trim().to_string(),
            intention: self.text.trim().to_string(),
        }
    }
}

/// Editable field of a draft row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Date,
    Time,
    Text,
}

impl FromStr for RowField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "text" | "intention" => Ok(Self::Text),
            other => Err(Error::InvalidArgument(format!(
                "Unknown field '{other}' (use date, time or text)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A dismissible message for the admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// One entry of the month list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSummary {
    pub month: u32,
    pub month_id: Option<i64>,
    pub count: usize,
}

/// Answer to the unsaved-changes prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveChoice {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Back on the month list.
    Left,
    /// The draft is dirty; call [`EditSession::resolve_leave`].
    NeedsConfirmation,
    /// Still editing the month.
    Stayed,
}

/// Payload for a save: every complete row, in draft order.
#[must_use]
pub fn save_payload(year: i32, month: u32, rows: &[DraftRow]) -> MonthPayload {
    MonthPayload {
        year,
        month,
        intentions: rows
            .iter()
            .filter(|r| r.is_complete())
            .map(DraftRow::to_input)
            .collect(),
    }
}

/// Payload for deleting the stored row at `removed`: every other complete
/// stored row with its current draft values. Rows added since the last load
/// are left out; they stay in the draft.
#[must_use]
pub fn delete_payload(year: i32, month: u32, rows: &[DraftRow], removed: usize) -> MonthPayload {
    MonthPayload {
        year,
        month,
        intentions: rows
            .iter()
            .enumerate()
            .filter(|(i, r)| *i != removed && r.id.is_some() && r.is_complete())
            .map(|(_, r)| r.to_input())
            .collect(),
    }
}

/// Reject payload dates that fall outside the month before anything is sent.
fn check_dates(payload: &MonthPayload) -> Result<()> {
    let (first, last) = month_bounds(payload.year, payload.month).ok_or_else(|| {
        Error::InvalidArgument(format!("Invalid month {}-{:02}", payload.year, payload.month))
    })?;
    let errors: Vec<FieldError> = payload
        .intentions
        .iter()
        .enumerate()
        .filter(|(_, row)| !date_in_month(&row.date, payload.year, payload.month))
        .map(|(i, row)| {
            FieldError::new(
                format!("intentions[{i}].date"),
                format!("{} is not between {first} and {last}", row.date),
            )
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

/// Admin edit session for monthly intentions.
pub struct EditSession<A: IntentionsApi> {
    api: A,
    locale: Locale,
    view: View,
    months: Vec<IntentionMonth>,
    month_id: Option<i64>,
    rows: Vec<DraftRow>,
    dirty: bool,
    pending_leave: bool,
    notices: Vec<Notice>,
}

impl<A: IntentionsApi> EditSession<A> {
    /// Create a session on the month list of `year`. Nothing is fetched
    /// until [`Self::load`].
    pub fn new(api: A, year: i32, locale: Locale) -> Self {
        Self {
            api,
            locale,
            view: View::MonthList { year },
            months: Vec::new(),
            month_id: None,
            rows: Vec::new(),
            dirty: false,
            pending_leave: false,
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn view(&self) -> View {
        self.view
    }

    #[must_use]
    pub fn rows(&self) -> &[DraftRow] {
        &self.rows
    }

    #[must_use]
    pub fn month_id(&self) -> Option<i64> {
        self.month_id
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether quitting the process must be confirmed first.
    #[must_use]
    pub fn needs_unload_confirmation(&self) -> bool {
        self.dirty
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn year(&self) -> i32 {
        match self.view {
            View::MonthList { year } | View::MonthEdit { year, .. } => year,
        }
    }

    fn editing(&self) -> Result<(i32, u32)> {
        match self.view {
            View::MonthEdit { year, month } => Ok((year, month)),
            View::MonthList { .. } => Err(Error::InvalidArgument("No month is open".to_string())),
        }
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    fn notify_error(&mut self, err: &Error) {
        let message = match err.hint() {
            Some(hint) => format!("{err} ({hint})"),
            None => err.to_string(),
        };
        self.notify(NoticeLevel::Error, message);
    }

    fn label(&self, year: i32, month: u32) -> String {
        month_name(month, self.locale).map_or_else(|| format!("{year}-{month:02}"), |name| format!("{name} {year}"))
    }

    /// Refuse to drop a month draft with unsaved changes.
    fn ensure_no_unsaved(&self) -> Result<()> {
        match self.view {
            View::MonthEdit { year, month } if self.dirty => Err(Error::InvalidArgument(format!(
                "{} has unsaved changes; save or discard them first",
                self.label(year, month)
            ))),
            _ => Ok(()),
        }
    }

    /// Fetch the month list for `year` and show it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` while the open month has unsaved
    /// changes (leave it through [`Self::try_leave`] first), or the API error
    /// with an error notice queued.
    pub async fn load(&mut self, year: i32) -> Result<()> {
        self.ensure_no_unsaved()?;
        match self.api.list_months(year).await {
            Ok(months) => {
                self.months = months;
                self.view = View::MonthList { year };
                self.month_id = None;
                self.rows.clear();
                self.dirty = false;
                self.pending_leave = false;
                Ok(())
            }
            Err(e) => {
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    /// The twelve months of the loaded year with their intention counts.
    #[must_use]
    pub fn month_summaries(&self) -> Vec<MonthSummary> {
        let year = self.year();
        (1..=12)
            .map(|month| {
                let record = self.months.iter().find(|m| m.is_for(year, month));
                MonthSummary {
                    month,
                    month_id: record.map(|m| m.id),
                    count: record.map_or(0, |m| m.intentions.len()),
                }
            })
            .collect()
    }

    /// Open a month of the loaded year for editing.
    ///
    /// Uses the already fetched list; a month with no record starts empty.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for a month outside 1-12, or while the
    /// open month has unsaved changes.
    pub fn enter_month(&mut self, month: u32) -> Result<()> {
        self.ensure_no_unsaved()?;
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidArgument(format!("Month must be 1-12, got {month}")));
        }
        let year = self.year();
        self.load_draft(year, month);
        self.view = View::MonthEdit { year, month };
        self.dirty = false;
        self.pending_leave = false;
        Ok(())
    }

    /// Take a month record returned by a write as the new draft and keep the
    /// fetched list in step with it.
    fn apply_saved(&mut self, saved: IntentionMonth) {
        self.month_id = Some(saved.id);
        self.rows = saved.intentions.iter().map(DraftRow::from_intention).collect();
        match self
            .months
            .iter_mut()
            .find(|m| m.id == saved.id || m.is_for(saved.year, saved.month))
        {
            Some(entry) => *entry = saved,
            None => self.months.push(saved),
        }
    }

    fn load_draft(&mut self, year: i32, month: u32) {
        match self.months.iter().find(|m| m.is_for(year, month)) {
            Some(record) => {
                self.month_id = Some(record.id);
                self.rows = record.intentions.iter().map(DraftRow::from_intention).collect();
            }
            None => {
                self.month_id = None;
                self.rows = Vec::new();
            }
        }
    }

    /// Append an empty row dated `today` clamped into the open month.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if no month is open.
    pub fn add_row(&mut self, today: NaiveDate) -> Result<usize> {
        let (year, month) = self.editing()?;
        let date = clamp_to_month(today, year, month)
            .ok_or_else(|| Error::InvalidArgument(format!("Invalid month {year}-{month:02}")))?;

        self.rows.push(DraftRow {
            id: None,
            date: date.format("%Y-%m-%d").to_string(),
            time: String::new(),
            text: String::new(),
            is_new: true,
            is_modified: false,
        });
        self.dirty = true;
        Ok(self.rows.len() - 1)
    }

    /// Change one field of a draft row.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if no month is open or the index is
    /// out of range.
    pub fn edit_row(&mut self, index: usize, field: RowField, value: &str) -> Result<()> {
        self.editing()?;
        let row = self
            .rows
            .get_mut(index)
            .ok_or_else(|| Error::InvalidArgument(format!("No row {index}")))?;

        let value = value.to_string();
        match field {
            RowField::Date => row.date = value,
            RowField::Time => row.time = value,
            RowField::Text => row.text = value,
        }
        if !row.is_new {
            row.is_modified = true;
        }
        self.dirty = true;
        Ok(())
    }

    /// Remove a draft row.
    ///
    /// A row added since the last load is dropped locally. A stored row is
    /// deleted on the server at once: the month is rewritten with every other
    /// complete stored row (see [`delete_payload`]) and the draft is rebuilt
    /// from the month the server returns. Rows added since the last load are
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for a bad index, or the API error
    /// (with a notice queued and the draft untouched).
    pub async fn delete_row(&mut self, index: usize) -> Result<()> {
        let (year, month) = self.editing()?;
        let row = self
            .rows
            .get(index)
            .ok_or_else(|| Error::InvalidArgument(format!("No row {index}")))?;

        let id = match (row.is_new, self.month_id) {
            (true, _) => {
                self.rows.remove(index);
                self.dirty = self.rows.iter().any(|r| r.is_new || r.is_modified);
                return Ok(());
            }
            (false, Some(id)) => id,
            (false, None) => {
                return Err(Error::Other("Stored row without a month record".to_string()));
            }
        };

        let payload = delete_payload(year, month, &self.rows, index);
        if let Err(e) = check_dates(&payload) {
            self.notify_error(&e);
            return Err(e);
        }

        debug!(month_id = id, remaining = payload.intentions.len(), "Deleting stored intention");
        match self.api.update_month(id, &payload).await {
            Ok(saved) => {
                self.notify(NoticeLevel::Success, "Intention deleted");
                let unsaved: Vec<DraftRow> = self.rows.iter().filter(|r| r.is_new).cloned().collect();
                self.apply_saved(saved);
                self.dirty = !unsaved.is_empty();
                self.rows.extend(unsaved);
                self.refresh_months(year).await;
                Ok(())
            }
            Err(e) => {
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    /// Commit the draft as one replace-all write.
    ///
    /// Updates the month record in place if it exists, creates it otherwise.
    /// Incomplete rows are dropped from the payload.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a date falls outside the month (nothing
    /// is sent), or the API error. Either way a notice is queued and the
    /// draft and dirty flag are left as they were.
    pub async fn save(&mut self) -> Result<()> {
        let (year, month) = self.editing()?;
        let payload = save_payload(year, month, &self.rows);
        if let Err(e) = check_dates(&payload) {
            self.notify_error(&e);
            return Err(e);
        }

        let result = match self.month_id {
            Some(id) => self.api.update_month(id, &payload).await,
            None => self.api.create_month(&payload).await,
        };

        match result {
            Ok(saved) => {
                let count = saved.intentions.len();
                self.apply_saved(saved);
                self.dirty = false;
                self.notify(
                    NoticeLevel::Success,
                    format!("Saved {count} intentions for {}", self.label(year, month)),
                );
                self.refresh_months(year).await;
                Ok(())
            }
            Err(e) => {
                self.notify_error(&e);
                Err(e)
            }
        }
    }

    /// Refetch the month list after a write. The draft already reflects the
    /// write, so a failure only queues a notice.
    async fn refresh_months(&mut self, year: i32) {
        match self.api.list_months(year).await {
            Ok(months) => self.months = months,
            Err(e) => self.notify_error(&e),
        }
    }

    /// Ask to go back to the month list.
    pub fn try_leave(&mut self) -> LeaveOutcome {
        if matches!(self.view, View::MonthList { .. }) {
            return LeaveOutcome::Left;
        }
        if self.dirty {
            self.pending_leave = true;
            return LeaveOutcome::NeedsConfirmation;
        }
        self.leave();
        LeaveOutcome::Left
    }

    /// Answer a pending [`LeaveOutcome::NeedsConfirmation`].
    ///
    /// With [`LeaveChoice::Save`] a failed save keeps the session on the
    /// month; the error is in the notices.
    pub async fn resolve_leave(&mut self, choice: LeaveChoice) -> LeaveOutcome {
        if !self.pending_leave {
            return self.try_leave();
        }
        self.pending_leave = false;

        match choice {
            LeaveChoice::Cancel => LeaveOutcome::Stayed,
            LeaveChoice::Discard => {
                self.leave();
                LeaveOutcome::Left
            }
            LeaveChoice::Save => {
                if self.save().await.is_ok() {
                    self.leave();
                    LeaveOutcome::Left
                } else {
                    LeaveOutcome::Stayed
                }
            }
        }
    }

    fn leave(&mut self) {
        self.view = View::MonthList { year: self.year() };
        self.month_id = None;
        self.rows.clear();
        self.dirty = false;
    }
}
