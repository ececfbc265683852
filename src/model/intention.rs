//! Mass intention models.
//!
//! Intentions are grouped by calendar month. A month record is unique per
//! (year, month) and owns its intentions; the REST layer always rewrites the
//! whole intentions array of a month at once.

use crate::error::Result;
use crate::validate::{FieldErrors, MAX_INTENTION_LEN, YEAR_RANGE};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// A single scheduled Mass intention as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intention {
    pub id: i64,
    /// `YYYY-MM-DD`, inside the owning month
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub intention: String,
}

/// A calendar month of intentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentionMonth {
    pub id: i64,
    pub year: i32,
    /// 1-12
    pub month: u32,
    #[serde(default)]
    pub intentions: Vec<Intention>,
}

impl IntentionMonth {
    /// Whether this record is for the given calendar month.
    #[must_use]
    pub fn is_for(&self, year: i32, month: u32) -> bool {
        self.year == year && self.month == month
    }
}

/// One intention as sent by the admin client (no id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentionInput {
    pub date: String,
    pub time: String,
    pub intention: String,
}

/// Body of `POST /intentions` and `PUT /intentions/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthPayload {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub intentions: Vec<IntentionInput>,
}

impl MonthPayload {
    /// Validate and sanitize the payload.
    ///
    /// Every intention must carry a `YYYY-MM-DD` date inside the payload's
    /// month, an `HH:MM` time, and non-empty text of at most
    /// [`MAX_INTENTION_LEN`] characters once HTML is stripped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` listing every offending field.
    pub fn validate(&self) -> Result<Self> {
        let mut errors = FieldErrors::new();

        if !(1..=12).contains(&self.month) {
            errors.push("month", "must be between 1 and 12");
        }
        if !YEAR_RANGE.contains(&self.year) {
            errors.push(
                "year",
                format!("must be between {} and {}", YEAR_RANGE.start(), YEAR_RANGE.end()),
            );
        }

        let mut intentions = Vec::with_capacity(self.intentions.len());
        for (i, row) in self.intentions.iter().enumerate() {
            let date_field = format!("intentions[{i}].date");
            if let Some(date) = errors.date(&date_field, &row.date) {
                if date.year() != self.year || date.month() != self.month {
                    errors.push(
                        &date_field,
                        format!("must fall within {}-{:02}", self.year, self.month),
                    );
                }
            }
            let time = errors.time(&format!("intentions[{i}].time"), &row.time);
            let intention = errors.required_text(
                &format!("intentions[{i}].intention"),
                &row.intention,
                MAX_INTENTION_LEN,
            );
            intentions.push(IntentionInput {
                date: row.date.trim().to_string(),
                time,
                intention,
            });
        }

        errors.finish(Self {
            year: self.year,
            month: self.month,
            intentions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn row(date: &str, time: &str, text: &str) -> IntentionInput {
        IntentionInput {
            date: date.to_string(),
            time: time.to_string(),
            intention: text.to_string(),
        }
    }

    #[test]
    fn test_valid_payload_is_sanitized() {
        let payload = MonthPayload {
            year: 2026,
            month: 1,
            intentions: vec![row("2026-01-04", "08:00", " <i>For the parish</i> ")],
        };
        let clean = payload.validate().unwrap();
        assert_eq!(clean.intentions[0].intention, "For the parish");
    }

    #[test]
    fn test_date_outside_month_rejected() {
        let payload = MonthPayload {
            year: 2026,
            month: 2,
            intentions: vec![row("2026-03-01", "08:00", "x")],
        };
        match payload.validate() {
            Err(Error::Validation(fields)) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "intentions[0].date");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_month_and_year_ranges() {
        let payload = MonthPayload {
            year: 1200,
            month: 13,
            intentions: vec![],
        };
        let Err(Error::Validation(fields)) = payload.validate() else {
            panic!("expected validation error");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["month", "year"]);
    }

    #[test]
    fn test_text_cap() {
        let payload = MonthPayload {
            year: 2026,
            month: 1,
            intentions: vec![row("2026-01-04", "08:00", &"a".repeat(MAX_INTENTION_LEN + 1))],
        };
        assert!(payload.validate().is_err());

        let payload = MonthPayload {
            year: 2026,
            month: 1,
            intentions: vec![row("2026-01-04", "08:00", &"a".repeat(MAX_INTENTION_LEN))],
        };
        assert!(payload.validate().is_ok());
    }
}
