//! Input validation and sanitization for request payloads.
//!
//! Shape checks (dates, times, lengths) collect field-level messages into a
//! [`FieldErrors`] so a single response can report every bad field. Free text
//! is reduced to plain text before it reaches the store.

use crate::error::{Error, FieldError, Result};
use chrono::NaiveDate;

/// Maximum length of a single intention text, in characters.
pub const MAX_INTENTION_LEN: usize = 1000;

/// Maximum length of short single-line fields (titles, names, locations).
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length of long free-text fields (announcement bodies, bios).
pub const MAX_BODY_LEN: usize = 20_000;

/// Accepted year range for dated records.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=2200;

// ── Shape checks ─────────────────────────────────────────────

/// Parse a strict `YYYY-MM-DD` date.
///
/// Chrono alone accepts `2026-1-4`; the length and separator checks reject it.
#[must_use]
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let bytes = input.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
}

/// Check a strict `YYYY-MM-DD` date.
#[must_use]
pub fn is_valid_date(input: &str) -> bool {
    parse_date(input).is_some()
}

/// Check a strict 24h `HH:MM` time.
#[must_use]
pub fn is_valid_time(input: &str) -> bool {
    let bytes = input.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let (Ok(h), Ok(m)) = (input[..2].parse::<u32>(), input[3..].parse::<u32>()) else {
        return false;
    };
    bytes[..2].iter().chain(&bytes[3..]).all(u8::is_ascii_digit) && h < 24 && m < 60
}

// ── Sanitization ─────────────────────────────────────────────

/// Reduce free text to plain text.
///
/// Drops anything between `<` and `>`, decodes the handful of entities an
/// admin panel editor emits, and trims surrounding whitespace.
#[must_use]
pub fn sanitize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;

    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

// ── Field error collection ───────────────────────────────────

/// Collects field-level validation failures for one payload.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Sanitize a required text field, recording an error if it ends up
    /// empty or longer than `max` characters.
    pub fn required_text(&mut self, field: &str, value: &str, max: usize) -> String {
        let clean = sanitize_text(value);
        if clean.is_empty() {
            self.push(field, "is required");
        } else if clean.chars().count() > max {
            self.push(field, format!("must be at most {max} characters"));
        }
        clean
    }

    /// Sanitize an optional text field; empty input becomes `None`.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let clean = sanitize_text(value?);
        if clean.chars().count() > max {
            self.push(field, format!("must be at most {max} characters"));
        }
        (!clean.is_empty()).then_some(clean)
    }

    pub fn date(&mut self, field: &str, value: &str) -> Option<NaiveDate> {
        let parsed = parse_date(value.trim());
        if parsed.is_none() {
            self.push(field, "must be a date in YYYY-MM-DD format");
        }
        parsed
    }

    pub fn time(&mut self, field: &str, value: &str) -> String {
        let value = value.trim();
        if !is_valid_time(value) {
            self.push(field, "must be a time in HH:MM format");
        }
        value.to_string()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Finish validation: `Ok(value)` if nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` carrying every recorded field error.
    pub fn finish<T>(self, value: T) -> Result<T> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

// ── Similar-key suggestions ──────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Single-row optimization
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Find existing keys similar to the searched key.
///
/// Returns up to `max` suggestions with edit distance ≤ 3,
/// sorted by distance then alphabetically.
#[must_use]
pub fn find_similar_keys(searched: &str, existing: &[String], max: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|key| (levenshtein_distance(searched, key), key.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max)
        .map(|(_, key)| key.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_shape() {
        assert!(is_valid_date("2026-01-04"));
        assert!(is_valid_date("2024-02-29"));
        assert!(!is_valid_date("2025-02-29"));
        assert!(!is_valid_date("2026-1-4"));
        assert!(!is_valid_date("04.01.2026"));
        assert!(!is_valid_date(""));
    }

    #[test]
    fn test_time_shape() {
        assert!(is_valid_time("08:00"));
        assert!(is_valid_time("23:59"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("8:00"));
        assert!(!is_valid_time("08:60"));
        assert!(!is_valid_time("+8:00"));
        assert!(!is_valid_time("08-00"));
    }

    #[test]
    fn test_sanitize_strips_tags() {
        assert_eq!(
            sanitize_text("  <b>For the</b> parish<script>x</script> "),
            "For the parishx"
        );
        assert_eq!(sanitize_text("Tom &amp; Anna"), "Tom & Anna");
        assert_eq!(sanitize_text("<p></p>"), "");
    }

    #[test]
    fn test_field_errors_collects_all() {
        let mut errors = FieldErrors::new();
        errors.date("date", "2026-13-01");
        errors.time("time", "9am");
        let text = errors.required_text("intention", &"x".repeat(MAX_INTENTION_LEN + 1), MAX_INTENTION_LEN);
        assert_eq!(text.len(), MAX_INTENTION_LEN + 1);

        match errors.finish(()) {
            Err(Error::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["date", "time", "intention"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_optional_text_empty_is_none() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.optional_text("bio", Some("  <br> "), 10), None);
        assert_eq!(errors.optional_text("bio", None, 10), None);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_find_similar_keys() {
        let keys = vec!["patron".to_string(), "parish".to_string(), "pastoral-council".to_string()];
        let result = find_similar_keys("parsh", &keys, 3);
        assert_eq!(result.first().map(String::as_str), Some("parish"));
    }
}
