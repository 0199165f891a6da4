//! Input checks shared by the domain operations.
//!
//! Checks accumulate into a [`Violations`] list so a caller sees every bad
//! field at once rather than one per round trip.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::error::{DeskError, Result};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, field: &str, message: impl std::fmt::Display) {
        self.errors.push(format!("{}: {}", field, message));
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.push(field, message);
        }
        self
    }

    pub fn non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), field, "must not be empty")
    }

    pub fn min_chars(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        if value.chars().count() < min {
            self.push(field, format_args!("must be at least {} characters", min));
        }
        self
    }

    pub fn max_chars(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.push(field, format_args!("must be at most {} characters", max));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(EMAIL.is_match(value.trim()), field, "must be a valid email address")
    }

    pub fn non_negative(&mut self, field: &str, value: f64) -> &mut Self {
        self.check(value.is_finite() && value >= 0.0, field, "must be zero or greater")
    }

    pub fn percent(&mut self, field: &str, value: i32) -> &mut Self {
        self.check((0..=100).contains(&value), field, "must be between 0 and 100")
    }

    /// Parse a date, recording a violation and returning `None` when it fails.
    pub fn date(&mut self, field: &str, value: &str) -> Option<DateTime<Utc>> {
        match parse_date(value) {
            Some(date) => Some(date),
            None => {
                self.push(field, "must be a date (YYYY-MM-DD or RFC 3339)");
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Validation` error listing every violation, or `Ok` when there are none.
    pub fn finish(&self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(DeskError::Validation(self.errors.join("; ")))
        }
    }
}

/// RFC 3339 timestamps, or bare calendar dates taken as midnight UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trim, drop blanks, and de-duplicate while keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Remove duplicate ids, keeping first-seen order.
pub fn dedup_ids(ids: Vec<uuid::Uuid>) -> Vec<uuid::Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
