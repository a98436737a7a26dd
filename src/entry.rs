// 🗂️ Data Mapper
// Raw spreadsheet rows → ImprovementEntry, with the month bucket derived
// from the free-text "Date and Time" column.

use crate::month::Month;
use crate::row::{keys, RowRecord};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// ENTRY
// ============================================================================

/// One before/after improvement record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementEntry {
    /// Synthetic "entry-<n>", unique within one fetch
    pub id: String,
    pub control_number: String,
    pub record_number: String,
    pub area_code: String,
    pub category: String,
    pub entry_title: String,
    pub description: String,
    pub before_image: String,
    pub improvement: String,
    pub after_image: String,
    pub improvement_effect: String,
    /// Timestamp text exactly as stored in the sheet
    pub date_time: String,
    /// Canonical month name, or empty when it could not be determined
    pub month: String,
}

impl ImprovementEntry {
    /// Map one row; `index` is 0-based
    pub fn from_row(index: usize, row: &RowRecord) -> Self {
        let date_time = row.text(keys::DATE_AND_TIME);
        let month = derive_month(&date_time);

        ImprovementEntry {
            id: format!("entry-{}", index + 1),
            control_number: row.text(keys::CONTROL_NUMBER),
            record_number: row.text(keys::RECORD_NUMBER),
            area_code: row.text(keys::AREA_CODE),
            category: row.text(keys::CATEGORY),
            entry_title: row.text(keys::ENTRY_TITLE),
            description: row.text(keys::DESCRIPTION),
            before_image: row.text(keys::BEFORE_IMAGE),
            improvement: row.text(keys::IMPROVEMENT),
            after_image: row.text(keys::AFTER_IMAGE),
            improvement_effect: row.text(keys::IMPROVEMENT_EFFECT),
            date_time,
            month,
        }
    }

    /// Parsed month bucket, None when undetermined
    pub fn month(&self) -> Option<Month> {
        Month::from_name(&self.month)
    }
}

/// Map every row, in order; never fails
pub fn map_rows(rows: &[RowRecord]) -> Vec<ImprovementEntry> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| ImprovementEntry::from_row(i, row))
        .collect()
}

/// Entries whose month equals `month`, ignoring case, input order kept
///
/// Entries with an undetermined month never match.
pub fn filter_entries_by_month(entries: &[ImprovementEntry], month: &str) -> Vec<ImprovementEntry> {
    let month = month.trim();
    if month.is_empty() {
        return Vec::new();
    }

    entries
        .iter()
        .filter(|e| e.month.eq_ignore_ascii_case(month))
        .cloned()
        .collect()
}

// ============================================================================
// MONTH DERIVATION
// ============================================================================

lazy_static! {
    /// D-M-YYYY / D/M/YYYY style numeric dates anywhere in the text
    static ref NUMERIC_DATE_PATTERN: Regex =
        Regex::new(r"(\d{1,2})[-/](\d{1,2})[-/](\d{4})").unwrap();
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

/// A timestamp recognised as a calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarStamp {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl CalendarStamp {
    pub fn date(&self) -> NaiveDate {
        match self {
            CalendarStamp::Date(d) => *d,
            CalendarStamp::DateTime(dt) => dt.date(),
        }
    }
}

/// Parse `text` as a whole calendar date or date-time
///
/// Offsets in RFC 3339 / RFC 2822 stamps are shifted into the viewer's
/// local time zone; naive stamps are taken as written.
pub fn parse_calendar(text: &str) -> Option<CalendarStamp> {
    parse_calendar_in(text, &Local)
}

/// `parse_calendar` with offset stamps shifted into `tz`
pub fn parse_calendar_in<Tz: TimeZone>(text: &str, tz: &Tz) -> Option<CalendarStamp> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(CalendarStamp::DateTime(dt.with_timezone(tz).naive_local()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(CalendarStamp::DateTime(dt.with_timezone(tz).naive_local()));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(CalendarStamp::DateTime(dt));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return Some(CalendarStamp::Date(d));
        }
    }

    None
}

/// Step 1: the text is itself a calendar date
pub fn month_from_calendar(text: &str) -> Option<Month> {
    parse_calendar(text).and_then(|stamp| Month::from_number(stamp.date().month()))
}

/// Step 2: first canonical month name (calendar order) mentioned anywhere
pub fn month_from_name_scan(text: &str) -> Option<Month> {
    let lower = text.to_lowercase();
    Month::ALL
        .iter()
        .copied()
        .find(|m| lower.contains(&m.name().to_lowercase()))
}

/// Step 3: leading number of a `N-N-YYYY` / `N/N/YYYY` pattern, if 1..=12
pub fn month_from_numeric_pattern(text: &str) -> Option<Month> {
    let caps = NUMERIC_DATE_PATTERN.captures(text)?;
    let first: u32 = caps.get(1)?.as_str().parse().ok()?;
    Month::from_number(first)
}

/// Derive the month bucket for a free-text timestamp
///
/// Tries each step in order and degrades to "" when none applies.
pub fn derive_month(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    month_from_calendar(text)
        .or_else(|| month_from_name_scan(text))
        .or_else(|| month_from_numeric_pattern(text))
        .map(|m| m.name().to_string())
        .unwrap_or_default()
}

/// Human-readable timestamp ("May 16, 2025, 10:30 AM"); unparseable text
/// is returned unchanged
pub fn format_date_time(text: &str) -> String {
    match parse_calendar(text) {
        Some(CalendarStamp::DateTime(dt)) => dt.format("%B %-d, %Y, %I:%M %p").to_string(),
        Some(CalendarStamp::Date(d)) => d.format("%B %-d, %Y").to_string(),
        None => text.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
