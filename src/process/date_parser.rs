use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// `M.D.YYYY` with one or two digit month and day, anywhere in the name.
static FILENAME_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("static regex"));

/// Timestamp layouts written by the logger export tools we see in the field.
/// Two-digit-year layouts come first: `%Y` would happily read "24" as year 24.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Output layout for timestamps in the combined dataset and anomaly log.
pub const TIMESTAMP_OUT: &str = "%m/%d/%Y %H:%M";

/// Extract the first `month.day.year` date embedded in `file_name`.
///
/// Only the leftmost match is considered; if it does not form a real
/// calendar date the result is `None`, never an error.
pub fn extract_date_from_filename(file_name: &str) -> Option<NaiveDate> {
    let caps = FILENAME_DATE.captures(file_name)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a logger timestamp cell. Fractional seconds (`.000`) are dropped.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }
    let s = match s.split_once('.') {
        // "2024-01-27 13:15:00.000" -> drop the fraction, but keep "1.27.2024"-style text intact
        Some((head, frac)) if head.len() >= 16 && frac.chars().all(|c| c.is_ascii_digit()) => head,
        _ => s,
    };
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            // a bare date still marks a point in time
            NaiveDate::parse_from_str(s, "%m/%d/%Y")
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_OUT).to_string()
}
