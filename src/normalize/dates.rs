//! Interpretation of "posted" timestamps scraped from listing pages.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

static VERBOSE_AGO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(minute|hour|day|week|month)s?\s*ago").expect("valid regex")
});

static COMPACT_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)([hmdw])\s*ago").expect("valid regex"));

/// Parse a posted-at string relative to the current instant.
pub fn parse_posted_at(text: &str) -> DateTime<Utc> {
    parse_posted_at_from(text, Utc::now())
}

/// Parse a posted-at string relative to `now`.
///
/// Accepts "2 hours ago", ISO-8601 timestamps or dates, and compact forms
/// like "3d ago". Anything else, including amounts too large to subtract,
/// yields `now`.
pub fn parse_posted_at_from(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let text = text.trim();
    if text.is_empty() {
        return now;
    }

    if let Some(caps) = VERBOSE_AGO.captures(text) {
        let unit = caps[2].to_ascii_lowercase();
        return subtract(now, &caps[1], &unit).unwrap_or(now);
    }

    if let Some(parsed) = parse_iso(text) {
        return parsed;
    }

    if let Some(caps) = COMPACT_AGO.captures(text) {
        let unit = match caps[2].to_ascii_lowercase().as_str() {
            "h" => "hour",
            "m" => "minute",
            "d" => "day",
            _ => "week",
        };
        return subtract(now, &caps[1], unit).unwrap_or(now);
    }

    tracing::debug!("Could not parse posted date: {text:?}");
    now
}

fn subtract(now: DateTime<Utc>, amount: &str, unit: &str) -> Option<DateTime<Utc>> {
    let amount: i64 = amount.parse().ok()?;
    let delta = match unit {
        "minute" => Duration::try_minutes(amount)?,
        "hour" => Duration::try_hours(amount)?,
        "day" => Duration::try_days(amount)?,
        "week" => Duration::try_weeks(amount)?,
        "month" => return now.checked_sub_months(Months::new(u32::try_from(amount).ok()?)),
        _ => return None,
    };
    now.checked_sub_signed(delta)
}

fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
