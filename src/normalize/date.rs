//! Chapter date normalization.
//!
//! Source sites print release dates in whatever format their theme uses
//! ("05/01/2023", "January 5, 2023", "5th January 2023", "Dec 01", "3 days
//! ago"). Everything is reduced to one relative phrase such as
//! `"3 months ago"`.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// Already-relative phrases like "3 months ago" or "an hour ago".
static RELATIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d+|an?|one)\s+(second|sec|minute|min|hour|hr|day|week|month|year)s?\s+ago\b",
    )
    .unwrap()
});

/// Ordinal suffixes on day numbers ("1st", "22nd").
static ORDINAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap());

/// The single format tried for a given piece of date text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateFormat {
    /// `05/01/2023`
    DaySlashMonthYear,
    /// `January 5, 2023`
    MonthNameDayCommaYear,
    /// `05-01-2023`
    DayDashMonthYear,
    /// `Dec 01`, current year
    ShortMonthDay,
    /// `5th January 2023`
    OrdinalDayMonthNameYear,
}

impl DateFormat {
    /// Picks a format from the text's punctuation and length.
    fn detect(text: &str) -> Self {
        if text.contains('/') {
            DateFormat::DaySlashMonthYear
        } else if text.contains(',') {
            DateFormat::MonthNameDayCommaYear
        } else if text.contains('-') {
            DateFormat::DayDashMonthYear
        } else if text.chars().count() == 6 {
            DateFormat::ShortMonthDay
        } else {
            DateFormat::OrdinalDayMonthNameYear
        }
    }

    fn parse(self, text: &str, current_year: i32) -> Option<NaiveDate> {
        match self {
            DateFormat::DaySlashMonthYear => NaiveDate::parse_from_str(text, "%d/%m/%Y").ok(),
            DateFormat::MonthNameDayCommaYear => NaiveDate::parse_from_str(text, "%B %d, %Y").ok(),
            DateFormat::DayDashMonthYear => NaiveDate::parse_from_str(text, "%d-%m-%Y").ok(),
            DateFormat::ShortMonthDay => {
                NaiveDate::parse_from_str(&format!("{} {}", text, current_year), "%b %d %Y").ok()
            }
            DateFormat::OrdinalDayMonthNameYear => {
                let stripped = ORDINAL_REGEX.replace_all(text, "$1");
                NaiveDate::parse_from_str(&stripped, "%d %B %Y").ok()
            }
        }
    }
}

/// Normalizes chapter date text against the current local time.
///
/// `fallback` is a secondary string (usually a link's `title` attribute)
/// consulted only when `text` is neither a parseable date nor a relative
/// phrase.
pub fn normalize_date(text: Option<&str>, fallback: Option<&str>) -> String {
    normalize_date_at(text, fallback, Local::now().naive_local())
}

/// Same as [`normalize_date`], relative to `now`.
pub fn normalize_date_at(text: Option<&str>, fallback: Option<&str>, now: NaiveDateTime) -> String {
    let text = text.map(str::trim).unwrap_or_default();

    if !text.ends_with("ago")
        && let Some(date) = DateFormat::detect(text).parse(text, now.year())
        && let Some(then) = date.and_hms_opt(0, 0, 0)
    {
        return from_now(then, now);
    }

    relative_phrase(text)
        .or_else(|| fallback.and_then(relative_phrase))
        .unwrap_or_default()
}

/// Canonicalizes an already-relative phrase, if `text` contains one.
pub fn relative_phrase(text: &str) -> Option<String> {
    let caps = RELATIVE_REGEX.captures(text)?;
    let count = caps.get(1)?.as_str().to_lowercase();
    let unit = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "sec" | "second" => "second",
        "min" | "minute" => "minute",
        "hr" | "hour" => "hour",
        "day" => "day",
        "week" => "week",
        "month" => "month",
        _ => "year",
    };

    let singular = matches!(count.as_str(), "a" | "an" | "one" | "1");
    if singular {
        let article = if unit == "hour" { "an" } else { "a" };
        Some(format!("{} {} ago", article, unit))
    } else {
        Some(format!("{} {}s ago", count, unit))
    }
}

/// Renders the distance between `then` and `now` as a relative phrase.
///
/// Thresholds: under 45 seconds is "a few seconds", under 45 minutes
/// counts minutes, under 22 hours counts hours, under 26 days counts days,
/// under 11 months counts months, then years.
pub fn from_now(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let delta = now.signed_duration_since(then);
    let past = delta.num_milliseconds() >= 0;
    let seconds = (delta.num_milliseconds().abs() as f64) / 1000.0;

    let minutes = (seconds / 60.0).round() as i64;
    let hours = (seconds / 3600.0).round() as i64;
    let days_exact = seconds / 86_400.0;
    let days = days_exact.round() as i64;
    let months_exact = days_exact * 4800.0 / 146_097.0;
    let months = months_exact.round() as i64;
    let years = (months_exact / 12.0).round() as i64;

    let phrase = if seconds.round() < 45.0 {
        "a few seconds".to_string()
    } else if minutes <= 1 {
        "a minute".to_string()
    } else if minutes < 45 {
        format!("{} minutes", minutes)
    } else if hours <= 1 {
        "an hour".to_string()
    } else if hours < 22 {
        format!("{} hours", hours)
    } else if days <= 1 {
        "a day".to_string()
    } else if days < 26 {
        format!("{} days", days)
    } else if months <= 1 {
        "a month".to_string()
    } else if months < 11 {
        format!("{} months", months)
    } else if years <= 1 {
        "a year".to_string()
    } else {
        format!("{} years", years)
    };

    if past {
        format!("{} ago", phrase)
    } else {
        format!("in {}", phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(DateFormat::detect("05/01/2023"), DateFormat::DaySlashMonthYear);
        assert_eq!(DateFormat::detect("January 5, 2023"), DateFormat::MonthNameDayCommaYear);
        assert_eq!(DateFormat::detect("05-01-2023"), DateFormat::DayDashMonthYear);
        assert_eq!(DateFormat::detect("Dec 01"), DateFormat::ShortMonthDay);
        assert_eq!(DateFormat::detect("5th January 2023"), DateFormat::OrdinalDayMonthNameYear);
    }

    #[test]
    fn test_relative_input_is_idempotent() {
        assert_eq!(normalize_date_at(Some("3 months ago"), None, now()), "3 months ago");
        assert_eq!(normalize_date_at(Some("an hour ago"), None, now()), "an hour ago");
        assert_eq!(
            normalize_date(Some(&normalize_date(Some("3 months ago"), None)), None),
            "3 months ago"
        );
    }

    #[test]
    fn test_relative_phrase_canonical() {
        assert_eq!(relative_phrase("1 day ago").as_deref(), Some("a day ago"));
        assert_eq!(relative_phrase("Updated 2 Hours ago").as_deref(), Some("2 hours ago"));
        assert_eq!(relative_phrase("5 mins ago").as_deref(), Some("5 minutes ago"));
        assert_eq!(relative_phrase("January 5, 2023"), None);
    }

    #[test]
    fn test_day_slash_month_year() {
        assert_eq!(normalize_date_at(Some("15/03/2024"), None, now()), "3 months ago");
    }

    #[test]
    fn test_month_name_day_year() {
        assert_eq!(normalize_date_at(Some("June 10, 2024"), None, now()), "5 days ago");
        assert_eq!(normalize_date_at(Some(" Jun 10, 2024 "), None, now()), "5 days ago");
    }

    #[test]
    fn test_day_dash_month_year() {
        assert_eq!(normalize_date_at(Some("15-06-2022"), None, now()), "2 years ago");
    }

    #[test]
    fn test_short_month_day_uses_current_year() {
        assert_eq!(normalize_date_at(Some("Jun 01"), None, now()), "14 days ago");
    }

    #[test]
    fn test_ordinal_day_month_year() {
        assert_eq!(normalize_date_at(Some("1st May 2024"), None, now()), "a month ago");
    }

    #[test]
    fn test_fallback_title_attribute() {
        assert_eq!(
            normalize_date_at(Some("NEW"), Some("2 days ago"), now()),
            "2 days ago"
        );
        assert_eq!(normalize_date_at(None, Some("4 weeks ago"), now()), "4 weeks ago");
    }

    #[test]
    fn test_unparseable_without_fallback_is_empty() {
        assert_eq!(normalize_date_at(Some("soon"), None, now()), "");
        assert_eq!(normalize_date_at(None, None, now()), "");
    }

    #[test]
    fn test_from_now_thresholds() {
        let base = now();
        let ago = |secs: i64| from_now(base - chrono::Duration::seconds(secs), base);

        assert_eq!(ago(10), "a few seconds ago");
        assert_eq!(ago(60), "a minute ago");
        assert_eq!(ago(30 * 60), "30 minutes ago");
        assert_eq!(ago(60 * 60), "an hour ago");
        assert_eq!(ago(5 * 3600), "5 hours ago");
        assert_eq!(ago(30 * 3600), "a day ago");
        assert_eq!(ago(10 * 86_400), "10 days ago");
        assert_eq!(ago(30 * 86_400), "a month ago");
        assert_eq!(ago(200 * 86_400), "7 months ago");
        assert_eq!(ago(400 * 86_400), "a year ago");
        assert_eq!(ago(1000 * 86_400), "3 years ago");
        assert_eq!(
            from_now(base + chrono::Duration::days(3), base),
            "in 3 days"
        );
    }
}
