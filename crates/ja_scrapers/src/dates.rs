//! Free-form posting dates.

use chrono::{DateTime, Duration, NaiveDate};

const LABELS: &[&str] = &["date posted:", "posted on:", "posted on", "posted:", "posted", "published:", "published"];

const FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
];

/// Parses a posting date as it appears on a page. Relative forms
/// ("3 days ago", "yesterday") resolve against `today`. Returns `None` for
/// anything unrecognised.
pub fn parse_posted_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = strip_label(text.trim());
    if text.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.date_naive());
    }

    // ISO dates with a trailing time or zone we don't otherwise understand
    if let Some(prefix) = text.get(..10) {
        for format in &FORMATS[..2] {
            if let Ok(date) = NaiveDate::parse_from_str(prefix, format) {
                return Some(date);
            }
        }
    }

    let cleaned = strip_ordinals(text);
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return Some(date);
        }
    }

    parse_relative(&text.to_lowercase(), today)
}

fn strip_label(text: &str) -> &str {
    let lower = text.to_lowercase();
    for label in LABELS {
        if lower.starts_with(label) && text.is_char_boundary(label.len()) {
            return text[label.len()..].trim();
        }
    }
    text
}

/// "March 3rd, 2024" -> "March 3, 2024"
fn strip_ordinals(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let (core, tail) = match word.strip_suffix(',') {
                Some(core) => (core, ","),
                None => (word, ""),
            };
            let digits = core.trim_end_matches(|c: char| c.is_ascii_alphabetic());
            let suffix = &core[digits.len()..];
            if !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
                && matches!(suffix, "st" | "nd" | "rd" | "th")
            {
                format!("{}{}", digits, tail)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_relative(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    match text {
        "today" | "just now" | "just posted" => return Some(today),
        "yesterday" => return today.checked_sub_signed(Duration::days(1)),
        _ => {}
    }

    let rest = text.strip_suffix("ago")?.trim();
    let mut parts = rest.split_whitespace();
    let amount = parts.next()?.trim_end_matches('+');
    let unit = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let amount: i64 = if amount == "a" || amount == "an" { 1 } else { amount.parse().ok()? };
    let days = match unit.trim_end_matches('s') {
        "second" | "minute" | "hour" => 0,
        "day" => amount,
        "week" => amount.checked_mul(7)?,
        "month" => amount.checked_mul(30)?,
        _ => return None,
    };
    today.checked_sub_signed(Duration::try_days(days)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_absolute_formats() {
        let today = date(2024, 6, 1);
        let expected = Some(date(2024, 3, 5));
        for text in [
            "2024-03-05",
            "2024-03-05T09:30:00Z",
            "2024-03-05T09:30:00+02:00",
            "2024-03-05 09:30",
            "2024/03/05",
            "03/05/2024",
            "March 5, 2024",
            "Mar 5, 2024",
            "March 5th, 2024",
            "5 March 2024",
            "Posted on March 5, 2024",
            "Date posted: 2024-03-05",
        ] {
            assert_eq!(parse_posted_date(text, today), expected, "failed on '{}'", text);
        }
    }

    #[test]
    fn test_rfc3339_uses_offset_date() {
        assert_eq!(
            parse_posted_date("2024-03-05T23:30:00-05:00", date(2024, 6, 1)),
            Some(date(2024, 3, 5))
        );
    }

    #[test]
    fn test_relative_formats() {
        let today = date(2024, 6, 10);
        assert_eq!(parse_posted_date("today", today), Some(today));
        assert_eq!(parse_posted_date("Yesterday", today), Some(date(2024, 6, 9)));
        assert_eq!(parse_posted_date("3 days ago", today), Some(date(2024, 6, 7)));
        assert_eq!(parse_posted_date("Posted 1 day ago", today), Some(date(2024, 6, 9)));
        assert_eq!(parse_posted_date("2 weeks ago", today), Some(date(2024, 5, 27)));
        assert_eq!(parse_posted_date("30+ days ago", today), Some(date(2024, 5, 11)));
        assert_eq!(parse_posted_date("an hour ago", today), Some(today));
    }

    #[test]
    fn test_unparseable_is_none() {
        let today = date(2024, 6, 10);
        for text in ["", "   ", "soon", "2024-13-45", "Q3 2024", "many days ago", "3 fortnights ago"] {
            assert_eq!(parse_posted_date(text, today), None, "'{}' should not parse", text);
        }
    }
}
