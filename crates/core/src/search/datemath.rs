use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;

/// `now`, `now-7d`, `2024-01-15`, `2024-01-15+2w`. Units: d, w (7d),
/// M (30d), y (365d). Word boundaries keep already-expanded timestamps and
/// longer digit runs out of reach.
static DATE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(now|\d{4}-\d{2}-\d{2})(?:([+-])(\d+)([dwMy]))?\b").unwrap()
});

/// Expand date-math tokens in a query into RFC 3339 UTC timestamps.
pub fn preprocess_dates(query: &str) -> String {
    preprocess_dates_at(query, Utc::now())
}

/// As [`preprocess_dates`], with an explicit reference time.
pub fn preprocess_dates_at(query: &str, now: DateTime<Utc>) -> String {
    DATE_TOKEN_RE
        .replace_all(query, |caps: &regex::Captures<'_>| {
            match expand(caps, now) {
                Some(ts) => ts.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                // Invalid calendar date: leave the token as written.
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn expand(caps: &regex::Captures<'_>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let base = if &caps[1] == "now" {
        now
    } else {
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
        date.and_hms_opt(0, 0, 0)?.and_utc()
    };
    let Some(sign) = caps.get(2) else {
        return Some(base);
    };
    let amount: i64 = caps[3].parse().ok()?;
    let days = match &caps[4] {
        "d" => amount,
        "w" => amount * 7,
        "M" => amount * 30,
        "y" => amount * 365,
        _ => unreachable!("unit constrained by the regex"),
    };
    let offset = Duration::days(days);
    Some(if sign.as_str() == "-" { base - offset } else { base + offset })
}
