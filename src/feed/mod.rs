// src/feed/mod.rs
pub mod rss;
pub mod types;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use time::macros::format_description;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

/// Collapse whitespace runs (feeds often wrap long titles) and trim.
pub fn clean_title(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static regex"));
    re_ws.replace_all(s, " ").trim().to_string()
}

/// Parse the date formats feeds use in practice into UTC.
///
/// Accepted, in order: RFC 2822 (`pubDate`), RFC 3339 (`dc:date`, Atom),
/// naive `YYYY-MM-DDTHH:MM:SS` taken as UTC, and date-only `YYYY-MM-DD`
/// taken as midnight UTC. Returns `None` for anything else.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        return to_chrono(dt);
    }
    // time rejects obsolete zone names ("GMT", "EST"); chrono accepts them.
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return to_chrono(dt);
    }
    if let Ok(dt) =
        PrimitiveDateTime::parse(s, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
    {
        return to_chrono(dt.assume_utc());
    }
    if let Ok(d) = Date::parse(s, format_description!("[year]-[month]-[day]")) {
        return to_chrono(d.midnight().assume_utc());
    }
    None
}

fn to_chrono(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    let utc = dt.to_offset(UtcOffset::UTC);
    DateTime::from_timestamp(utc.unix_timestamp(), 0)
}
