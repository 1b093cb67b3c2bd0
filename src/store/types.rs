// src/store/types.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::feed::types::FeedEntry;

/// Largest page the store hands out in one query.
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub id: String,
    pub title: Option<String>,
}

/// A persisted row. Every field except `id` may be missing on rows
/// created by hand in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub archived: bool,
}

/// Payload of a create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub title: String,
    pub url: String,
    pub date: DateTime<Utc>,
    pub source: String,
}

impl NewRecord {
    /// `None` when the entry carries no usable publication date.
    pub fn from_entry(entry: &FeedEntry, source: &str) -> Option<Self> {
        Some(Self {
            title: entry.title.clone(),
            url: entry.link.clone(),
            date: entry.published?,
            source: source.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub page_size: usize,
    pub start_cursor: Option<String>,
    /// Sort by the date column, oldest first. Unsorted otherwise.
    pub oldest_first: bool,
}

impl RecordQuery {
    pub fn page(page_size: usize) -> Self {
        Self {
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            start_cursor: None,
            oldest_first: false,
        }
    }

    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.start_cursor = cursor;
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.oldest_first = true;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Render a timestamp the way records store it: UTC, seconds precision,
/// no offset (`2024-05-02T04:00:00`).
pub fn iso_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Parse a date value read back from the store. Accepts full RFC 3339,
/// the offset-less form written by [`iso_timestamp`] and date-only values.
pub fn parse_store_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}
