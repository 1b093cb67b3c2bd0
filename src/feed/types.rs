// src/feed/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String, // whitespace-collapsed, never empty
    pub link: String,
    pub published: Option<DateTime<Utc>>, // None when the feed omits or garbles the date
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Entries in the order the feed lists them (usually newest first).
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>>;
    fn name(&self) -> &str;
}
