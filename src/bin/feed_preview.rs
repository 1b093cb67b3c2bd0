//! Prints the entries the sync job would consider, without touching the store.

use notion_news_sync::store::types::iso_timestamp;
use notion_news_sync::{FeedSettings, FeedSource, RssFeedSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let settings = FeedSettings::from_env()?;
    let feed = RssFeedSource::from_url(&settings.rss_url);
    let entries = feed.fetch_entries().await?;

    println!("{} entries in {}", entries.len(), settings.rss_url);
    for (i, e) in entries.iter().take(settings.capacity).enumerate() {
        let date = e
            .published
            .as_ref()
            .map(iso_timestamp)
            .unwrap_or_else(|| "(no date)".to_string());
        println!("[{}/{}] {}  {}\n      {}", i + 1, settings.capacity, date, e.title, e.link);
    }
    Ok(())
}
