// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod feed;
pub mod metrics;
pub mod store;
pub mod sync;

// ---- Re-exports for stable public API ----
pub use crate::config::{FeedSettings, SyncConfig};
pub use crate::feed::rss::RssFeedSource;
pub use crate::feed::types::{FeedEntry, FeedSource};
pub use crate::store::notion::NotionStore;
pub use crate::store::{RecordStore, StoreError};
pub use crate::sync::{run_once, SyncError, SyncOptions, SyncReport};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Events use the `sync`, `feed` and
/// `store` targets; anything else logs at `warn` and above.
pub const DEFAULT_LOG_FILTER: &str = "notion_news_sync=info,sync=info,feed=info,store=info,warn";

const USER_AGENT: &str = concat!("notion-news-sync/", env!("CARGO_PKG_VERSION"));

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG` (default [`DEFAULT_LOG_FILTER`]);
/// `LOG_FORMAT=json` switches to one JSON object per line.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// HTTP client shared by the feed download and the Notion store.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

/// Build the production collaborators from `cfg` and run the job once.
pub async fn run_with_config(
    cfg: &SyncConfig,
    client: reqwest::Client,
) -> Result<SyncReport, SyncError> {
    let store = NotionStore::new(&cfg.notion_token, &cfg.database_id)
        .with_api_base(&cfg.notion_api_base)
        .with_notion_version(&cfg.notion_version)
        .with_client(client.clone());
    let feed = RssFeedSource::with_client(&cfg.rss_url, client);
    run_once(&feed, &store, &cfg.sync_options()).await
}
