//! notion-news-sync: binary entrypoint
//! Loads configuration, runs one sync of the RSS feed into the Notion
//! database, and maps the outcome to the process exit code.

use std::process::ExitCode;

use notion_news_sync::metrics::Metrics;
use notion_news_sync::{http_client, init_tracing, run_with_config, SyncConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the variables come from the scheduler.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match SyncConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("configuration error: {e:#}");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(config = ?cfg, "configuration loaded");

    let metrics = match cfg.metrics_textfile {
        Some(_) => match Metrics::init() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!("metrics disabled: {e:#}");
                None
            }
        },
        None => None,
    };

    let client = match http_client() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("http client setup failed: {e}");
            return ExitCode::from(2);
        }
    };

    let result = run_with_config(&cfg, client).await;

    if let (Some(m), Some(path)) = (&metrics, &cfg.metrics_textfile) {
        if let Err(e) = m.write_textfile(path) {
            tracing::warn!("metrics textfile: {e:#}");
        }
    }

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("sync stopped: {e}");
            ExitCode::FAILURE
        }
    }
}
