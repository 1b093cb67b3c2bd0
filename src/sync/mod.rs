// src/sync/mod.rs
//! The sync job: connectivity check, fetch, reconcile, trim, strictly in
//! that order. One call of [`run_once`] is one run.

pub mod connectivity;
pub mod reconcile;
pub mod trim;

pub use connectivity::check_connectivity;
pub use reconcile::{fetch_existing_titles, reconcile, ReconcileOutcome};
pub use trim::{trim, TrimOutcome, TRIM_PAGE_SIZE};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

use crate::feed::types::FeedSource;
use crate::store::{RecordStore, StoreError};

/// One-time metrics registration (so series show up in the textfile dump).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sync_runs_total", "Sync runs started.");
        describe_counter!("sync_feed_entries_total", "Entries parsed from the feed.");
        describe_counter!("sync_records_created_total", "Records added to the store.");
        describe_counter!(
            "sync_create_failures_total",
            "Feed entries that could not be added."
        );
        describe_counter!(
            "sync_records_archived_total",
            "Records archived by capacity trimming."
        );
        describe_counter!(
            "sync_archive_failures_total",
            "Archive calls that failed during trimming."
        );
        describe_counter!(
            "sync_title_fetch_errors_total",
            "Title fetches cut short by a query error."
        );
        describe_gauge!("sync_existing_titles", "Titles found in the store this run.");
        describe_gauge!("sync_last_run_ts", "Unix ts when the sync job last finished.");
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Per-run policy knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// K: entries considered from the feed and records kept in the store.
    pub capacity: usize,
    /// Tag written into every created record.
    pub source: String,
}

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("record store unreachable: {0}")]
    Connectivity(#[source] StoreError),

    #[error("feed fetch failed: {0:#}")]
    Feed(anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub collection_id: String,
    pub feed_entries: usize,
    pub existing_titles: usize,
    pub reconcile: ReconcileOutcome,
    /// `None` when trimming did not run (empty feed) or its query failed.
    pub trim: Option<TrimOutcome>,
}

/// Run the whole job once.
///
/// Only an unreachable store or an unreadable feed is an error; every other
/// failure is absorbed by the phase it happens in and shows up in the report.
pub async fn run_once(
    feed: &dyn FeedSource,
    store: &dyn RecordStore,
    opts: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    ensure_metrics_described();
    counter!("sync_runs_total").increment(1);
    tracing::info!(
        target: "sync",
        capacity = opts.capacity,
        source = %opts.source,
        "starting sync"
    );

    let info = check_connectivity(store)
        .await
        .map_err(SyncError::Connectivity)?;
    let mut report = SyncReport {
        collection_id: info.id,
        ..Default::default()
    };

    tracing::info!(target: "sync", feed = feed.name(), "fetching feed");
    let entries = feed.fetch_entries().await.map_err(SyncError::Feed)?;
    report.feed_entries = entries.len();
    if entries.is_empty() {
        tracing::warn!(target: "sync", feed = feed.name(), "no entries found in feed");
        finish(&report);
        return Ok(report);
    }
    tracing::info!(target: "sync", count = entries.len(), "feed entries found");

    let existing = fetch_existing_titles(store).await;
    report.existing_titles = existing.len();

    report.reconcile = reconcile(store, &entries, &existing, opts).await;

    report.trim = trim(store, opts.capacity).await.ok();

    finish(&report);
    Ok(report)
}

fn finish(report: &SyncReport) {
    let now = chrono::Utc::now().timestamp().max(0);
    gauge!("sync_last_run_ts").set(now as f64);
    tracing::info!(
        target: "sync",
        collection = %report.collection_id,
        feed_entries = report.feed_entries,
        existing = report.existing_titles,
        added = report.reconcile.added,
        skipped = report.reconcile.skipped,
        add_failures = report.reconcile.failed,
        archived = report.trim.map(|t| t.archived).unwrap_or(0),
        trimmed = report.trim.is_some(),
        "sync completed"
    );
}

/// First `max` chars of `s`, with "..." appended when cut.
pub(crate) fn preview(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push_str("...");
    }
    out
}
