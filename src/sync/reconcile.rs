// src/sync/reconcile.rs
use metrics::{counter, gauge};
use std::collections::HashSet;

use crate::feed::types::FeedEntry;
use crate::store::types::MAX_PAGE_SIZE;
use crate::store::{NewRecord, RecordQuery, RecordStore};

use super::{preview, SyncOptions};

/// Titles of every non-archived record, paging through the whole store.
///
/// A failing page stops the walk and whatever was collected so far is
/// returned; the caller proceeds with that partial set.
pub async fn fetch_existing_titles(store: &dyn RecordStore) -> HashSet<String> {
    let mut titles = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let query = RecordQuery::page(MAX_PAGE_SIZE).after(cursor.take());
        let page = match store.query(&query).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    target: "sync",
                    error = %e,
                    pages,
                    collected = titles.len(),
                    "title fetch aborted; continuing with partial set"
                );
                counter!("sync_title_fetch_errors_total").increment(1);
                break;
            }
        };
        pages += 1;

        titles.extend(page.records.into_iter().filter_map(|r| r.title));

        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            (true, None) => {
                tracing::warn!(target: "sync", pages, "store reported more pages without a cursor");
                break;
            }
            (false, _) => break,
        }
    }

    gauge!("sync_existing_titles").set(titles.len() as f64);
    tracing::info!(target: "sync", count = titles.len(), pages, "existing titles fetched");
    titles
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub considered: usize,
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Create a record for each of the first `capacity` entries whose title is
/// not in `existing`. Failures are per entry: logged, counted, and the next
/// entry is tried. `existing` is the snapshot only; the store is not
/// re-checked before each insert.
pub async fn reconcile(
    store: &dyn RecordStore,
    entries: &[FeedEntry],
    existing: &HashSet<String>,
    opts: &SyncOptions,
) -> ReconcileOutcome {
    let top = &entries[..entries.len().min(opts.capacity)];
    let total = top.len();
    let mut out = ReconcileOutcome {
        considered: total,
        ..Default::default()
    };

    for (i, entry) in top.iter().enumerate() {
        let pos = i + 1;
        if existing.contains(&entry.title) {
            tracing::info!(target: "sync", "[{pos}/{total}] already exists: {}", preview(&entry.title, 60));
            out.skipped += 1;
            continue;
        }

        let Some(record) = NewRecord::from_entry(entry, &opts.source) else {
            tracing::warn!(
                target: "sync",
                link = %entry.link,
                "[{pos}/{total}] failed to add '{}': entry has no publication date",
                preview(&entry.title, 50)
            );
            counter!("sync_create_failures_total").increment(1);
            out.failed += 1;
            continue;
        };

        match store.create(&record).await {
            Ok(id) => {
                tracing::info!(target: "sync", id = %id, "[{pos}/{total}] added: {}", preview(&entry.title, 80));
                counter!("sync_records_created_total").increment(1);
                out.added += 1;
            }
            Err(e) => {
                tracing::warn!(
                    target: "sync",
                    error = %e,
                    "[{pos}/{total}] failed to add '{}'",
                    preview(&entry.title, 50)
                );
                counter!("sync_create_failures_total").increment(1);
                out.failed += 1;
            }
        }
    }

    if out.added > 0 {
        tracing::info!(target: "sync", added = out.added, "new entries added");
    } else {
        tracing::info!(target: "sync", considered = total, "no new entries to add");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{InMemoryStore, StoreCall};
    use crate::store::Record;
    use chrono::{TimeZone, Utc};

    fn entry(title: &str, day: u32) -> FeedEntry {
        FeedEntry {
            title: title.into(),
            link: format!("https://arxiv.org/abs/{title}"),
            published: Some(Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap()),
        }
    }

    fn opts(capacity: usize) -> SyncOptions {
        SyncOptions {
            capacity,
            source: "tag".into(),
        }
    }

    #[tokio::test]
    async fn titles_are_collected_across_pages_skipping_untitled() {
        let store = InMemoryStore::new();
        for i in 0..250u32 {
            store.seed(&format!("t{i}"), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        }
        store.seed_record(Record {
            id: "untitled".into(),
            title: None,
            url: None,
            date: None,
            source: None,
            archived: false,
        });

        let titles = fetch_existing_titles(&store).await;
        assert_eq!(titles.len(), 250);
        let queries = store
            .calls()
            .into_iter()
            .filter(|c| matches!(c, StoreCall::Query { .. }))
            .count();
        assert_eq!(queries, 3);
    }

    #[tokio::test]
    async fn page_error_keeps_partial_titles() {
        let store = InMemoryStore::new().failing_queries_after(1);
        for i in 0..150u32 {
            store.seed(&format!("t{i}"), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        }
        let titles = fetch_existing_titles(&store).await;
        assert_eq!(titles.len(), 100);
    }

    #[tokio::test]
    async fn only_first_k_entries_are_considered() {
        let store = InMemoryStore::new();
        let entries: Vec<_> = (1..=8).map(|d| entry(&format!("e{d}"), d)).collect();
        let out = reconcile(&store, &entries, &HashSet::new(), &opts(3)).await;
        assert_eq!(out.considered, 3);
        assert_eq!(out.added, 3);
        assert_eq!(store.created_titles(), vec!["e1", "e2", "e3"]);
    }

    #[tokio::test]
    async fn undated_entry_fails_alone() {
        let store = InMemoryStore::new();
        let mut undated = entry("undated", 1);
        undated.published = None;
        let entries = vec![undated, entry("dated", 2)];
        let out = reconcile(&store, &entries, &HashSet::new(), &opts(5)).await;
        assert_eq!(out.failed, 1);
        assert_eq!(out.added, 1);
        assert_eq!(store.created_titles(), vec!["dated"]);
    }
}
