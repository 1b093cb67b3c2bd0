// src/sync/trim.rs
use metrics::counter;

use crate::store::types::MAX_PAGE_SIZE;
use crate::store::{RecordQuery, RecordStore, StoreResult};

use super::preview;

/// Records evaluated per run. Only this oldest-first page is considered, so
/// a store holding more rows than this cannot be trimmed below it in one run.
pub const TRIM_PAGE_SIZE: usize = MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimOutcome {
    pub considered: usize,
    pub to_archive: usize,
    pub archived: usize,
    pub failed: usize,
}

/// Archive the oldest records so at most `capacity` remain.
///
/// Errors only when the oldest-first query fails, in which case nothing was
/// archived. Individual archive failures are logged and skipped.
pub async fn trim(store: &dyn RecordStore, capacity: usize) -> StoreResult<TrimOutcome> {
    let query = RecordQuery::page(TRIM_PAGE_SIZE).oldest_first();
    let page = match store.query(&query).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(target: "sync", error = %e, "trim query failed; skipping trim");
            return Err(e);
        }
    };

    let records = page.records;
    let to_archive = records.len().saturating_sub(capacity);
    let mut out = TrimOutcome {
        considered: records.len(),
        to_archive,
        ..Default::default()
    };

    if to_archive == 0 {
        tracing::info!(
            target: "sync",
            count = records.len(),
            max = capacity,
            "no archiving needed"
        );
        return Ok(out);
    }

    tracing::info!(
        target: "sync",
        count = records.len(),
        to_archive,
        "archiving oldest records"
    );

    for rec in records.iter().take(to_archive) {
        let title = rec.title.as_deref().unwrap_or("Unknown");
        match store.set_archived(&rec.id, true).await {
            Ok(()) => {
                out.archived += 1;
                counter!("sync_records_archived_total").increment(1);
                tracing::info!(
                    target: "sync",
                    id = %rec.id,
                    "archived ({}/{to_archive}): {}",
                    out.archived,
                    preview(title, 60)
                );
            }
            Err(e) => {
                out.failed += 1;
                counter!("sync_archive_failures_total").increment(1);
                tracing::warn!(target: "sync", id = %rec.id, error = %e, "failed to archive record");
            }
        }
    }

    tracing::info!(target: "sync", archived = out.archived, failed = out.failed, "trim finished");
    Ok(out)
}
