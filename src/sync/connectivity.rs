// src/sync/connectivity.rs
use crate::store::{CollectionInfo, RecordQuery, RecordStore, StoreResult};

/// Precondition gate: the store must answer both an identity lookup and a
/// one-record query before any other phase runs. Not retried.
pub async fn check_connectivity(store: &dyn RecordStore) -> StoreResult<CollectionInfo> {
    let info = match store.describe().await {
        Ok(info) => info,
        Err(e) => {
            tracing::error!(target: "sync", error = %e, "cannot reach record store");
            return Err(e);
        }
    };

    match store.query(&RecordQuery::page(1)).await {
        Ok(page) => {
            tracing::info!(
                target: "sync",
                collection = %info.id,
                title = info.title.as_deref().unwrap_or_default(),
                "connected to record store; holds {}{} records",
                page.records.len(),
                if page.has_more { "+" } else { "" }
            );
            Ok(info)
        }
        Err(e) => {
            tracing::error!(target: "sync", collection = %info.id, error = %e, "record store query failed");
            Err(e)
        }
    }
}
