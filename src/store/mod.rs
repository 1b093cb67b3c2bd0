// src/store/mod.rs
pub mod error;
pub mod memory;
pub mod notion;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use types::{CollectionInfo, NewRecord, Record, RecordPage, RecordQuery};

/// The collection the job mirrors into.
///
/// Every call is a single request/response; implementations do not retry.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Identity of the target collection.
    async fn describe(&self) -> StoreResult<CollectionInfo>;

    /// One page of non-archived records.
    async fn query(&self, query: &RecordQuery) -> StoreResult<RecordPage>;

    /// Append a record, returning its store-assigned id.
    async fn create(&self, record: &NewRecord) -> StoreResult<String>;

    async fn set_archived(&self, id: &str, archived: bool) -> StoreResult<()>;
}
