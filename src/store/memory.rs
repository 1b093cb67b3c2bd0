//! In-process [`RecordStore`] that records every call and can be told to fail.
//! Used by the scenario tests; also handy for local dry runs.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    CollectionInfo, NewRecord, Record, RecordPage, RecordQuery, RecordStore,
    StoreError, StoreResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Describe,
    Query {
        page_size: usize,
        cursor: Option<String>,
        oldest_first: bool,
    },
    Create {
        title: String,
    },
    SetArchived {
        id: String,
        archived: bool,
    },
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        matches!(self, StoreCall::Create { .. } | StoreCall::SetArchived { .. })
    }
}

#[derive(Debug, Default)]
struct Failures {
    describe: bool,
    // queries allowed to succeed before every further query fails
    query_after: Option<usize>,
    sorted_query: bool,
    create_titles: HashSet<String>,
    archive_ids: HashSet<String>,
}

#[derive(Debug, Default)]
struct State {
    records: Vec<Record>,
    next_id: u64,
    calls: Vec<StoreCall>,
    queries_served: usize,
}

#[derive(Debug)]
pub struct InMemoryStore {
    id: String,
    state: Mutex<State>,
    failures: Failures,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            id: "in-memory".to_string(),
            state: Mutex::new(State::default()),
            failures: Failures::default(),
        }
    }

    /// Insert a record directly, bypassing the call log. Returns its id.
    pub fn seed(&self, title: &str, date: DateTime<Utc>) -> String {
        let mut st = self.lock();
        let id = next_id(&mut st);
        st.records.push(Record {
            id: id.clone(),
            title: Some(title.to_string()),
            url: Some(format!("https://example.test/{id}")),
            date: Some(date),
            source: Some("seed".to_string()),
            archived: false,
        });
        id
    }

    /// Insert a raw record as-is (e.g. one missing its title).
    pub fn seed_record(&self, record: Record) {
        self.lock().records.push(record);
    }

    pub fn failing_describe(mut self) -> Self {
        self.failures.describe = true;
        self
    }

    /// Let `n` queries succeed, then fail every later one.
    pub fn failing_queries_after(mut self, n: usize) -> Self {
        self.failures.query_after = Some(n);
        self
    }

    pub fn failing_sorted_queries(mut self) -> Self {
        self.failures.sorted_query = true;
        self
    }

    pub fn failing_create_for(mut self, title: &str) -> Self {
        self.failures.create_titles.insert(title.to_string());
        self
    }

    pub fn failing_archive_for(mut self, id: &str) -> Self {
        self.failures.archive_ids.insert(id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn created_titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Create { title } => Some(title),
                _ => None,
            })
            .collect()
    }

    pub fn archived_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::SetArchived { id, archived: true } => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Every record, archived ones included, in insertion order.
    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    pub fn active_records(&self) -> Vec<Record> {
        self.records().into_iter().filter(|r| !r.archived).collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }
}

fn next_id(st: &mut State) -> String {
    st.next_id += 1;
    format!("rec-{:04}", st.next_id)
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn describe(&self) -> StoreResult<CollectionInfo> {
        self.lock().calls.push(StoreCall::Describe);
        if self.failures.describe {
            return Err(StoreError::Rejected("describe failure injected".into()));
        }
        Ok(CollectionInfo {
            id: self.id.clone(),
            title: Some("In-memory collection".to_string()),
        })
    }

    async fn query(&self, query: &RecordQuery) -> StoreResult<RecordPage> {
        let mut st = self.lock();
        st.calls.push(StoreCall::Query {
            page_size: query.page_size,
            cursor: query.start_cursor.clone(),
            oldest_first: query.oldest_first,
        });

        if self.failures.sorted_query && query.oldest_first {
            return Err(StoreError::Rejected("sorted query failure injected".into()));
        }
        if let Some(limit) = self.failures.query_after {
            if st.queries_served >= limit {
                return Err(StoreError::Rejected("query failure injected".into()));
            }
        }
        st.queries_served += 1;

        let mut active: Vec<Record> = st.records.iter().filter(|r| !r.archived).cloned().collect();
        if query.oldest_first {
            // Undated rows go last; ties keep insertion order.
            active.sort_by(|a, b| match (a.date, b.date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        }

        let offset = match &query.start_cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| StoreError::Rejected(format!("invalid cursor {c:?}")))?,
            None => 0,
        };
        let end = (offset + query.page_size).min(active.len());
        let records = active.get(offset..end).map(<[Record]>::to_vec).unwrap_or_default();
        let has_more = end < active.len();

        Ok(RecordPage {
            records,
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    async fn create(&self, record: &NewRecord) -> StoreResult<String> {
        let mut st = self.lock();
        st.calls.push(StoreCall::Create {
            title: record.title.clone(),
        });
        if self.failures.create_titles.contains(&record.title) {
            return Err(StoreError::Rejected(format!(
                "create failure injected for {:?}",
                record.title
            )));
        }
        let id = next_id(&mut st);
        st.records.push(Record {
            id: id.clone(),
            title: Some(record.title.clone()),
            url: Some(record.url.clone()),
            date: Some(record.date),
            source: Some(record.source.clone()),
            archived: false,
        });
        Ok(id)
    }

    async fn set_archived(&self, id: &str, archived: bool) -> StoreResult<()> {
        let mut st = self.lock();
        st.calls.push(StoreCall::SetArchived {
            id: id.to_string(),
            archived,
        });
        if self.failures.archive_ids.contains(id) {
            return Err(StoreError::Rejected(format!("archive failure injected for {id}")));
        }
        match st.records.iter_mut().find(|r| r.id == id) {
            Some(r) => {
                r.archived = archived;
                Ok(())
            }
            None => Err(StoreError::Api {
                status: 404,
                code: "object_not_found".to_string(),
                message: format!("no record {id}"),
            }),
        }
    }
}
