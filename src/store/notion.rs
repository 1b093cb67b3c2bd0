//! Notion database as a [`RecordStore`].
//!
//! Rows are Notion pages whose parent is the configured database. Column
//! names are fixed: `Title` (title), `URL` (url), `Date` (date) and
//! `Source` (select).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::types::{iso_timestamp, parse_store_date};
use super::{
    CollectionInfo, NewRecord, Record, RecordPage, RecordQuery, RecordStore,
    StoreError, StoreResult,
};

pub const DEFAULT_API_BASE: &str = "https://api.notion.com/v1";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";

const PROP_TITLE: &str = "Title";
const PROP_URL: &str = "URL";
const PROP_DATE: &str = "Date";
const PROP_SOURCE: &str = "Source";

#[derive(Clone)]
pub struct NotionStore {
    client: Client,
    api_base: String,
    token: String,
    database_id: String,
    notion_version: String,
}

impl NotionStore {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            database_id: database_id.into(),
            notion_version: DEFAULT_NOTION_VERSION.to_string(),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_notion_version(mut self, version: impl Into<String>) -> Self {
        self.notion_version = version.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
            .header("Notion-Version", &self.notion_version)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> StoreResult<T> {
        tracing::debug!(target: "store", op = what, "notion request");
        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| StoreError::transport(what, e))?;
        decode_response(resp, what).await
    }
}

async fn decode_response<T: DeserializeOwned>(resp: Response, what: &str) -> StoreResult<T> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| StoreError::transport(format!("{what}: read body"), e))?;

    if !status.is_success() {
        let err = api_error(status.as_u16(), &body);
        if let StoreError::Api { status, code, .. } = &err {
            tracing::warn!(target: "store", op = what, status = *status, code = %code, "notion api error");
        }
        return Err(err);
    }
    serde_json::from_str(&body).map_err(|e| StoreError::decode(what, e))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

fn api_error(status: u16, body: &str) -> StoreError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(b) => StoreError::Api {
            status,
            code: b.code,
            message: b.message,
        },
        Err(_) => StoreError::Api {
            status,
            code: "unknown".to_string(),
            message: body.chars().take(200).collect(),
        },
    }
}

#[derive(Debug, Deserialize)]
struct DatabaseObject {
    id: String,
    #[serde(default)]
    title: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<PageObject>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageObject {
    id: String,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl PageObject {
    fn into_record(self) -> Record {
        let props = &self.properties;
        Record {
            title: props
                .get(PROP_TITLE)
                .and_then(|p| p.get("title"))
                .and_then(first_rich_text),
            url: props
                .get(PROP_URL)
                .and_then(|p| p.get("url"))
                .and_then(Value::as_str)
                .map(str::to_string),
            date: props
                .get(PROP_DATE)
                .and_then(|p| p.pointer("/date/start"))
                .and_then(Value::as_str)
                .and_then(parse_store_date),
            source: props
                .get(PROP_SOURCE)
                .and_then(|p| p.pointer("/select/name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            archived: self.archived,
            id: self.id,
        }
    }
}

/// Text of the first fragment of a rich-text array, if any.
fn first_rich_text(v: &Value) -> Option<String> {
    let first = v.as_array()?.first()?;
    first
        .pointer("/text/content")
        .or_else(|| first.get("plain_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) fn query_body(query: &RecordQuery) -> Value {
    let mut body = json!({ "page_size": query.page_size });
    if let Some(cursor) = &query.start_cursor {
        body["start_cursor"] = json!(cursor);
    }
    if query.oldest_first {
        body["sorts"] = json!([{ "property": PROP_DATE, "direction": "ascending" }]);
    }
    body
}

pub(crate) fn create_body(database_id: &str, record: &NewRecord) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": {
            PROP_TITLE: { "title": [{ "text": { "content": record.title } }] },
            PROP_URL: { "url": record.url },
            PROP_DATE: { "date": { "start": iso_timestamp(&record.date) } },
            PROP_SOURCE: { "select": { "name": record.source } },
        },
    })
}

#[async_trait]
impl RecordStore for NotionStore {
    async fn describe(&self) -> StoreResult<CollectionInfo> {
        let url = format!("{}/databases/{}", self.api_base, self.database_id);
        let db: DatabaseObject = self.send(self.client.get(url), "retrieve database").await?;
        Ok(CollectionInfo {
            title: first_rich_text(&Value::Array(db.title)),
            id: db.id,
        })
    }

    async fn query(&self, query: &RecordQuery) -> StoreResult<RecordPage> {
        let url = format!("{}/databases/{}/query", self.api_base, self.database_id);
        let resp: QueryResponse = self
            .send(self.client.post(url).json(&query_body(query)), "query database")
            .await?;
        Ok(RecordPage {
            records: resp.results.into_iter().map(PageObject::into_record).collect(),
            has_more: resp.has_more,
            next_cursor: resp.next_cursor,
        })
    }

    async fn create(&self, record: &NewRecord) -> StoreResult<String> {
        let url = format!("{}/pages", self.api_base);
        let body = create_body(&self.database_id, record);
        let page: PageObject = self.send(self.client.post(url).json(&body), "create page").await?;
        Ok(page.id)
    }

    async fn set_archived(&self, id: &str, archived: bool) -> StoreResult<()> {
        let url = format!("{}/pages/{}", self.api_base, id);
        let _page: PageObject = self
            .send(
                self.client.patch(url).json(&json!({ "archived": archived })),
                "update page",
            )
            .await?;
        Ok(())
    }
}
