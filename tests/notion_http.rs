// tests/notion_http.rs
// NotionStore and the HTTP feed source against a local mock server.
use mockito::{Matcher, Server};
use serde_json::{json, Value};

use chrono::{TimeZone, Utc};
use notion_news_sync::store::{NewRecord, RecordQuery};
use notion_news_sync::{
    http_client, run_once, FeedSource, NotionStore, RecordStore, RssFeedSource, StoreError,
    SyncError, SyncOptions,
};

const TOKEN: &str = "secret-token";
const DB: &str = "db-1";

fn store_for(server: &Server) -> NotionStore {
    NotionStore::new(TOKEN, DB)
        .with_api_base(server.url())
        .with_client(http_client().unwrap())
}

fn page(id: &str, title: &str) -> Value {
    json!({
        "object": "page",
        "id": id,
        "archived": false,
        "properties": {
            "Title": { "title": [{ "type": "text", "text": { "content": title }, "plain_text": title }] },
            "Date": { "date": { "start": "2024-04-01T00:00:00.000+00:00" } }
        }
    })
}

fn list(results: Vec<Value>, next_cursor: Option<&str>) -> String {
    json!({
        "object": "list",
        "results": results,
        "has_more": next_cursor.is_some(),
        "next_cursor": next_cursor,
    })
    .to_string()
}

#[tokio::test]
async fn describe_sends_bearer_and_version_headers() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("GET", "/databases/db-1")
        .match_header("authorization", "Bearer secret-token")
        .match_header("notion-version", "2022-06-28")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "object": "database",
                "id": DB,
                "title": [{ "type": "text", "text": { "content": "Cosmology news" } }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let info = store_for(&server).describe().await.unwrap();
    m.assert_async().await;
    assert_eq!(info.id, DB);
    assert_eq!(info.title.as_deref(), Some("Cosmology news"));
}

#[tokio::test]
async fn query_passes_cursor_and_sort_through() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("POST", "/databases/db-1/query")
        .match_header("authorization", "Bearer secret-token")
        .match_body(Matcher::Json(json!({
            "page_size": 100,
            "start_cursor": "cur-2",
            "sorts": [{ "property": "Date", "direction": "ascending" }]
        })))
        .with_status(200)
        .with_body(list(vec![page("pg-1", "Oldest")], Some("cur-3")))
        .create_async()
        .await;

    let q = RecordQuery::page(100)
        .after(Some("cur-2".into()))
        .oldest_first();
    let res = store_for(&server).query(&q).await.unwrap();
    m.assert_async().await;
    assert_eq!(res.records.len(), 1);
    assert_eq!(res.records[0].title.as_deref(), Some("Oldest"));
    assert!(res.has_more);
    assert_eq!(res.next_cursor.as_deref(), Some("cur-3"));
}

#[tokio::test]
async fn create_posts_a_page_under_the_database() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("POST", "/pages")
        .match_header("notion-version", "2022-06-28")
        .match_body(Matcher::Json(json!({
            "parent": { "database_id": DB },
            "properties": {
                "Title": { "title": [{ "text": { "content": "Hubble tension" } }] },
                "URL": { "url": "https://arxiv.org/abs/2405.01001" },
                "Date": { "date": { "start": "2024-05-03T04:00:00" } },
                "Source": { "select": { "name": "arXiv astro-ph.CO" } }
            }
        })))
        .with_status(200)
        .with_body(json!({ "object": "page", "id": "pg-new" }).to_string())
        .create_async()
        .await;

    let rec = NewRecord {
        title: "Hubble tension".into(),
        url: "https://arxiv.org/abs/2405.01001".into(),
        date: Utc.with_ymd_and_hms(2024, 5, 3, 4, 0, 0).unwrap(),
        source: "arXiv astro-ph.CO".into(),
    };
    let id = store_for(&server).create(&rec).await.unwrap();
    m.assert_async().await;
    assert_eq!(id, "pg-new");
}

#[tokio::test]
async fn archive_patches_the_page() {
    let mut server = Server::new_async().await;
    let m = server
        .mock("PATCH", "/pages/pg-7")
        .match_header("authorization", "Bearer secret-token")
        .match_body(Matcher::Json(json!({ "archived": true })))
        .with_status(200)
        .with_body(json!({ "object": "page", "id": "pg-7", "archived": true }).to_string())
        .create_async()
        .await;

    store_for(&server).set_archived("pg-7", true).await.unwrap();
    m.assert_async().await;
}

#[tokio::test]
async fn notion_error_body_becomes_api_error() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/databases/db-1")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"object":"error","status":404,"code":"object_not_found","message":"Could not find database with ID: db-1."}"#,
        )
        .create_async()
        .await;

    match store_for(&server).describe().await {
        Err(StoreError::Api {
            status,
            code,
            message,
        }) => {
            assert_eq!(status, 404);
            assert_eq!(code, "object_not_found");
            assert!(message.starts_with("Could not find database"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_database_fails_the_run_before_any_query() {
    let mut server = Server::new_async().await;
    let _describe = server
        .mock("GET", "/databases/db-1")
        .with_status(404)
        .with_body(r#"{"object":"error","status":404,"code":"object_not_found","message":"nope"}"#)
        .create_async()
        .await;
    let no_posts = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let feed = RssFeedSource::from_fixture(include_str!("fixtures/arxiv_rss2.xml"));
    let opts = SyncOptions {
        capacity: 5,
        source: "arXiv astro-ph.CO".into(),
    };

    let err = run_once(&feed, &store_for(&server), &opts).await.unwrap_err();
    assert!(matches!(err, SyncError::Connectivity(StoreError::Api { status: 404, .. })));
    no_posts.assert_async().await;
}

#[tokio::test]
async fn feed_non_2xx_is_an_error() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/rss/astro-ph.CO")
        .with_status(503)
        .with_body("try again later")
        .create_async()
        .await;

    let feed = RssFeedSource::from_url(format!("{}/rss/astro-ph.CO", server.url()));
    assert!(feed.fetch_entries().await.is_err());
}

#[tokio::test]
async fn full_run_against_mocked_notion() {
    let mut server = Server::new_async().await;
    let feed_mock = server
        .mock("GET", "/rss/astro-ph.CO")
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(include_str!("fixtures/arxiv_rss2.xml"))
        .create_async()
        .await;
    let _describe = server
        .mock("GET", "/databases/db-1")
        .with_status(200)
        .with_body(json!({ "object": "database", "id": DB, "title": [] }).to_string())
        .create_async()
        .await;
    let connectivity = server
        .mock("POST", "/databases/db-1/query")
        .match_body(Matcher::Json(json!({ "page_size": 1 })))
        .with_status(200)
        .with_body(list(vec![page("old-1", "stale 1")], Some("c")))
        .expect(1)
        .create_async()
        .await;
    // title walk: two pages joined by a cursor
    let titles_1 = server
        .mock("POST", "/databases/db-1/query")
        .match_body(Matcher::Json(json!({ "page_size": 100 })))
        .with_status(200)
        .with_body(list(
            vec![
                page("ex-1", "Hubble tension in the light of new Cepheid calibrations"),
                page("ex-2", "Neutrino mass bounds after DESI Y1"),
            ],
            Some("cur-2"),
        ))
        .expect(1)
        .create_async()
        .await;
    let titles_2 = server
        .mock("POST", "/databases/db-1/query")
        .match_body(Matcher::Json(json!({ "page_size": 100, "start_cursor": "cur-2" })))
        .with_status(200)
        .with_body(list(
            vec![page("ex-3", "Weak lensing peaks beyond the halo model")],
            None,
        ))
        .expect(1)
        .create_async()
        .await;
    let creates = server
        .mock("POST", "/pages")
        .match_header("authorization", "Bearer secret-token")
        .match_body(Matcher::PartialJson(json!({
            "parent": { "database_id": DB },
            "properties": { "Source": { "select": { "name": "arXiv astro-ph.CO" } } }
        })))
        .with_status(200)
        .with_body(json!({ "object": "page", "id": "new" }).to_string())
        .expect(2)
        .create_async()
        .await;
    let trim_query = server
        .mock("POST", "/databases/db-1/query")
        .match_body(Matcher::Json(json!({
            "page_size": 100,
            "sorts": [{ "property": "Date", "direction": "ascending" }]
        })))
        .with_status(200)
        .with_body(list(
            (1..=7).map(|i| page(&format!("old-{i}"), &format!("stale {i}"))).collect(),
            None,
        ))
        .expect(1)
        .create_async()
        .await;
    let mut archives = Vec::new();
    for id in ["old-1", "old-2"] {
        archives.push(
            server
                .mock("PATCH", format!("/pages/{id}").as_str())
                .match_body(Matcher::Json(json!({ "archived": true })))
                .with_status(200)
                .with_body(json!({ "object": "page", "id": id, "archived": true }).to_string())
                .expect(1)
                .create_async()
                .await,
        );
    }
    let untouched = server
        .mock("PATCH", "/pages/old-3")
        .expect(0)
        .create_async()
        .await;

    let feed = RssFeedSource::with_client(
        format!("{}/rss/astro-ph.CO", server.url()),
        http_client().unwrap(),
    );
    let opts = SyncOptions {
        capacity: 5,
        source: "arXiv astro-ph.CO".into(),
    };
    let report = run_once(&feed, &store_for(&server), &opts).await.unwrap();

    assert_eq!(report.feed_entries, 6);
    assert_eq!(report.existing_titles, 3);
    assert_eq!(report.reconcile.added, 2);
    assert_eq!(report.reconcile.skipped, 3);
    let trim = report.trim.unwrap();
    assert_eq!(trim.considered, 7);
    assert_eq!(trim.archived, 2);

    feed_mock.assert_async().await;
    connectivity.assert_async().await;
    titles_1.assert_async().await;
    titles_2.assert_async().await;
    creates.assert_async().await;
    trim_query.assert_async().await;
    for m in &archives {
        m.assert_async().await;
    }
    untouched.assert_async().await;
}
