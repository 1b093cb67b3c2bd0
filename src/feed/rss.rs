// src/feed/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::feed::types::{FeedEntry, FeedSource};
use crate::feed::{clean_title, parse_feed_date};

// One document shape covers RSS 2.0 (<rss><channel><item>), RSS 1.0/RDF
// (<rdf:RDF><item>) and Atom (<feed><entry>); the root tag is not checked.
// Elements match by local name, so `title` and `link` also collect
// namespaced siblings such as <atom:link> or <media:title>.
#[derive(Debug, Deserialize)]
struct Document {
    channel: Option<Channel>,
    #[serde(rename = "item", default)]
    items: Vec<Item>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(rename = "title", default)]
    titles: Vec<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<LinkNode>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "date", alias = "dc:date")]
    dc_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(rename = "title", default)]
    titles: Vec<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<LinkNode>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: Option<String>,
}

// <link>url</link> in RSS, <link href=".." rel=".."/> in Atom.
#[derive(Debug, Deserialize)]
struct LinkNode {
    #[serde(rename = "$text", default)]
    value: Option<String>,
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

fn first_text(nodes: &[TextNode]) -> Option<&str> {
    nodes
        .iter()
        .filter_map(|n| n.value.as_deref())
        .find(|v| !v.trim().is_empty())
}

impl Item {
    // The RSS link is element text; attribute-only links (<atom:link rel="self">)
    // describe the feed, not the item.
    fn link(&self) -> Option<&str> {
        self.links
            .iter()
            .filter_map(|l| l.value.as_deref())
            .find(|v| !v.trim().is_empty())
    }
}

impl AtomEntry {
    fn alternate_link(&self) -> Option<&str> {
        let mut hrefs = self.links.iter().filter_map(|l| Some((l.href.as_deref()?, l)));
        let first = hrefs.clone().next().map(|(href, _)| href);
        hrefs
            .find(|(_, l)| matches!(l.rel.as_deref(), None | Some("alternate")))
            .map(|(href, _)| href)
            .or(first)
    }
}

pub struct RssFeedSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFeedSource {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    /// Parse feed XML into entries, keeping document order.
    /// Entries without a title or link are dropped.
    pub fn parse_entries(s: &str) -> Result<Vec<FeedEntry>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let doc: Document = from_str(&xml_clean).context("parsing feed xml")?;

        let mut out = Vec::new();

        let rss_items = doc
            .channel
            .map(|c| c.items)
            .unwrap_or_default()
            .into_iter()
            .chain(doc.items);
        for it in rss_items {
            let date = it.pub_date.as_deref().or(it.dc_date.as_deref());
            push_entry(&mut out, first_text(&it.titles), it.link(), date);
        }

        for e in doc.entries {
            let date = e.published.as_deref().or(e.updated.as_deref());
            push_entry(
                &mut out,
                first_text(&e.titles),
                e.alternate_link(),
                date,
            );
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        counter!("sync_feed_entries_total").increment(out.len() as u64);
        Ok(out)
    }
}

fn push_entry(out: &mut Vec<FeedEntry>, title: Option<&str>, link: Option<&str>, date: Option<&str>) {
    let title = clean_title(title.unwrap_or_default());
    let link = link.unwrap_or_default().trim();
    if title.is_empty() || link.is_empty() {
        tracing::debug!(target: "feed", title = %title, "dropping entry without title or link");
        return;
    }
    out.push(FeedEntry {
        title,
        link: link.to_string(),
        published: date.and_then(parse_feed_date),
    });
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_entries(s),

            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("feed http get {url}"))?
                    .error_for_status()
                    .context("feed non-2xx")?
                    .text()
                    .await
                    .context("feed http .text()")?;
                Self::parse_entries(&body)
            }
        }
    }

    fn name(&self) -> &str {
        match &self.mode {
            Mode::Fixture(_) => "fixture",
            Mode::Http { url, .. } => url.as_str(),
        }
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
