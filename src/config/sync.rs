// src/config/sync.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::notion::{DEFAULT_API_BASE, DEFAULT_NOTION_VERSION};
use crate::sync::SyncOptions;

pub const ENV_CONFIG_PATH: &str = "SYNC_CONFIG_PATH";

pub const DEFAULT_RSS_URL: &str = "http://export.arxiv.org/rss/astro-ph.CO";
pub const DEFAULT_CAPACITY: usize = 5;
pub const DEFAULT_SOURCE: &str = "arXiv astro-ph.CO";

/// Everything one run needs, resolved once at process start.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub notion_token: String,
    pub database_id: String,
    pub rss_url: String,
    /// K: how many records the database keeps.
    pub capacity: usize,
    pub source: String,
    pub notion_api_base: String,
    pub notion_version: String,
    pub metrics_textfile: Option<PathBuf>,
}

// Token stays out of logs; only its length is shown.
impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("notion_token_len", &self.notion_token.len())
            .field("database_id", &self.database_id)
            .field("rss_url", &self.rss_url)
            .field("capacity", &self.capacity)
            .field("source", &self.source)
            .field("notion_api_base", &self.notion_api_base)
            .field("notion_version", &self.notion_version)
            .field("metrics_textfile", &self.metrics_textfile)
            .finish()
    }
}

/// Optional TOML file; every key may be overridden by the environment.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    notion_token: Option<String>,
    database_id: Option<String>,
    rss_url: Option<String>,
    capacity: Option<usize>,
    source: Option<String>,
    notion_api_base: Option<String>,
    notion_version: Option<String>,
    metrics_textfile: Option<PathBuf>,
}

/// Feed-side settings; all that the preview binary needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    pub rss_url: String,
    pub capacity: usize,
}

impl FeedSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| non_empty(lookup(k));
        Ok(Self {
            rss_url: get("RSS_URL").unwrap_or_else(|| DEFAULT_RSS_URL.to_string()),
            capacity: parse_capacity(get("K"))?.unwrap_or(DEFAULT_CAPACITY),
        })
    }
}

impl SyncConfig {
    /// Load from the process environment (after `.env`), honoring
    /// `$SYNC_CONFIG_PATH` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as [`SyncConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| non_empty(lookup(k));

        let file = match get(ENV_CONFIG_PATH) {
            Some(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
                }
                load_file(&pb)?
            }
            None => FileConfig::default(),
        };

        let notion_token = get("NOTION_TOKEN")
            .or(non_empty(file.notion_token))
            .ok_or_else(|| anyhow!("missing NOTION_TOKEN"))?;
        let database_id = get("DATABASE_ID")
            .or(non_empty(file.database_id))
            .ok_or_else(|| anyhow!("missing DATABASE_ID"))?;

        let capacity = match parse_capacity(get("K"))? {
            Some(k) => k,
            None => file.capacity.unwrap_or(DEFAULT_CAPACITY),
        };

        Ok(Self {
            notion_token,
            database_id,
            rss_url: get("RSS_URL")
                .or(non_empty(file.rss_url))
                .unwrap_or_else(|| DEFAULT_RSS_URL.to_string()),
            capacity,
            source: get("SOURCE")
                .or(non_empty(file.source))
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            notion_api_base: get("NOTION_API_BASE")
                .or(non_empty(file.notion_api_base))
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            notion_version: get("NOTION_VERSION")
                .or(non_empty(file.notion_version))
                .unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            metrics_textfile: get("METRICS_TEXTFILE")
                .map(PathBuf::from)
                .or(file.metrics_textfile),
        })
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            capacity: self.capacity,
            source: self.source.clone(),
        }
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sync config from {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing sync config {}", path.display()))
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_capacity(raw: Option<String>) -> Result<Option<usize>> {
    raw.map(|s| {
        s.parse::<usize>()
            .with_context(|| format!("K must be a non-negative integer, got {s:?}"))
    })
    .transpose()
}
