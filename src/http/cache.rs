//! File-backed response cache
//!
//! [`CachingFetcher`] wraps another [`Fetcher`]. Each successful response is
//! stored as one file holding an HTTP/1.1-style dump: status line, headers,
//! blank line, raw body. Freshness is judged against the instant the cache
//! was constructed, so a run sees one stable snapshot however long it takes.

use crate::http::{FetchError, FetchResponse, Fetcher};
use crate::CatalogueError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use url::Url;

/// TTL class of a cached URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    Search,
    Zip,
    FileList,
    Default,
}

impl CacheClass {
    pub fn of(url: &str) -> Self {
        let path = Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();

        if path == "/search" {
            CacheClass::Search
        } else if path.ends_with(".zip") {
            CacheClass::Zip
        } else if path.rsplit('/').next() == Some("filelist.json") {
            CacheClass::FileList
        } else {
            CacheClass::Default
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            CacheClass::Search => "-search",
            CacheClass::Zip => "-zip",
            CacheClass::FileList => "-filelist",
            CacheClass::Default => "",
        }
    }
}

/// Cache file name for a URL: hex SHA-256 plus the class suffix
pub fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("{}{}", hex::encode(digest), CacheClass::of(url).suffix())
}

/// Serializes a response as an HTTP/1.1 message
pub fn encode_entry(response: &FetchResponse) -> Vec<u8> {
    let reason = reqwest::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("");

    let mut out = format!("HTTP/1.1 {} {}\r\n", response.status, reason).into_bytes();
    for (name, value) in &response.headers {
        out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&response.body);
    out
}

/// Parses a dump written by [`encode_entry`]; `None` if it is malformed
pub fn decode_entry(data: &[u8]) -> Option<FetchResponse> {
    let split = data.windows(4).position(|w| w == b"\r\n\r\n")?;
    let head = std::str::from_utf8(&data[..split]).ok()?;
    let body = data[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next()?;
    let mut parts = status_line.splitn(3, ' ');
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    let status = parts.next()?.parse::<u16>().ok()?;

    let mut headers = BTreeMap::new();
    for line in lines {
        let (name, value) = line.split_once(':')?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    Some(FetchResponse {
        status,
        headers,
        body,
    })
}

/// Decorator that serves fresh responses from disk
pub struct CachingFetcher<F> {
    inner: F,
    directory: PathBuf,
    default_ttl: Duration,
    search_ttl: Duration,
    run_start: SystemTime,
}

impl<F: Fetcher> CachingFetcher<F> {
    /// Creates the cache directory if needed; failing to do so is fatal
    pub fn new(
        inner: F,
        directory: impl Into<PathBuf>,
        default_ttl: Duration,
        search_ttl: Duration,
    ) -> Result<Self, CatalogueError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|source| CatalogueError::CacheDirectory {
            path: directory.clone(),
            source,
        })?;

        Ok(Self {
            inner,
            directory,
            default_ttl,
            search_ttl,
            run_start: SystemTime::now(),
        })
    }

    /// Overrides the instant entries are aged against
    pub fn with_run_start(mut self, run_start: SystemTime) -> Self {
        self.run_start = run_start;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn ttl_for(&self, url: &str) -> Duration {
        match CacheClass::of(url) {
            CacheClass::Search => self.search_ttl,
            _ => self.default_ttl,
        }
    }

    fn is_fresh(&self, modified: SystemTime, ttl: Duration) -> bool {
        // Written after the run started: fresh
        match self.run_start.duration_since(modified) {
            Ok(age) => age < ttl,
            Err(_) => true,
        }
    }

    async fn read(&self, url: &str, path: &Path) -> Option<FetchResponse> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        let modified = metadata.modified().ok()?;
        if !self.is_fresh(modified, self.ttl_for(url)) {
            tracing::debug!(url = %url, "Cache entry expired");
            return None;
        }

        let data = tokio::fs::read(path).await.ok()?;
        let response = decode_entry(&data);
        if response.is_none() {
            tracing::warn!(path = %path.display(), "Ignoring malformed cache entry");
        }
        response
    }

    async fn write(&self, path: &Path, response: &FetchResponse) -> std::io::Result<()> {
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, encode_entry(response)).await?;
        tokio::fs::rename(&tmp, path).await
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for CachingFetcher<F> {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let path = self.directory.join(cache_key(url));

        if let Some(response) = self.read(url, &path).await {
            tracing::debug!(url = %url, "Cache hit");
            return Ok(response);
        }

        tracing::info!(url = %url, "Fetching");
        let response = self.inner.get(url).await?;

        if response.is_success() {
            if let Err(e) = self.write(&path, &response).await {
                tracing::warn!(url = %url, error = %e, "Failed to write cache entry");
            }
        }

        Ok(response)
    }
}
