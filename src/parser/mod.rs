//! Source parsers
//!
//! A parser turns the bytes of one fetched resource into partial records and
//! newly discovered URLs. Parsers are pure: no network, no filesystem.

mod csv;
mod github;
pub mod text;
mod wowi;

pub use self::csv::parse_csv;
pub use github::GithubParser;
pub use wowi::{WowiParser, WowiUrlKind};

use crate::config::SourcesConfig;
use crate::model::{PartialRecord, Source};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while parsing fetched content
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no parser rule matches {0}")]
    UnknownUrl(String),

    #[error("content of {url} is not valid UTF-8")]
    Encoding { url: String },

    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid CSV at line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("missing column '{0}' in CSV header")]
    MissingColumn(String),

    #[error("could not find an addon id in {0}")]
    MissingId(String),
}

/// What one resource contributed to the crawl
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub records: Vec<PartialRecord>,
    pub urls: Vec<String>,
}

impl ParseOutput {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.urls.is_empty()
    }
}

/// Turns a fetched resource into records and follow-up URLs
pub trait Parser: Send + Sync {
    fn parse(&self, url: &str, body: &[u8]) -> Result<ParseOutput, ParseError>;
}

/// Parser lookup by source
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<Source, Arc<dyn Parser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the WowInterface and GitHub parsers
    pub fn with_defaults(config: &SourcesConfig) -> Self {
        Self::new()
            .register(
                Source::Wowinterface,
                Arc::new(WowiParser::new(config.wowinterface.clone())),
            )
            .register(Source::Github, Arc::new(GithubParser::new()))
    }

    pub fn register(mut self, source: Source, parser: Arc<dyn Parser>) -> Self {
        self.parsers.insert(source, parser);
        self
    }

    pub fn get(&self, source: Source) -> Option<Arc<dyn Parser>> {
        self.parsers.get(&source).cloned()
    }
}

fn utf8<'a>(url: &str, body: &'a [u8]) -> Result<&'a str, ParseError> {
    std::str::from_utf8(body).map_err(|_| ParseError::Encoding {
        url: url.to_string(),
    })
}
