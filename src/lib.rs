//! Strongbox catalogue builder
//!
//! This crate crawls addon metadata from WowInterface and the GitHub addon
//! catalogue, merges the partial observations of each addon into one
//! canonical record and writes validated catalogue files.

pub mod cancel;
pub mod catalogue;
pub mod commands;
pub mod config;
pub mod crawler;
pub mod http;
pub mod model;
pub mod parser;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for catalogue builder operations
#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] http::FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] parser::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Catalogue validation failed: {0}")]
    Validation(#[from] catalogue::ValidationError),

    #[error("Failed to create cache directory {path}: {source}")]
    CacheDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No completed scrape found in {0}")]
    NoCompletedRun(String),

    #[error("Run cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for catalogue builder operations
pub type Result<T> = std::result::Result<T, CatalogueError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cancel::CancelSignal;
pub use catalogue::{build_catalogue, merge, shorten_catalogue};
pub use config::Config;
pub use crawler::{Coordinator, CrawlOutcome};
pub use model::{Addon, Catalogue, GameTrack, Identity, OriginKind, PartialRecord, Source};
