//! Configuration module for the catalogue builder
//!
//! Handles loading, parsing, and validating the optional TOML configuration
//! file. Every key has a default, so running without a file is valid.
//!
//! # Example
//!
//! ```no_run
//! use strongbox_catalogue_builder::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("builder.toml")).unwrap();
//! println!("Crawling with {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    ApiVersion, CacheConfig, Config, CrawlerConfig, GithubConfig, OutputConfig, RetryConfig,
    SourcesConfig, UserAgentConfig, WowinterfaceConfig,
};

pub use parser::{compute_config_hash, hash_content, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
