use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the catalogue builder
///
/// Every section is optional in the TOML file; missing sections and keys
/// fall back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub sources: SourcesConfig,
}

/// Crawl orchestrator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of long-lived fetch workers
    pub workers: usize,

    /// How often the coordinator re-checks for completion (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// How often queue status is logged while work remains (milliseconds)
    #[serde(rename = "status-interval-ms")]
    pub status_interval_ms: u64,
}

impl CrawlerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            poll_interval_ms: 500,
            status_interval_ms: 2000,
        }
    }
}

/// Retry and backoff configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    #[serde(rename = "initial-delay-ms")]
    pub initial_delay_ms: u64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 8000,
        }
    }
}

/// HTTP response cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Directory holding one file per cached response
    pub directory: String,

    #[serde(rename = "default-ttl-hours")]
    pub default_ttl_hours: u64,

    /// TTL for search-class URLs, which change more often
    #[serde(rename = "search-ttl-hours")]
    pub search_ttl_hours: u64,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_hours * 3600)
    }

    pub fn search_ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_hours * 3600)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "cache".to_string(),
            default_ttl_hours: 48,
            search_ttl_hours: 2,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub name: String,
    pub version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value, e.g.
    /// `strongbox-catalogue-builder 1.0.0 (https://...)`
    pub fn header_value(&self) -> String {
        format!("{} {} ({})", self.name, self.version, self.contact_url)
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/ogri-la/strongbox-catalogue-builder".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the catalogue files are written to
    #[serde(rename = "state-directory")]
    pub state_directory: String,

    /// Path to the SQLite run-state database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Records updated on or before this date are left out of the short catalogue
    #[serde(rename = "short-cutoff")]
    pub short_cutoff: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            state_directory: "state".to_string(),
            database_path: "state/run-state.db".to_string(),
            short_cutoff: "2022-11-28".to_string(),
        }
    }
}

/// Per-source settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub wowinterface: WowinterfaceConfig,
    pub github: GithubConfig,
}

/// Which WowInterface API generation to read the file list from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    V3,
    V4,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WowinterfaceConfig {
    /// Base URL of the website
    pub host: String,

    /// Base URL of the API, without the version segment
    #[serde(rename = "api-host")]
    pub api_host: String,

    #[serde(rename = "api-version")]
    pub api_version: ApiVersion,
}

impl WowinterfaceConfig {
    /// Base URL including the API version segment
    pub fn api_base(&self) -> String {
        let host = self.api_host.trim_end_matches('/');
        match self.api_version {
            ApiVersion::V3 => format!("{}/v3/game/WOW", host),
            ApiVersion::V4 => format!("{}/v4/game/WOW", host),
        }
    }

    pub fn filelist_url(&self) -> String {
        format!("{}/filelist.json", self.api_base())
    }

    pub fn filedetails_url(&self, source_id: &str) -> String {
        format!("{}/filedetails/{}.json", self.api_base(), source_id)
    }

    fn site(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    pub fn detail_url(&self, source_id: &str) -> String {
        format!("{}/downloads/info{}", self.site(), source_id)
    }

    pub fn listing_url(&self, category_id: &str, page: u32) -> String {
        format!(
            "{}/downloads/index.php?cid={}&sb=dec_date&so=desc&pt=f&page={}",
            self.site(),
            category_id,
            page
        )
    }

    /// Category group pages the crawl starts from
    pub fn index_urls(&self) -> Vec<String> {
        vec![
            format!("{}/downloads/index.php", self.site()),
            format!("{}/addons.php", self.site()),
        ]
    }
}

impl Default for WowinterfaceConfig {
    fn default() -> Self {
        Self {
            host: "https://www.wowinterface.com".to_string(),
            api_host: "https://api.mmoui.com".to_string(),
            api_version: ApiVersion::V4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Raw URL of the community-maintained addon CSV
    #[serde(rename = "catalogue-url")]
    pub catalogue_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            catalogue_url:
                "https://raw.githubusercontent.com/layday/github-wow-addon-catalogue/main/addons.csv"
                    .to_string(),
        }
    }
}
