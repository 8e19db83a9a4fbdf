use crate::config::types::{
    CacheConfig, Config, CrawlerConfig, OutputConfig, RetryConfig, SourcesConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use chrono::NaiveDate;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_cache_config(&config.cache)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_sources_config(&config.sources)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    if config.poll_interval_ms < 1 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be >= 1".to_string(),
        ));
    }

    if config.status_interval_ms < 1 {
        return Err(ConfigError::Validation(
            "status-interval-ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.initial_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "initial-delay-ms ({}) must not exceed max-delay-ms ({})",
            config.initial_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "cache directory cannot be empty".to_string(),
        ));
    }

    if config.default_ttl_hours < 1 {
        return Err(ConfigError::Validation(format!(
            "default-ttl-hours must be >= 1, got {}",
            config.default_ttl_hours
        )));
    }

    if config.search_ttl_hours < 1 {
        return Err(ConfigError::Validation(format!(
            "search-ttl-hours must be >= 1, got {}",
            config.search_ttl_hours
        )));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent name cannot be empty".to_string(),
        ));
    }

    if !config
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "user-agent name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.state_directory.is_empty() {
        return Err(ConfigError::Validation(
            "state-directory cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    NaiveDate::parse_from_str(&config.short_cutoff, "%Y-%m-%d").map_err(|e| {
        ConfigError::Validation(format!(
            "short-cutoff must be a YYYY-MM-DD date, got '{}': {}",
            config.short_cutoff, e
        ))
    })?;

    Ok(())
}

fn validate_sources_config(config: &SourcesConfig) -> Result<(), ConfigError> {
    validate_http_url("sources.wowinterface.host", &config.wowinterface.host)?;
    validate_http_url("sources.wowinterface.api-host", &config.wowinterface.api_host)?;
    validate_http_url("sources.github.catalogue-url", &config.github.catalogue_url)?;
    Ok(())
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "{} must use http or https, got '{}'",
            key, other
        ))),
    }
}
