use crate::config::types::{
    Config, CrawlerConfig, MirrorConfig, UserAgentConfig, DEFAULT_CONCURRENCY,
    DEFAULT_OUTPUT_DIR, DEFAULT_QUEUE_CAPACITY, DEFAULT_TIMEOUT_SECS,
};
use crate::ConfigError;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Upper bound on workers accepted from a configuration file
const MAX_CONCURRENCY: usize = 256;

/// Validates the entire configuration file
///
/// Zero values for timeout, concurrency and queue capacity are not errors
/// here; they are replaced with defaults by [`normalize`].
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if let Some(raw) = &config.start_url {
        parse_start_url(raw)?;
    }
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be at most {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.max_assets == Some(0) {
        return Err(ConfigError::Validation(
            "max-assets must be positive when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    Ok(())
}

/// Parses and checks a start URL
///
/// The URL must be absolute, use `http` or `https`, and name a host. Any
/// fragment is dropped so the start page dedups with links pointing at it.
pub fn parse_start_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", raw, e)))?;
    validate_start_url(&url)?;
    url.set_fragment(None);
    Ok(url)
}

/// Checks that an already-parsed start URL can be mirrored
pub fn validate_start_url(url: &Url) -> Result<(), ConfigError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}': only http and https are supported",
            url
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(ConfigError::InvalidUrl(format!("'{}': missing host", url))),
    }
}

/// Builds runtime settings from a validated configuration file
pub fn resolve(config: &Config) -> Result<MirrorConfig, ConfigError> {
    validate(config)?;

    let raw = config
        .start_url
        .as_deref()
        .ok_or_else(|| ConfigError::Validation("a start URL is required".to_string()))?;
    let start_url = parse_start_url(raw)?;

    let mirror = MirrorConfig::new(start_url)
        .with_max_depth(config.crawler.max_depth)
        .with_output_dir(config.output.directory.clone())
        .with_timeout(Duration::from_secs(config.crawler.timeout_secs))
        .with_concurrency(config.crawler.concurrency)
        .with_queue_capacity(config.crawler.queue_capacity)
        .with_user_agent(config.user_agent.header_value())
        .with_max_assets(config.crawler.max_assets);

    Ok(normalize(mirror))
}

/// Replaces out-of-range runtime settings with defaults
///
/// Non-positive timeout, concurrency and queue capacity, and an empty output
/// directory, are normalised rather than rejected. Each replacement is logged.
pub fn normalize(mut config: MirrorConfig) -> MirrorConfig {
    if config.timeout.is_zero() {
        tracing::warn!(
            "Timeout must be positive, using default of {}s",
            DEFAULT_TIMEOUT_SECS
        );
        config.timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    }

    if config.concurrency == 0 {
        tracing::warn!(
            "Concurrency must be at least 1, using default of {}",
            DEFAULT_CONCURRENCY
        );
        config.concurrency = DEFAULT_CONCURRENCY;
    }

    if config.queue_capacity == 0 {
        tracing::warn!(
            "Queue capacity must be at least 1, using default of {}",
            DEFAULT_QUEUE_CAPACITY
        );
        config.queue_capacity = DEFAULT_QUEUE_CAPACITY;
    }

    if config.output_dir.as_os_str().is_empty() {
        config.output_dir = PathBuf::from(DEFAULT_OUTPUT_DIR);
    }

    if config.user_agent.trim().is_empty() {
        config.user_agent = UserAgentConfig::default().header_value();
    }

    config
}
