use crate::adapters::SiteAdapter;
use crate::config::types::{
    Config, IdentityConfig, OutputConfig, RateLimitConfig, ScraperConfig, SourcesConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_identity_config(&config.identity)?;
    validate_output_config(&config.output)?;
    validate_sources_config(&config.sources)?;
    Ok(())
}

/// Validates fetch and pagination settings
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout must be at least 1 second".to_string(),
        ));
    }

    if config.connect_timeout == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout must be at least 1 second".to_string(),
        ));
    }

    if config.retry_max_delay < config.retry_base_delay {
        return Err(ConfigError::Validation(format!(
            "retry-max-delay ({}ms) must be >= retry-base-delay ({}ms)",
            config.retry_max_delay, config.retry_base_delay
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates request spacing
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.min_interval == 0 && !config.allow_zero_interval {
        return Err(ConfigError::Validation(
            "rate-limit min-interval of 0 requires allow-zero-interval = true".to_string(),
        ));
    }

    for entry in &config.hosts {
        validate_host_pattern(&entry.host)?;

        if entry.min_interval == 0 && !config.allow_zero_interval {
            return Err(ConfigError::Validation(format!(
                "min-interval for host '{}' is 0 but allow-zero-interval is not set",
                entry.host
            )));
        }
    }

    Ok(())
}

/// Validates identity rotation settings
fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if !config.rotate && config.default_user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "default-user-agent cannot be empty when rotation is disabled".to_string(),
        ));
    }

    if let Some(blank) = config.user_agents.iter().position(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "user-agents entry {} is empty",
            blank
        )));
    }

    if config.proxies_enabled {
        if config.proxies.is_empty() {
            return Err(ConfigError::Validation(
                "proxies-enabled is set but no proxies are configured".to_string(),
            ));
        }

        for proxy in &config.proxies {
            let url = Url::parse(proxy).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", proxy, e))
            })?;

            if !matches!(url.scheme(), "http" | "https" | "socks5") {
                return Err(ConfigError::InvalidUrl(format!(
                    "Proxy URL '{}' must use http, https or socks5",
                    proxy
                )));
            }
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.database_enabled && config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty when the database is enabled".to_string(),
        ));
    }

    for format in &config.formats {
        if !matches!(format.as_str(), "csv" | "json") {
            return Err(ConfigError::Validation(format!(
                "Unknown output format '{}' (expected \"csv\" or \"json\")",
                format
            )));
        }
    }

    Ok(())
}

/// Validates that every enabled source names a registered adapter
fn validate_sources_config(config: &SourcesConfig) -> Result<(), ConfigError> {
    for id in &config.enabled {
        if SiteAdapter::from_id(id).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown source '{}' in sources.enabled",
                id
            )));
        }
    }
    Ok(())
}

/// Validates a host pattern (supports a leading "*." wildcard)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    if host.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Host pattern '{}' has no host after the wildcard",
            pattern
        )));
    }

    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}
