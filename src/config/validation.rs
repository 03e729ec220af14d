//! Configuration validation
//!
//! Fail-fast validation of configuration invariants. Runs before any
//! network activity; an invalid configuration never starts the loop.

use super::Config;
use anyhow::{bail, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate configuration invariants
pub fn validate(config: &Config) -> Result<()> {
    validate_url(&config.gluetun_url, "GLUETUN_URL")?;
    validate_url(&config.qbittorrent_url, "QBITTORRENT_URL")?;
    validate_timing(config)?;
    validate_logging(config)?;
    validate_health(config)?;
    Ok(())
}

fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        bail!("{name} is required");
    }
    let parsed = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => bail!("{name} is not a valid URL ({e}): {url}"),
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("{name} must be an http or https URL: {url}");
    }
    if parsed.host_str().is_none() {
        bail!("{name} is missing a host: {url}");
    }
    Ok(())
}

fn validate_timing(config: &Config) -> Result<()> {
    if config.startup_max_attempts == 0 {
        bail!("STARTUP_MAX_ATTEMPTS must be at least 1");
    }
    if config.verify_max_attempts == 0 {
        bail!("VERIFY_MAX_ATTEMPTS must be at least 1");
    }
    if config.poll_interval.is_zero() {
        bail!("POLL_INTERVAL must be at least 1 second");
    }
    if config.request_timeout.is_zero() {
        bail!("REQUEST_TIMEOUT must be at least 1 second");
    }
    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    if !LOG_LEVELS.contains(&config.log_level.as_str()) {
        bail!(
            "LOG_LEVEL must be one of {}: {}",
            LOG_LEVELS.join(", "),
            config.log_level
        );
    }
    Ok(())
}

fn validate_health(config: &Config) -> Result<()> {
    if config.health_enabled && config.health_port == 0 {
        bail!("HEALTH_PORT cannot be 0");
    }
    Ok(())
}
