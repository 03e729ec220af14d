//! Environment variable parsing

use super::Config;
use anyhow::{Context, Result};
use std::time::Duration;

/// Build a [`Config`] from an environment lookup function.
///
/// Taking the lookup as a closure keeps parsing testable without touching
/// the process environment.
pub fn from_lookup<F>(get: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(Config {
        gluetun_url: url_var(&get, "GLUETUN_URL"),
        gluetun_api_key: opt_var(&get, "GLUETUN_API_KEY"),
        gluetun_username: opt_var(&get, "GLUETUN_USERNAME"),
        gluetun_password: opt_var(&get, "GLUETUN_PASSWORD"),

        qbittorrent_url: url_var(&get, "QBITTORRENT_URL"),
        qbittorrent_username: opt_var(&get, "QBITTORRENT_USERNAME"),
        qbittorrent_password: opt_var(&get, "QBITTORRENT_PASSWORD"),
        qbittorrent_verify_ssl: bool_var(&get, "QBITTORRENT_VERIFY_SSL", true),

        startup_check_delay: secs_var(&get, "STARTUP_CHECK_DELAY", 5)?,
        startup_check_interval: secs_var(&get, "STARTUP_CHECK_INTERVAL", 5)?,
        startup_max_attempts: u32_var(&get, "STARTUP_MAX_ATTEMPTS", 60)?,

        poll_interval: secs_var(&get, "POLL_INTERVAL", 30)?,
        verify_delay: secs_var(&get, "VERIFY_DELAY", 2)?,
        verify_max_attempts: u32_var(&get, "VERIFY_MAX_ATTEMPTS", 3)?,
        request_timeout: secs_var(&get, "REQUEST_TIMEOUT", 10)?,

        log_level: level_var(&get, "LOG_LEVEL", "info"),
        health_enabled: bool_var(&get, "HEALTH_ENABLED", true),
        health_port: u16_var(&get, "HEALTH_PORT", 8081)?,
    })
}

/// Non-empty string, or None
fn opt_var<F: Fn(&str) -> Option<String>>(get: &F, name: &str) -> Option<String> {
    get(name).filter(|v| !v.is_empty())
}

/// URL string with trailing slashes trimmed (empty string if unset;
/// validation rejects it later with a proper message)
fn url_var<F: Fn(&str) -> Option<String>>(get: &F, name: &str) -> String {
    get(name)
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string()
}

/// Boolean: true/1/yes are truthy, anything else is false
fn bool_var<F: Fn(&str) -> Option<String>>(get: &F, name: &str, default: bool) -> bool {
    match get(name) {
        None => default,
        Some(v) => matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
    }
}

fn u32_var<F: Fn(&str) -> Option<String>>(get: &F, name: &str, default: u32) -> Result<u32> {
    match get(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{name} must be an integer, got: {v}")),
    }
}

fn u16_var<F: Fn(&str) -> Option<String>>(get: &F, name: &str, default: u16) -> Result<u16> {
    match get(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a port number, got: {v}")),
    }
}

fn secs_var<F: Fn(&str) -> Option<String>>(get: &F, name: &str, default: u64) -> Result<Duration> {
    let secs = match get(name) {
        None => default,
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number of seconds, got: {v}"))?,
    };
    Ok(Duration::from_secs(secs))
}

/// Log level, lowercased, with "warning" normalized to "warn"
fn level_var<F: Fn(&str) -> Option<String>>(get: &F, name: &str, default: &str) -> String {
    let level = get(name)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
        .trim()
        .to_lowercase();
    if level == "warning" {
        "warn".to_string()
    } else {
        level
    }
}
