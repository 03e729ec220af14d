//! Configuration loading and validation
//!
//! All configuration is environment-sourced and resolved once at startup.
//! No runtime mutation - configuration is immutable after load.

mod env;
mod validation;

pub use env::from_lookup;
pub use validation::validate;

use anyhow::Result;
use std::time::Duration;
use tracing::info;

/// Process-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Gluetun control server base URL
    pub gluetun_url: String,
    /// Gluetun API key (takes priority over basic auth)
    pub gluetun_api_key: Option<String>,
    /// Gluetun basic auth username
    pub gluetun_username: Option<String>,
    /// Gluetun basic auth password
    pub gluetun_password: Option<String>,

    /// qBittorrent Web API base URL
    pub qbittorrent_url: String,
    /// qBittorrent Web API username
    pub qbittorrent_username: Option<String>,
    /// qBittorrent Web API password
    pub qbittorrent_password: Option<String>,
    /// Verify TLS certificates when talking to qBittorrent
    pub qbittorrent_verify_ssl: bool,

    /// Delay before the first readiness attempt
    pub startup_check_delay: Duration,
    /// Delay between readiness attempts
    pub startup_check_interval: Duration,
    /// Readiness attempt budget
    pub startup_max_attempts: u32,

    /// Delay between sync cycles (measured from cycle start)
    pub poll_interval: Duration,
    /// Delay before and between verification read-backs
    pub verify_delay: Duration,
    /// Verification attempt budget per update
    pub verify_max_attempts: u32,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
    /// Bind the health endpoint
    pub health_enabled: bool,
    /// Health endpoint port
    pub health_port: u16,
}

impl Config {
    /// Load configuration from the process environment and validate it
    pub fn load() -> Result<Config> {
        let config = env::from_lookup(|name| std::env::var(name).ok())?;
        validate(&config)?;
        Ok(config)
    }

    /// Log the effective configuration, masking credentials
    pub fn log_summary(&self) {
        info!("gateway URL: {}", self.gluetun_url);
        info!("torrent client URL: {}", self.qbittorrent_url);

        if self.gluetun_api_key.is_some() {
            info!("gateway auth: API key");
        } else if let Some(user) = &self.gluetun_username {
            info!("gateway auth: basic (user: {})", user);
        } else {
            info!("gateway auth: none");
        }

        if let Some(user) = &self.qbittorrent_username {
            info!("torrent client auth: enabled (user: {})", user);
        } else {
            info!("torrent client auth: disabled");
        }

        info!("poll interval: {}s", self.poll_interval.as_secs());
        info!(
            "startup checks: delay {}s, interval {}s, max {} attempts",
            self.startup_check_delay.as_secs(),
            self.startup_check_interval.as_secs(),
            self.startup_max_attempts
        );
        info!(
            "verification: delay {}s, max {} attempts",
            self.verify_delay.as_secs(),
            self.verify_max_attempts
        );
        info!("request timeout: {}s", self.request_timeout.as_secs());
        if self.health_enabled {
            info!("health endpoint: enabled on port {}", self.health_port);
        } else {
            info!("health endpoint: disabled");
        }
    }
}
