//! Controller-owned sync state

use std::time::SystemTime;

/// Last known synchronization state.
///
/// Owned exclusively by the controller; never shared across tasks.
#[derive(Debug, Default)]
pub struct SyncState {
    /// Forwarded port observed on the last successful cycle
    pub last_forwarded_port: Option<u16>,
    /// Configured port observed on the last successful cycle
    pub last_configured_port: Option<u16>,
    /// When the last cycle succeeded
    pub last_success: Option<SystemTime>,
    /// When the last cycle started
    pub last_attempt: Option<SystemTime>,
    /// Failed cycles since the last success
    pub consecutive_failures: u32,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of a cycle
    pub fn record_attempt(&mut self) {
        self.last_attempt = Some(SystemTime::now());
    }

    /// Mark a successful cycle with the ports it confirmed
    pub fn record_success(&mut self, forwarded: u16, configured: u16) {
        self.last_forwarded_port = Some(forwarded);
        self.last_configured_port = Some(configured);
        self.last_success = Some(SystemTime::now());
        self.consecutive_failures = 0;
    }

    /// Mark a failed cycle, returning the updated failure streak
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.consecutive_failures
    }
}
