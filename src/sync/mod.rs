//! Port synchronization controller
//!
//! Runs the poll -> compare -> update -> verify cycle on a fixed interval
//! and feeds the shared health state. Every steady-state failure is caught
//! at the cycle boundary; the next scheduled poll is the retry mechanism.

mod state;

pub use state::SyncState;

use crate::config::Config;
use crate::error::ApiError;
use crate::health::HealthState;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Source of the VPN gateway's forwarded port
#[allow(async_fn_in_trait)]
pub trait GatewayApi {
    /// Query the currently forwarded port. One request, no internal retry.
    async fn forwarded_port(&self) -> Result<u16, ApiError>;
}

/// The torrent client's listening-port operations
#[allow(async_fn_in_trait)]
pub trait TorrentApi {
    /// Establish an authenticated session (no-op when auth is disabled)
    async fn login(&mut self) -> Result<(), ApiError>;
    /// Read the currently configured listening port
    async fn listening_port(&mut self) -> Result<u16, ApiError>;
    /// Request a listening-port change; does not confirm it took effect
    async fn set_listening_port(&mut self, port: u16) -> Result<(), ApiError>;
}

/// Outcome of a single sync cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Ports already matched; nothing to do
    InSync,
    /// Port updated and verified within budget
    Updated,
    /// Cycle failed; health carries the reason
    Failed,
}

/// The synchronization controller
pub struct Controller<G, T> {
    gateway: G,
    torrent: T,
    health: HealthState,
    state: SyncState,
    poll_interval: Duration,
    verify_delay: Duration,
    verify_max_attempts: u32,
}

impl<G: GatewayApi, T: TorrentApi> Controller<G, T> {
    pub fn new(gateway: G, torrent: T, health: HealthState, config: &Config) -> Self {
        Self {
            gateway,
            torrent,
            health,
            state: SyncState::new(),
            poll_interval: config.poll_interval,
            verify_delay: config.verify_delay,
            verify_max_attempts: config.verify_max_attempts,
        }
    }

    /// Current sync state (read-only)
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Run the synchronization loop forever.
    ///
    /// Cadence is drift-free: ticks are spaced `poll_interval` apart measured
    /// from cycle start, so a slow cycle does not push the schedule back. A
    /// cycle that overruns the whole interval delays the next tick instead of
    /// bursting. The first tick fires immediately, which doubles as the
    /// initial sync right after startup.
    pub async fn run(&mut self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "sync loop starting, poll interval {}s",
            self.poll_interval.as_secs()
        );

        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// Perform one poll -> compare -> update -> verify cycle
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state.record_attempt();

        // Step 1: ground truth from the gateway. An unknown or out-of-range
        // port surfaces as an error here and is never compared against.
        let forwarded = match self.gateway.forwarded_port().await {
            Ok(port) => port,
            Err(e) => return self.fail(format!("gateway query failed: {e}")).await,
        };

        // Step 2: what the torrent client is actually listening on.
        let configured = match self.torrent.listening_port().await {
            Ok(port) => port,
            Err(e) => {
                return self
                    .fail(format!("torrent client query failed: {e}"))
                    .await
            },
        };

        // Step 3: steady state. No update call is made.
        if configured == forwarded {
            debug!("port unchanged ({configured})");
            self.succeed(forwarded, configured).await;
            return CycleOutcome::InSync;
        }

        info!("forwarded port changed: {configured} -> {forwarded}, updating torrent client");

        // Step 4: issue the update. On failure the next poll retries naturally.
        if let Err(e) = self.torrent.set_listening_port(forwarded).await {
            return self.fail(format!("port update failed: {e}")).await;
        }

        // Step 5: read back until the client reports the new port.
        for attempt in 1..=self.verify_max_attempts {
            sleep(self.verify_delay).await;

            match self.torrent.listening_port().await {
                Ok(port) if port == forwarded => {
                    info!("port updated to {forwarded}");
                    self.succeed(forwarded, port).await;
                    return CycleOutcome::Updated;
                },
                Ok(port) => {
                    debug!(
                        "port not yet applied (attempt {attempt}/{}): expected {forwarded}, got {port}",
                        self.verify_max_attempts
                    );
                },
                Err(e) => {
                    warn!(
                        "verification read failed (attempt {attempt}/{}): {e}",
                        self.verify_max_attempts
                    );
                },
            }
        }

        // Reported, not fatal: the reason names verification so an operator
        // can tell "update didn't take" from "can't reach dependency".
        self.fail(format!(
            "verification failed: port {forwarded} not confirmed after {} attempts",
            self.verify_max_attempts
        ))
        .await
    }

    async fn succeed(&mut self, forwarded: u16, configured: u16) {
        self.state.record_success(forwarded, configured);
        self.health.set_healthy().await;
    }

    async fn fail(&mut self, reason: String) -> CycleOutcome {
        let streak = self.state.record_failure();
        warn!("sync cycle failed ({streak} consecutive): {reason}");
        self.health.set_unhealthy(reason).await;
        CycleOutcome::Failed
    }
}
