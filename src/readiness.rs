//! Startup readiness gating
//!
//! Both external services must answer a cheap probe (a forwarded-port query
//! and a listening-port read) within the same attempt before the sync loop
//! is allowed to start. Probe failures accumulate
//! silently up to the attempt budget; exhausting it is the one unrecoverable
//! failure path in the process. Authentication rejections short-circuit the
//! budget - misconfigured credentials never fix themselves.

use crate::config::Config;
use crate::error::{ApiError, StartupError};
use crate::sync::{GatewayApi, TorrentApi};
use tokio::time::sleep;
use tracing::{debug, info};

/// Block until both services are ready, or the attempt budget runs out.
///
/// State machine per attempt: `Waiting -> Checking -> {Ready | Waiting}`;
/// after `startup_max_attempts` failed attempts: `StartupTimeout`.
pub async fn wait_until_ready<G, T>(
    config: &Config,
    gateway: &G,
    torrent: &mut T,
) -> Result<(), StartupError>
where
    G: GatewayApi,
    T: TorrentApi,
{
    if !config.startup_check_delay.is_zero() {
        info!(
            "waiting {}s before startup checks",
            config.startup_check_delay.as_secs()
        );
        sleep(config.startup_check_delay).await;
    }

    let max = config.startup_max_attempts;
    for attempt in 1..=max {
        info!("checking services (attempt {attempt}/{max})");

        let gateway_ready = probe_gateway(gateway).await?;
        let torrent_ready = probe_torrent(torrent).await?;

        if gateway_ready && torrent_ready {
            info!("both services ready");
            return Ok(());
        }

        if attempt < max {
            sleep(config.startup_check_interval).await;
        }
    }

    Err(StartupError::Timeout { attempts: max })
}

async fn probe_gateway<G: GatewayApi>(gateway: &G) -> Result<bool, StartupError> {
    match gateway.forwarded_port().await {
        Ok(_) => {
            debug!("gateway is ready");
            Ok(true)
        },
        // The control server answered; forwarding being inactive is a VPN
        // condition, not an availability one.
        Err(ApiError::MalformedResponse(reason)) => {
            debug!("gateway is ready (no active forwarding: {reason})");
            Ok(true)
        },
        Err(e) if e.is_auth() => Err(StartupError::Auth(format!("gateway: {e}"))),
        Err(e) => {
            debug!("gateway not ready: {e}");
            Ok(false)
        },
    }
}

// Probes with a port read rather than a login: with auth disabled a login
// is a local no-op and would report ready without ever reaching the server.
// The read authenticates first when credentials are configured, so it
// exercises the whole path either way.
async fn probe_torrent<T: TorrentApi>(torrent: &mut T) -> Result<bool, StartupError> {
    match torrent.listening_port().await {
        Ok(_) => {
            debug!("torrent client is ready");
            Ok(true)
        },
        Err(e) if e.is_auth() => Err(StartupError::Auth(format!("torrent client: {e}"))),
        Err(e) => {
            debug!("torrent client not ready: {e}");
            Ok(false)
        },
    }
}
