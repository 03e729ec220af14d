//! gluesync daemon entry point
//!
//! Wires the pieces together: config -> logging -> health endpoint ->
//! readiness gate -> sync loop. Exits non-zero when the readiness budget
//! is exhausted; otherwise runs until a termination signal.

use anyhow::Result;
use clap::Parser;
use gluesync::config::Config;
use gluesync::gluetun::GluetunClient;
use gluesync::health::HealthState;
use gluesync::qbittorrent::QbitClient;
use gluesync::sync::Controller;
use gluesync::{health, logging, readiness};
use std::net::SocketAddr;
use tracing::{error, info};

/// Keep a torrent client's listening port in sync with the VPN-forwarded port
#[derive(Parser, Debug)]
#[command(name = "gluesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Debug-level output (overrides LOG_LEVEL)
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration errors surface on stderr before logging exists.
    let config = Config::load()?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    logging::init(level);

    info!("gluesync v{} starting", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let health = HealthState::new();
    if config.health_enabled {
        // Bind before spawning: a port conflict is a startup failure, not
        // something to discover from a silent task.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.health_port));
        let listener = health::server::bind(addr).await?;
        let state = health.clone();
        tokio::spawn(async move {
            if let Err(e) = health::server::serve(listener, state).await {
                error!("health endpoint failed: {e:#}");
            }
        });
    }

    let gateway = GluetunClient::new(&config)?;
    let mut torrent = QbitClient::new(&config)?;

    if let Err(e) = readiness::wait_until_ready(&config, &gateway, &mut torrent).await {
        error!("startup failed: {e}");
        std::process::exit(1);
    }

    let mut controller = Controller::new(gateway, torrent, health, &config);

    tokio::select! {
        () = controller.run() => {},
        () = shutdown_signal() => {
            info!("shutdown signal received, exiting");
        },
    }

    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let ctrl_c = tokio::signal::ctrl_c();
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c => {},
                _ = term.recv() => {},
            }
        },
        Err(_) => {
            let _ = ctrl_c.await;
        },
    }
}
