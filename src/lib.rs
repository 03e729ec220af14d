//! gluesync - VPN forwarded-port to torrent listening-port synchronizer
//!
//! Gluetun's control server reassigns the VPN-forwarded port whenever the
//! provider renegotiates port forwarding. gluesync polls that assignment and
//! reconfigures qBittorrent's listening port to match, so inbound peer
//! connectivity survives renegotiation.
//!
//! # Modules
//!
//! - [`config`] - Environment-sourced configuration and validation
//! - [`error`] - Typed failure taxonomy for the external APIs
//! - [`gluetun`] - Gluetun control server client (forwarded port queries)
//! - [`qbittorrent`] - qBittorrent Web API client with session handling
//! - [`readiness`] - Startup gating until both services respond
//! - [`sync`] - The poll/compare/update/verify controller
//! - [`health`] - Shared health state and the HTTP health endpoint
//! - [`logging`] - Structured logging setup

pub mod config;
pub mod error;
pub mod gluetun;
pub mod health;
pub mod logging;
pub mod qbittorrent;
pub mod readiness;
pub mod sync;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
