//! Failure taxonomy for the external APIs
//!
//! Every outcome of talking to Gluetun or qBittorrent maps onto one of these
//! variants. Steady-state callers convert them into health reasons at the
//! cycle boundary; only startup errors are allowed to end the process.

use thiserror::Error;

/// Failure from a Gluetun or qBittorrent API call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Network failure, connection refused, or request timeout
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// Credentials rejected outright
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Session token lapsed and re-login did not restore it
    #[error("session expired")]
    AuthExpired,

    /// Response arrived but its payload is unusable
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Server understood the update request and refused it
    #[error("rejected by server: {0}")]
    RejectedByServer(String),
}

impl ApiError {
    /// Classify a transport-level reqwest error.
    ///
    /// Timeouts and connection failures are both `Unreachable`: a hung
    /// dependency must look the same as an absent one to the caller.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Unreachable("request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Unreachable(format!("connection error: {err}"))
        } else {
            ApiError::Unreachable(format!("request failed: {err}"))
        }
    }

    /// True for credential-level failures (fatal during startup probing)
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::AuthFailed(_) | ApiError::AuthExpired)
    }
}

/// Fatal startup condition from the readiness prober
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartupError {
    /// Attempt budget exhausted without both services becoming ready
    #[error("services not ready after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// A service rejected our credentials; retrying cannot fix this
    #[error("authentication failed during startup: {0}")]
    Auth(String),
}
