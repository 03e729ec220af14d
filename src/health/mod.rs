//! Shared health state
//!
//! A single synchronized value written by the sync controller and read by
//! the HTTP endpoint. Last-writer-wins, no history. Both sides receive a
//! clone of the same handle at construction; there are no ambient globals.

pub mod server;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Point-in-time health snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub healthy: bool,
    pub reason: Option<String>,
}

/// Shared, synchronized health state handle
#[derive(Debug, Clone)]
pub struct HealthState {
    inner: Arc<RwLock<HealthStatus>>,
}

impl HealthState {
    /// New state, unhealthy until the first successful sync cycle
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HealthStatus {
                healthy: false,
                reason: Some("starting up".to_string()),
            })),
        }
    }

    pub async fn set_healthy(&self) {
        let mut status = self.inner.write().await;
        status.healthy = true;
        status.reason = None;
    }

    pub async fn set_unhealthy(&self, reason: impl Into<String>) {
        let mut status = self.inner.write().await;
        status.healthy = false;
        status.reason = Some(reason.into());
    }

    /// Read the current status. Never observes a torn update; the lock
    /// covers both fields.
    pub async fn snapshot(&self) -> HealthStatus {
        self.inner.read().await.clone()
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health endpoint response body. Field order matters: the contract is
/// `{"status":...}` first, `"reason"` only when unhealthy.
#[derive(Serialize)]
pub(crate) struct HealthBody<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

/// Render the exact response code and body for a snapshot
pub(crate) fn render(status: &HealthStatus) -> (hyper::StatusCode, String) {
    let (code, body) = if status.healthy {
        (
            hyper::StatusCode::OK,
            HealthBody {
                status: "healthy",
                reason: None,
            },
        )
    } else {
        (
            hyper::StatusCode::SERVICE_UNAVAILABLE,
            HealthBody {
                status: "unhealthy",
                reason: Some(status.reason.as_deref().unwrap_or("")),
            },
        )
    };
    // Serializing a two-field struct cannot fail.
    let body = serde_json::to_string(&body).expect("health body serializes");
    (code, body)
}
