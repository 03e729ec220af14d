//! Gluetun control server client
//!
//! One concern: ask the control server which port the VPN provider is
//! currently forwarding. A single call issues a single HTTP request bounded
//! by the configured timeout; retry policy belongs to the caller.

use crate::config::Config;
use crate::error::ApiError;
use crate::sync::GatewayApi;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Authentication mode for the control server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayAuth {
    /// `X-API-Key` header
    ApiKey(String),
    /// HTTP basic auth
    Basic { username: String, password: String },
    /// No authentication
    None,
}

impl GatewayAuth {
    /// Resolve the auth mode. The API key takes priority when both an API
    /// key and basic-auth credentials are configured.
    pub fn resolve(
        api_key: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        if let Some(key) = api_key {
            return GatewayAuth::ApiKey(key);
        }
        if let (Some(username), Some(password)) = (username, password) {
            return GatewayAuth::Basic { username, password };
        }
        GatewayAuth::None
    }
}

/// `GET /v1/portforward` response body
#[derive(Debug, Deserialize)]
struct PortForwardPayload {
    port: Option<i64>,
}

/// Client for the Gluetun control server API
pub struct GluetunClient {
    http: reqwest::Client,
    base_url: String,
    auth: GatewayAuth,
}

impl GluetunClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build gateway HTTP client")?;

        Ok(Self {
            http,
            base_url: config.gluetun_url.clone(),
            auth: GatewayAuth::resolve(
                config.gluetun_api_key.clone(),
                config.gluetun_username.clone(),
                config.gluetun_password.clone(),
            ),
        })
    }
}

impl GatewayApi for GluetunClient {
    async fn forwarded_port(&self) -> Result<u16, ApiError> {
        let url = format!("{}/v1/portforward", self.base_url);
        debug!("GET {url}");

        let mut request = self.http.get(&url);
        request = match &self.auth {
            GatewayAuth::ApiKey(key) => request.header("X-API-Key", key),
            GatewayAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            },
            GatewayAuth::None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        debug!("gateway response: {status}");

        match status.as_u16() {
            401 => Err(ApiError::AuthFailed(
                "control server requires authentication".to_string(),
            )),
            403 => Err(ApiError::AuthFailed("access forbidden".to_string())),
            // The control server answers 404 while port forwarding is
            // inactive (VPN down or renegotiating). Never a comparison value.
            404 => Err(ApiError::MalformedResponse(
                "no forwarded port (VPN may be disconnected)".to_string(),
            )),
            200 => {
                let payload: PortForwardPayload = response
                    .json()
                    .await
                    .map_err(|e| ApiError::MalformedResponse(format!("invalid body: {e}")))?;
                port_from_payload(&payload)
            },
            s if (500..600).contains(&s) => {
                Err(ApiError::Unreachable(format!("server error: {s}")))
            },
            s => Err(ApiError::Unreachable(format!("unexpected status: {s}"))),
        }
    }
}

/// Extract and range-check the forwarded port from a 200 response
fn port_from_payload(payload: &PortForwardPayload) -> Result<u16, ApiError> {
    match payload.port {
        None | Some(0) => Err(ApiError::MalformedResponse(
            "no forwarded port (port forwarding not active)".to_string(),
        )),
        Some(port) if !(1..=65535).contains(&port) => Err(ApiError::MalformedResponse(format!(
            "forwarded port out of range: {port}"
        ))),
        Some(port) => Ok(port as u16),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_takes_priority_over_basic_auth() {
        let auth = GatewayAuth::resolve(
            Some("secret".into()),
            Some("user".into()),
            Some("pass".into()),
        );
        assert_eq!(auth, GatewayAuth::ApiKey("secret".into()));
    }

    #[test]
    fn basic_auth_requires_both_credentials() {
        let auth = GatewayAuth::resolve(None, Some("user".into()), None);
        assert_eq!(auth, GatewayAuth::None);

        let auth = GatewayAuth::resolve(None, Some("user".into()), Some("pass".into()));
        assert_eq!(
            auth,
            GatewayAuth::Basic {
                username: "user".into(),
                password: "pass".into()
            }
        );
    }

    #[test]
    fn valid_port_is_accepted() {
        let payload = PortForwardPayload { port: Some(51413) };
        assert_eq!(port_from_payload(&payload).unwrap(), 51413);
    }

    #[test]
    fn absent_and_zero_ports_are_rejected() {
        for port in [None, Some(0)] {
            let payload = PortForwardPayload { port };
            let err = port_from_payload(&payload).unwrap_err();
            assert!(matches!(err, ApiError::MalformedResponse(_)));
        }
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        for port in [-1, 65536, 1_000_000] {
            let payload = PortForwardPayload { port: Some(port) };
            let err = port_from_payload(&payload).unwrap_err();
            assert!(matches!(err, ApiError::MalformedResponse(_)), "port {port}");
        }
    }
}
