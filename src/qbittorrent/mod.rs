//! qBittorrent Web API client
//!
//! Cookie-session authentication, listening-port reads via the preferences
//! endpoint, and listening-port writes via `setPreferences`. A session that
//! the server rejects mid-flight gets exactly one re-login per call; if the
//! retry is rejected too, the failure propagates as `AuthExpired`.

mod session;

pub use session::SessionState;

use crate::config::Config;
use crate::error::ApiError;
use crate::sync::TorrentApi;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

/// Subset of `/api/v2/app/preferences` we care about
#[derive(Debug, Deserialize)]
struct Preferences {
    listen_port: Option<i64>,
}

/// Client for the qBittorrent Web API
pub struct QbitClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
    session: SessionState,
}

impl QbitClient {
    pub fn new(config: &Config) -> Result<Self> {
        // Cookie store carries the SID session cookie across requests.
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(!config.qbittorrent_verify_ssl)
            .build()
            .context("failed to build torrent client HTTP client")?;

        let credentials = match (
            config.qbittorrent_username.clone(),
            config.qbittorrent_password.clone(),
        ) {
            (Some(username), password) => Some((username, password.unwrap_or_default())),
            _ => None,
        };

        Ok(Self {
            http,
            base_url: config.qbittorrent_url.clone(),
            credentials,
            session: SessionState::default(),
        })
    }

    /// Current session state (read-only)
    pub fn session(&self) -> SessionState {
        self.session
    }

    /// POST credentials to the login endpoint.
    ///
    /// With no credentials configured the Web API is assumed open and the
    /// session is trivially authenticated.
    async fn authenticate(&mut self) -> Result<(), ApiError> {
        let Some((username, password)) = self.credentials.clone() else {
            self.session = SessionState::Authenticated;
            return Ok(());
        };

        let url = format!("{}/api/v2/auth/login", self.base_url);
        debug!("POST {url} (login)");

        let response = self
            .http
            .post(&url)
            .form(&[("username", username.as_str()), ("password", password.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        debug!("login response: {status}");

        if status == StatusCode::FORBIDDEN {
            return Err(ApiError::AuthFailed("credentials rejected".to_string()));
        }
        if !status.is_success() {
            return Err(ApiError::Unreachable(format!(
                "login failed with status {status}"
            )));
        }

        // qBittorrent answers 200 with a literal "Ok." on success and
        // "Fails." on bad credentials.
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        if !body.trim().eq_ignore_ascii_case("ok.") {
            return Err(ApiError::AuthFailed("invalid credentials".to_string()));
        }

        self.session = SessionState::Authenticated;
        debug!("torrent client login successful");
        Ok(())
    }

    /// Re-login after the server rejected the session cookie
    async fn relogin(&mut self) -> Result<(), ApiError> {
        match self.authenticate().await {
            Ok(()) => Ok(()),
            // A rejected re-login on a lapsed session is an expiry, not a
            // configuration problem.
            Err(ApiError::AuthFailed(_)) => Err(ApiError::AuthExpired),
            Err(e) => Err(e),
        }
    }

    /// Send an authenticated request, re-authenticating once on 403.
    ///
    /// `make` rebuilds the request for the retry; builders are single-use.
    async fn send_with_reauth<F>(&mut self, make: F) -> Result<reqwest::Response, ApiError>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        if self.session.needs_login() {
            self.relogin().await?;
        }

        let response = make(&self.http, &self.base_url)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        if response.status() != StatusCode::FORBIDDEN {
            return Ok(response);
        }

        debug!("session rejected (403), re-authenticating");
        self.session = SessionState::Expired;
        self.relogin().await?;

        let response = make(&self.http, &self.base_url)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;
        if response.status() == StatusCode::FORBIDDEN {
            self.session = SessionState::Expired;
            return Err(ApiError::AuthExpired);
        }
        Ok(response)
    }
}

impl TorrentApi for QbitClient {
    async fn login(&mut self) -> Result<(), ApiError> {
        self.authenticate().await
    }

    async fn listening_port(&mut self) -> Result<u16, ApiError> {
        let response = self
            .send_with_reauth(|http, base| {
                let url = format!("{base}/api/v2/app/preferences");
                debug!("GET {url}");
                http.get(url)
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Unreachable(format!(
                "preferences query failed with status {status}"
            )));
        }

        let prefs: Preferences = response
            .json()
            .await
            .map_err(|e| ApiError::MalformedResponse(format!("invalid preferences body: {e}")))?;

        match prefs.listen_port {
            None => Err(ApiError::MalformedResponse(
                "listen_port missing from preferences".to_string(),
            )),
            Some(port) if !(1..=65535).contains(&port) => Err(ApiError::MalformedResponse(
                format!("listen_port out of range: {port}"),
            )),
            Some(port) => {
                debug!("current listen port: {port}");
                Ok(port as u16)
            },
        }
    }

    async fn set_listening_port(&mut self, port: u16) -> Result<(), ApiError> {
        debug!("setting listen_port={port}");

        let payload = serde_json::json!({ "listen_port": port }).to_string();
        let response = self
            .send_with_reauth(move |http, base| {
                let url = format!("{base}/api/v2/app/setPreferences");
                debug!("POST {url}");
                http.post(url).form(&[("json", payload.clone())])
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::RejectedByServer(format!(
                "set port refused with status {status}"
            )));
        }
        Ok(())
    }
}
