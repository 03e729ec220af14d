//! Web API session state machine
//!
//! qBittorrent sessions are cookie-based and lapse server-side. The state
//! is explicit so re-authentication is a visible transition, not a hidden
//! retry buried in request plumbing.

/// Session lifecycle: `Unauthenticated -> Authenticated -> Expired`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session established yet
    #[default]
    Unauthenticated,
    /// Session cookie accepted by the server
    Authenticated,
    /// Server rejected the session cookie; a re-login is required
    Expired,
}

impl SessionState {
    /// Whether a login must happen before the next authenticated request
    pub fn needs_login(self) -> bool {
        !matches!(self, SessionState::Authenticated)
    }
}
