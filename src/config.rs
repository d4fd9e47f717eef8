use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Base configuration used by the client.
///
/// `user_agent` and `bypass_csp` are forwarded to whatever browser
/// integration implements the page port; the remaining options steer the
/// session lifecycle owned by this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Budget for the authentication race, in milliseconds. 0 waits forever.
    pub auth_timeout_ms: u64,
    /// Number of QR token deliveries tolerated before the session is torn
    /// down. 0 retries forever.
    pub qr_max_retries: u32,
    /// Retry the authentication race once after re-navigating on failure.
    pub restart_on_auth_fail: bool,
    /// Treat a `CONFLICT` connection state as accepted and force this
    /// session to take over instead of disconnecting.
    pub takeover_on_conflict: bool,
    /// Delay before the takeover command is issued, in milliseconds.
    pub takeover_timeout_ms: u64,
    /// Directory holding per-client session data (browser profile).
    pub data_path: String,
    /// User agent advertised by the controlled browser.
    pub user_agent: String,
    /// Ask the browser integration to bypass the page's CSP.
    pub bypass_csp: bool,
    /// Identity of this client, used to key the on-disk session directory.
    pub client_id: Option<String>,
    /// Skip syncing message history into the remote store on login.
    pub disable_message_history: bool,
    /// Close the browser resource automatically when the session drops to
    /// Disconnected. Off by default; the host decides when to destroy.
    pub teardown_on_disconnect: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_timeout_ms: 45_000,
            qr_max_retries: 0,
            restart_on_auth_fail: false,
            takeover_on_conflict: false,
            takeover_timeout_ms: 0,
            data_path: "./.waweb_auth".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .into(),
            bypass_csp: false,
            client_id: None,
            disable_message_history: false,
            teardown_on_disconnect: false,
        }
    }
}

impl ClientConfig {
    /// Override the authentication race budget.
    pub fn with_auth_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.auth_timeout_ms = timeout_ms;
        self
    }

    /// Override the QR retry limit.
    pub fn with_qr_max_retries(mut self, retries: u32) -> Self {
        self.qr_max_retries = retries;
        self
    }

    /// Retry the authentication race once on failure.
    pub fn with_restart_on_auth_fail(mut self, restart: bool) -> Self {
        self.restart_on_auth_fail = restart;
        self
    }

    /// Enable session takeover when another session conflicts.
    pub fn with_takeover_on_conflict(mut self, takeover: bool) -> Self {
        self.takeover_on_conflict = takeover;
        self
    }

    /// Override the takeover delay.
    pub fn with_takeover_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.takeover_timeout_ms = timeout_ms;
        self
    }

    /// Override the session data directory.
    pub fn with_data_path(mut self, path: impl Into<String>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Override the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Ask the browser integration to bypass the page CSP.
    pub fn with_bypass_csp(mut self, bypass: bool) -> Self {
        self.bypass_csp = bypass;
        self
    }

    /// Set the client identity keying the session directory.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Skip message history sync on login.
    pub fn with_disable_message_history(mut self, disable: bool) -> Self {
        self.disable_message_history = disable;
        self
    }

    /// Close the browser automatically on disconnect.
    pub fn with_teardown_on_disconnect(mut self, teardown: bool) -> Self {
        self.teardown_on_disconnect = teardown;
        self
    }

    /// Check that the configuration is usable.
    ///
    /// The client id lands in a directory name, so it is restricted to
    /// alphanumeric characters, underscores and hyphens.
    pub fn validate(&self) -> Result<(), ClientError> {
        if let Some(id) = &self.client_id {
            let safe = !id.is_empty()
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !safe {
                return Err(ClientError::Validation(format!(
                    "invalid client id {id:?}: only alphanumeric characters, \
                     underscores and hyphens are allowed"
                )));
            }
        }
        Ok(())
    }

    /// The on-disk session directory for this client identity.
    pub fn session_dir(&self) -> PathBuf {
        let leaf = match &self.client_id {
            Some(id) => format!("session-{id}"),
            None => "session".to_string(),
        };
        PathBuf::from(&self.data_path).join(leaf)
    }
}
