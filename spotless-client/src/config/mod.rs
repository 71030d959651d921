//! Client configuration
//!
//! [`ClientConfig`] is what a gateway is built from. [`LocalConfig`] is the
//! per-workstation file it usually comes from, and [`SettingsStore`] keeps
//! the console-wide settings next to it.

mod local;
mod settings;

pub use local::{ENV_GATEWAY_KEY, ENV_GATEWAY_URL, LOCAL_CONFIG_FILE, LocalConfig, LocalConfigStorage};
pub use settings::{SETTINGS_FILE, SettingsStore};

use std::time::Duration;

/// Connection settings for the hosted gateway
#[derive(Clone)]
pub struct ClientConfig {
    /// Project URL, e.g. "https://xyz.example.co"
    pub gateway_url: String,
    /// Public (anon) key sent as `apikey`
    pub api_key: String,
    /// Session token of the signed-in operator
    pub access_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(gateway_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            api_key: api_key.into(),
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Both the URL and the key are required before anything is sent
    pub fn is_configured(&self) -> bool {
        !self.gateway_url.trim().is_empty() && !self.api_key.trim().is_empty()
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("gateway_url", &self.gateway_url)
            .field("api_key", &"[REDACTED]")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}
