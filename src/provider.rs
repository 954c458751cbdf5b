//! Shared handle to the remote speech/chat provider
//!
//! The HTTP client is created on first use and reused for the lifetime of
//! the process. A missing credential is only reported when a call is made.

use std::sync::OnceLock;

use secrecy::{ExposeSecret, SecretString};

use crate::config::ProviderConfig;
use crate::{Error, Result};

/// Lazily initialised provider client (OpenAI-compatible API)
#[derive(Debug)]
pub struct Provider {
    api_key: Option<SecretString>,
    base_url: String,
    client: OnceLock<reqwest::Client>,
}

impl Provider {
    /// Create a provider handle without touching the network
    #[must_use]
    pub fn new(api_key: Option<SecretString>, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: OnceLock::new(),
        }
    }

    /// Create a provider handle from configuration
    #[must_use]
    pub fn from_config(config: ProviderConfig) -> Self {
        Self::new(config.api_key, config.base_url)
    }

    /// Whether a credential is configured
    #[must_use]
    pub const fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Start an authenticated POST to `{base_url}/{path}`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no credential is configured
    pub fn post(&self, path: &str) -> Result<reqwest::RequestBuilder> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::Config("GROQ_API_KEY is not configured".to_string()))?;

        let client = self.client.get_or_init(|| {
            tracing::debug!(base_url = %self.base_url, "initialising provider client");
            reqwest::Client::new()
        });

        Ok(client
            .post(format!("{}/{}", self.base_url, path.trim_start_matches('/')))
            .bearer_auth(key.expose_secret()))
    }
}
