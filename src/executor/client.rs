//! HTTP client provider.
//!
//! Monitors never build their own HTTP client. They receive a
//! [`MonitorClient`], which wraps a pooled `reqwest::Client` together with the
//! execution defaults, and is cheap to clone. The binary builds one from the
//! service configuration and shares it across every monitor.

use super::config::ExecutionConfig;
use crate::config::{ClientSettings, ConfigError};
use once_cell::sync::OnceCell;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;

/// Process-wide client, set once by [`init_shared_client`].
static SHARED_CLIENT: OnceCell<MonitorClient> = OnceCell::new();

/// An HTTP client plus the defaults used when executing request specs.
#[derive(Debug, Clone)]
pub struct MonitorClient {
    http: reqwest::Client,
    config: ExecutionConfig,
}

impl MonitorClient {
    pub fn new(http: reqwest::Client, config: ExecutionConfig) -> Self {
        Self { http, config }
    }

    /// Builds a client from the `client` section of the service configuration.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ConfigError> {
        let redirect = if settings.follow_redirects {
            Policy::limited(settings.max_redirects)
        } else {
            Policy::none()
        };

        let mut headers = HeaderMap::new();
        for (name, value) in &settings.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ConfigError::Invalid(format!("invalid default header name '{}': {}", name, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ConfigError::Invalid(format!("invalid value for default header '{}': {}", name, e))
            })?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .redirect(redirect)
            .danger_accept_invalid_certs(!settings.validate_ssl)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::new(http, ExecutionConfig::new(settings.default_timeout)))
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn execution_config(&self) -> &ExecutionConfig {
        &self.config
    }
}

impl Default for MonitorClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new(), ExecutionConfig::default())
    }
}

/// Builds the shared client from `settings`.
///
/// Only the first call has any effect; later calls return the client that
/// is already installed.
pub fn init_shared_client(settings: &ClientSettings) -> Result<MonitorClient, ConfigError> {
    SHARED_CLIENT
        .get_or_try_init(|| MonitorClient::from_settings(settings))
        .cloned()
}

/// Returns the shared client, installing a default one if none was set.
pub fn shared_client() -> MonitorClient {
    SHARED_CLIENT.get_or_init(MonitorClient::default).clone()
}
