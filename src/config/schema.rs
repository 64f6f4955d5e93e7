//! Configuration schema for the monitoring service.
//!
//! Defines the JSON document the service is started with and the validation
//! that runs after it is parsed.

use super::ConfigError;
use crate::executor::DEFAULT_TIMEOUT;
use crate::models::monitor::{humantime_duration, MonitorDefinition};
use crate::models::request::RequestSpec;
use crate::variables::{placeholders, RANDOM_VARIABLE, RUN_ID_VARIABLE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Settings for the shared HTTP client.
    #[serde(default)]
    pub client: ClientSettings,

    /// Default log filter, used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Monitors to run.
    #[serde(default)]
    pub monitors: Vec<MonitorDefinition>,
}

/// Settings used to build the HTTP client shared by every monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    /// Timeout for requests that do not declare one. Defaults to 10 seconds.
    ///
    /// Must be greater than 0.
    #[serde(default = "default_timeout", with = "humantime_duration")]
    pub default_timeout: Duration,

    /// Whether 3xx responses are followed. Defaults to true.
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow. Only used when
    /// `follow_redirects` is true. Defaults to 10.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Whether TLS certificates are validated. Defaults to true.
    ///
    /// **Warning:** disabling this accepts any certificate, including
    /// self-signed and expired ones.
    #[serde(default = "default_validate_ssl")]
    pub validate_ssl: bool,

    /// `User-Agent` sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Headers added to every request. Request-level headers with the same
    /// name are sent alongside them.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

/// Format of log lines written by the binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            monitors: Vec::new(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            default_timeout: default_timeout(),
            follow_redirects: default_follow_redirects(),
            max_redirects: default_max_redirects(),
            validate_ssl: default_validate_ssl(),
            user_agent: default_user_agent(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl ServiceConfig {
    /// Validates the configuration.
    ///
    /// Request timeouts are not checked here. A malformed one is reported
    /// when the request is executed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client.default_timeout.is_zero() {
            return Err(invalid("client.defaultTimeout must be greater than 0"));
        }

        let mut names = HashSet::new();
        for monitor in &self.monitors {
            if monitor.name.trim().is_empty() {
                return Err(invalid("monitor name must not be empty"));
            }
            if !names.insert(monitor.name.as_str()) {
                return Err(invalid(format!("duplicate monitor name '{}'", monitor.name)));
            }
            if monitor.period.is_zero() {
                return Err(invalid(format!(
                    "monitor '{}': period must be greater than 0",
                    monitor.name
                )));
            }

            for spec in monitor.requests.iter().chain(&monitor.cleanup) {
                validate_request(&monitor.name, spec)?;
            }
        }

        Ok(())
    }

    /// Lists placeholders that no variable can ever satisfy.
    ///
    /// A placeholder is satisfiable when it names a built-in, one of the
    /// monitor's variables, or a variable extracted by an earlier request.
    /// Cleanup requests can use anything the monitoring chain extracts.
    /// These are not errors: unresolved placeholders are sent verbatim.
    pub fn undeclared_placeholders(&self) -> Vec<UndeclaredPlaceholder> {
        let mut found = Vec::new();

        for monitor in &self.monitors {
            let mut known: HashSet<&str> = [RANDOM_VARIABLE, RUN_ID_VARIABLE].into();
            known.extend(monitor.variables.keys().map(String::as_str));

            for spec in monitor.requests.iter().chain(&monitor.cleanup) {
                for name in request_placeholders(spec) {
                    if !known.contains(name.as_str()) {
                        found.push(UndeclaredPlaceholder {
                            monitor: monitor.name.clone(),
                            request: spec.name.clone(),
                            name,
                        });
                    }
                }
                known.extend(spec.variables_from_response.iter().map(|r| r.name.as_str()));
            }
        }

        found
    }
}

/// A placeholder referencing a variable that is never defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeclaredPlaceholder {
    pub monitor: String,
    pub request: String,
    pub name: String,
}

fn request_placeholders(spec: &RequestSpec) -> Vec<String> {
    let mut names = placeholders(&spec.url);
    names.extend(placeholders(&spec.body));
    for value in spec.headers.values().chain(spec.query_params.values()).flatten() {
        names.extend(placeholders(value));
    }
    names.sort();
    names.dedup();
    names
}

fn validate_request(monitor: &str, spec: &RequestSpec) -> Result<(), ConfigError> {
    if spec.name.trim().is_empty() {
        return Err(invalid(format!(
            "monitor '{}': request name must not be empty",
            monitor
        )));
    }

    if spec.expected_response_codes.is_empty() {
        return Err(invalid(format!(
            "monitor '{}', request '{}': expectedResponseCodes must not be empty",
            monitor, spec.name
        )));
    }

    if let Some(code) = spec
        .expected_response_codes
        .iter()
        .find(|code| !(100..=599).contains(*code))
    {
        return Err(invalid(format!(
            "monitor '{}', request '{}': {} is not a valid HTTP status code",
            monitor, spec.name, code
        )));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_follow_redirects() -> bool {
    true
}

fn default_max_redirects() -> usize {
    10
}

fn default_validate_ssl() -> bool {
    true
}

fn default_user_agent() -> String {
    concat!("http-monitor/", env!("CARGO_PKG_VERSION")).to_string()
}
