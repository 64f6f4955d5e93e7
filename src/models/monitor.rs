//! Monitor definitions.
//!
//! A [`MonitorDefinition`] is the inbound configuration for one monitor: how
//! often it runs, which variables it provides, and the monitoring and cleanup
//! chains it executes on every tick.

use super::request::RequestSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Configuration of a single monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDefinition {
    /// Unique name, used in every log entry the monitor emits.
    pub name: String,

    /// Time between ticks, e.g. `"30s"` or `"5m"`.
    #[serde(with = "humantime_duration")]
    pub period: Duration,

    /// User-provided variables available to every request.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Monitoring chain. Stops at the first failing request.
    #[serde(default)]
    pub requests: Vec<RequestSpec>,

    /// Cleanup chain. Always runs in full after the monitoring chain.
    #[serde(default)]
    pub cleanup: Vec<RequestSpec>,
}

impl MonitorDefinition {
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            period,
            variables: BTreeMap::new(),
            requests: Vec::new(),
            cleanup: Vec::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_request(mut self, spec: RequestSpec) -> Self {
        self.requests.push(spec);
        self
    }

    pub fn with_cleanup(mut self, spec: RequestSpec) -> Self {
        self.cleanup.push(spec);
        self
    }
}

/// Serde adapter reading and writing durations in humantime syntax.
pub(crate) mod humantime_duration {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim())
            .map_err(|e| D::Error::custom(format!("invalid duration '{}': {}", raw, e)))
    }
}
