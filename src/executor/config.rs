//! Per-request execution settings.

use super::error::ExecutionError;
use crate::models::request::RequestSpec;
use std::time::Duration;

/// Default per-request timeout when neither the spec nor the configuration
/// sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by every request a client executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Timeout applied to specs that do not declare one.
    pub default_timeout: Duration,
}

impl ExecutionConfig {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Resolves the timeout for `spec`.
    ///
    /// A timeout string that does not parse, or parses to zero, is a
    /// configuration error.
    pub fn timeout_for(&self, spec: &RequestSpec) -> Result<Duration, ExecutionError> {
        let Some(raw) = spec.timeout.as_deref() else {
            return Ok(self.default_timeout);
        };

        let timeout = humantime::parse_duration(raw.trim()).map_err(|e| {
            ExecutionError::Configuration(format!("invalid timeout '{}': {}", raw, e))
        })?;

        if timeout.is_zero() {
            return Err(ExecutionError::Configuration(format!(
                "invalid timeout '{}': must be greater than 0",
                raw
            )));
        }

        Ok(timeout)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
