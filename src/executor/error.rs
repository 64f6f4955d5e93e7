//! Request execution error types.
//!
//! Every failure of a single chain step is one of these kinds. None of them
//! are retried; the chain runner decides whether a failure stops the chain.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while executing one request of a chain.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The request spec cannot be turned into a request: bad timeout string,
    /// unparsable URL after rendering, invalid header, invalid regex rule.
    ///
    /// Raised before any network I/O happens.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connection, DNS, TLS or other client-side send failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request did not complete within its timeout.
    #[error("request timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    /// The response status code is not in the accepted set.
    #[error("unexpected status code {actual}, expected one of {accepted:?}")]
    UnexpectedStatus { actual: u16, accepted: Vec<u16> },

    /// An extraction rule could not locate its value.
    #[error("failed to extract variable '{variable}': {reason}")]
    Extraction { variable: String, reason: String },
}

impl ExecutionError {
    /// Returns `true` for failures that happened on the wire.
    pub fn is_transport(&self) -> bool {
        matches!(self, ExecutionError::Transport(_) | ExecutionError::Timeout(_))
    }

    /// Short machine-friendly label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::Configuration(_) => "configuration",
            ExecutionError::Transport(_) => "transport",
            ExecutionError::Timeout(_) => "timeout",
            ExecutionError::UnexpectedStatus { .. } => "unexpected_status",
            ExecutionError::Extraction { .. } => "extraction",
        }
    }
}

/// Maps client errors that surface while sending or reading a response.
///
/// Builder errors mean the request itself was malformed and are reported as
/// configuration errors.
impl From<reqwest::Error> for ExecutionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ExecutionError::Configuration(err.to_string())
        } else {
            ExecutionError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ExecutionError {
    fn from(err: url::ParseError) -> Self {
        ExecutionError::Configuration(format!("invalid URL: {}", err))
    }
}
