//! Buffered HTTP response snapshot.
//!
//! The executor reads the status line, headers and body of every response
//! into an [`HttpResponse`] before running extraction rules, so extraction is
//! plain synchronous code that can be unit tested without a server.

use std::time::Duration;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    /// HTTP status code (e.g., 200, 404, 500).
    pub status_code: u16,

    /// Response headers in the order the server sent them.
    ///
    /// Repeated headers appear once per value. Values that are not valid
    /// visible ASCII are dropped when the response is buffered.
    pub headers: Vec<(String, String)>,

    /// Response body as raw bytes.
    pub body: Vec<u8>,

    /// Time from issuing the request to having the full response buffered.
    pub duration: Duration,
}

impl HttpResponse {
    /// Creates an empty response with the given status code.
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    /// Returns the first value of a header, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as a UTF-8 string.
    pub fn body_as_string(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.clone())
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }
}
