//! Declarative request specifications.
//!
//! A [`RequestSpec`] describes one HTTP call of a monitor chain: method, URL,
//! headers, body and query parameters (all of which may contain `{{name}}`
//! placeholders), the set of status codes considered healthy, a timeout and
//! the rules used to pull variables out of the response.
//!
//! Specs are owned by the monitor definition and are never mutated while a
//! chain runs; everything produced during a run lives in the run's
//! [`VariableStore`](crate::variables::VariableStore).

use serde::{de::Error, Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// HTTP request method.
///
/// Deserialized case-insensitively, so `"get"` and `"GET"` are the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum HttpMethod {
    /// HTTP GET method - retrieve a resource
    #[default]
    GET,
    /// HTTP POST method - submit data to create a resource
    POST,
    /// HTTP PUT method - replace a resource
    PUT,
    /// HTTP DELETE method - remove a resource
    DELETE,
    /// HTTP PATCH method - partially modify a resource
    PATCH,
    /// HTTP OPTIONS method - describe communication options
    OPTIONS,
    /// HTTP HEAD method - retrieve headers only
    HEAD,
}

impl HttpMethod {
    /// Returns the string representation of the HTTP method.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::DELETE => "DELETE",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::OPTIONS => "OPTIONS",
            HttpMethod::HEAD => "HEAD",
        }
    }

    /// Parses a method name case-insensitively.
    ///
    /// Returns `None` for anything that is not one of the supported methods.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "DELETE" => Some(HttpMethod::DELETE),
            "PATCH" => Some(HttpMethod::PATCH),
            "OPTIONS" => Some(HttpMethod::OPTIONS),
            "HEAD" => Some(HttpMethod::HEAD),
            _ => None,
        }
    }

    /// Converts to the method type used by the HTTP client.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::DELETE => reqwest::Method::DELETE,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::OPTIONS => reqwest::Method::OPTIONS,
            HttpMethod::HEAD => reqwest::Method::HEAD,
        }
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        HttpMethod::parse(raw.trim())
            .ok_or_else(|| D::Error::custom(format!("unsupported HTTP method '{}'", raw)))
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an extraction rule reads its value from.
///
/// Serialized with an internal `from` tag, e.g.
/// `{"name": "token", "from": "header", "header": "X-Token"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "camelCase")]
pub enum ExtractionSource {
    /// First value of a response header, matched case-insensitively.
    Header { header: String },

    /// A `$.field[0].nested` style path into a JSON response body.
    JsonPath { path: String },

    /// First capture group of a regular expression run over the body.
    ///
    /// When the pattern has no capture group the whole match is used.
    Regex { pattern: String },

    /// The numeric status code of the response.
    Status,
}

/// Describes how to derive one named variable from a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// Name the extracted variable is stored under.
    pub name: String,

    #[serde(flatten)]
    pub from: ExtractionSource,
}

impl ExtractionRule {
    pub fn header(name: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: ExtractionSource::Header {
                header: header.into(),
            },
        }
    }

    pub fn json_path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: ExtractionSource::JsonPath { path: path.into() },
        }
    }

    pub fn regex(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: ExtractionSource::Regex {
                pattern: pattern.into(),
            },
        }
    }

    pub fn status(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: ExtractionSource::Status,
        }
    }
}

/// One step of a monitoring or cleanup chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    /// Name used in log entries for this request.
    pub name: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// URL template. May carry an inline query string.
    pub url: String,

    /// Header templates. Every value of every key is rendered; a key with
    /// several values is sent as repeated headers.
    #[serde(default)]
    pub headers: BTreeMap<String, Vec<String>>,

    /// Body template. An empty body is sent as no body.
    #[serde(default)]
    pub body: String,

    /// Query parameter templates, merged into the URL's query string.
    #[serde(default)]
    pub query_params: BTreeMap<String, Vec<String>>,

    /// Status codes that count as success.
    #[serde(default = "default_expected_response_codes")]
    pub expected_response_codes: BTreeSet<u16>,

    /// Timeout in humantime syntax (`"500ms"`, `"10s"`, `"1m30s"`).
    ///
    /// `None` falls back to the client-wide default. A value that does not
    /// parse is reported when the request is executed, not at load time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Applied in order once the status code has been accepted.
    #[serde(default)]
    pub variables_from_response: Vec<ExtractionRule>,
}

fn default_expected_response_codes() -> BTreeSet<u16> {
    BTreeSet::from([200])
}

impl RequestSpec {
    /// Creates a spec accepting only `200` with no headers, body or rules.
    pub fn new(name: impl Into<String>, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: String::new(),
            query_params: BTreeMap::new(),
            expected_response_codes: default_expected_response_codes(),
            timeout: None,
            variables_from_response: Vec::new(),
        }
    }

    /// Appends a header value template.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Appends a query parameter value template.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Replaces the accepted status code set.
    pub fn expecting<I>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.expected_response_codes = codes.into_iter().collect();
        self
    }

    pub fn extracting(mut self, rule: ExtractionRule) -> Self {
        self.variables_from_response.push(rule);
        self
    }

    /// Returns `true` if `status` is one of the accepted codes.
    pub fn accepts(&self, status: u16) -> bool {
        self.expected_response_codes.contains(&status)
    }
}
