//! HTTP request executor.
//!
//! Turns one [`RequestSpec`] plus the current [`VariableStore`] into an HTTP
//! exchange:
//!
//! 1. resolve the timeout (a malformed value fails here, before any I/O)
//! 2. render URL, body, headers and query parameters
//! 3. merge the rendered query parameters into the URL
//! 4. send the request and buffer the response, bounded by the timeout
//! 5. check the status code against the accepted set
//! 6. run the extraction rules and hand back the new variables
//!
//! The executor never touches the store; the chain runner appends whatever
//! [`execute`] returns.

pub mod client;
pub mod config;
pub mod error;

pub use client::{init_shared_client, shared_client, MonitorClient};
pub use config::{ExecutionConfig, DEFAULT_TIMEOUT};
pub use error::ExecutionError;

use crate::models::request::RequestSpec;
use crate::models::response::HttpResponse;
use crate::variables::{extract_variables, Renderer, Variable, VariableStore};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;
use url::{form_urlencoded, Url};

/// Executes `spec` with variables from `store`.
///
/// On success returns the variables extracted from the response, in rule
/// order. On failure nothing is returned, so partially extracted values of
/// this request never reach the store.
pub async fn execute(
    client: &MonitorClient,
    spec: &RequestSpec,
    store: &VariableStore,
) -> Result<Vec<Variable>, ExecutionError> {
    let timeout = client.execution_config().timeout_for(spec)?;
    let request = build_request(client.http(), spec, store)?;

    debug!(
        request = %spec.name,
        method = %spec.method,
        url = %request.url(),
        timeout_ms = timeout.as_millis() as u64,
        "sending request"
    );

    let response = match tokio::time::timeout(timeout, send(client.http(), request, spec)).await {
        Ok(result) => result?,
        Err(_) => return Err(ExecutionError::Timeout(timeout)),
    };

    debug!(
        request = %spec.name,
        status = response.status_code,
        elapsed_ms = response.duration.as_millis() as u64,
        body_bytes = response.body.len(),
        "response received"
    );

    extract_variables(&response, &spec.variables_from_response)
}

/// Renders `spec` and builds the HTTP request without sending it.
pub fn build_request(
    http: &reqwest::Client,
    spec: &RequestSpec,
    store: &VariableStore,
) -> Result<reqwest::Request, ExecutionError> {
    let renderer = Renderer::new(store);

    let rendered_url = renderer.render(&spec.url);
    let body = renderer.render(&spec.body);
    let headers = renderer.render_map(&spec.headers);
    let query = renderer.render_map(&spec.query_params);

    let mut url = Url::parse(&rendered_url).map_err(|e| {
        ExecutionError::Configuration(format!("invalid URL '{}': {}", rendered_url, e))
    })?;
    merge_query(&mut url, &query);

    let mut builder = http.request(spec.method.to_reqwest(), url);
    for (name, values) in &headers {
        for value in values {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    if !body.is_empty() {
        builder = builder.body(body);
    }

    builder
        .build()
        .map_err(|e| ExecutionError::Configuration(format!("failed to build request: {}", e)))
}

/// Merges declared query parameters into `url`.
///
/// Every declared key replaces all same-key pairs already in the URL; other
/// pairs are kept verbatim in their original order. Declared pairs follow,
/// keys in sorted order and values in declared order.
fn merge_query(url: &mut Url, query: &BTreeMap<String, Vec<String>>) {
    if query.is_empty() {
        return;
    }

    let mut segments: Vec<String> = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|segment| !segment.is_empty() && !declares(query, segment))
        .map(str::to_string)
        .collect();

    let mut declared = form_urlencoded::Serializer::new(String::new());
    for (key, values) in query {
        for value in values {
            declared.append_pair(key, value);
        }
    }
    let declared = declared.finish();
    if !declared.is_empty() {
        segments.push(declared);
    }

    if segments.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&segments.join("&")));
    }
}

/// Whether the raw `key=value` segment's decoded key is declared in `query`.
fn declares(query: &BTreeMap<String, Vec<String>>, segment: &str) -> bool {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| query.contains_key(key.as_ref()))
}

/// Sends the request and buffers the response.
async fn send(
    http: &reqwest::Client,
    request: reqwest::Request,
    spec: &RequestSpec,
) -> Result<HttpResponse, ExecutionError> {
    let started = Instant::now();
    let response = http.execute(request).await?;

    let status_code = response.status().as_u16();
    if !spec.accepts(status_code) {
        return Err(ExecutionError::UnexpectedStatus {
            actual: status_code,
            accepted: spec.expected_response_codes.iter().copied().collect(),
        });
    }

    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
        duration: started.elapsed(),
    })
}
