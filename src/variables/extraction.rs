//! Variable extraction from HTTP responses.
//!
//! Applies a request's [`ExtractionRule`]s, in order, to a buffered
//! [`HttpResponse`]. Extraction is all-or-nothing: if any rule fails, no
//! variable from that response is returned.

use super::store::Variable;
use crate::executor::ExecutionError;
use crate::models::request::{ExtractionRule, ExtractionSource};
use crate::models::response::HttpResponse;
use regex::Regex;
use serde_json::Value as JsonValue;

/// Runs every rule against `response`.
///
/// Returns the extracted variables in rule order, or the first failure.
pub fn extract_variables(
    response: &HttpResponse,
    rules: &[ExtractionRule],
) -> Result<Vec<Variable>, ExecutionError> {
    let mut extracted = Vec::with_capacity(rules.len());
    // Parsed lazily, at most once per response
    let mut json: Option<JsonValue> = None;

    for rule in rules {
        let value = match &rule.from {
            ExtractionSource::Header { header } => response
                .header(header)
                .map(str::to_string)
                .ok_or_else(|| extraction_error(rule, format!("header '{}' not found", header))),
            ExtractionSource::Status => Ok(response.status_code.to_string()),
            ExtractionSource::JsonPath { path } => {
                if json.is_none() {
                    json = Some(parse_json_body(response).map_err(|e| extraction_error(rule, e))?);
                }
                match &json {
                    Some(document) => evaluate_jsonpath(document, path)
                        .and_then(json_value_to_string)
                        .map_err(|e| extraction_error(rule, e)),
                    None => Err(extraction_error(rule, "response body is not JSON".to_string())),
                }
            }
            ExtractionSource::Regex { pattern } => extract_with_regex(response, rule, pattern),
        }?;

        extracted.push(Variable::extracted(rule.name.clone(), value));
    }

    Ok(extracted)
}

fn extraction_error(rule: &ExtractionRule, reason: String) -> ExecutionError {
    ExecutionError::Extraction {
        variable: rule.name.clone(),
        reason,
    }
}

fn parse_json_body(response: &HttpResponse) -> Result<JsonValue, String> {
    serde_json::from_slice(&response.body)
        .map_err(|e| format!("failed to parse JSON response: {}", e))
}

fn extract_with_regex(
    response: &HttpResponse,
    rule: &ExtractionRule,
    pattern: &str,
) -> Result<String, ExecutionError> {
    let re = Regex::new(pattern).map_err(|e| {
        ExecutionError::Configuration(format!(
            "invalid regex for variable '{}': {}",
            rule.name, e
        ))
    })?;

    let body = response
        .body_as_string()
        .map_err(|_| extraction_error(rule, "response body is not valid UTF-8".to_string()))?;

    let caps = re
        .captures(&body)
        .ok_or_else(|| extraction_error(rule, format!("pattern '{}' did not match", pattern)))?;

    // First capture group if the pattern has one, whole match otherwise
    let matched = if re.captures_len() > 1 {
        caps.get(1)
    } else {
        caps.get(0)
    };

    matched
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| extraction_error(rule, format!("pattern '{}' captured nothing", pattern)))
}

/// Represents a segment in a JSONPath expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// Object field access (e.g., "user", "name")
    Field(String),

    /// Array index access (e.g., [0], [5])
    ArrayIndex(usize),
}

/// Evaluates a `$.a.b[0]` style path against a JSON document.
fn evaluate_jsonpath<'a>(json: &'a JsonValue, path: &str) -> Result<&'a JsonValue, String> {
    let path = path.trim();
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);

    let mut current = json;
    for segment in parse_jsonpath_segments(path)? {
        current = match segment {
            PathSegment::Field(name) => current
                .get(&name)
                .ok_or_else(|| format!("field '{}' not found in JSON", name))?,
            PathSegment::ArrayIndex(index) => current
                .get(index)
                .ok_or_else(|| format!("array index {} out of bounds", index))?,
        };
    }

    Ok(current)
}

/// Splits a path (without the leading `$.`) into segments.
///
/// - "user.name" -> [Field("user"), Field("name")]
/// - "items[0].id" -> [Field("items"), ArrayIndex(0), Field("id")]
fn parse_jsonpath_segments(path: &str) -> Result<Vec<PathSegment>, String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Field(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Field(std::mem::take(&mut current)));
                }

                let index_str: String = chars.by_ref().take_while(|&c| c != ']').collect();
                let index = index_str
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| format!("invalid array index '{}'", index_str))?;
                segments.push(PathSegment::ArrayIndex(index));
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        segments.push(PathSegment::Field(current));
    }

    Ok(segments)
}

/// Strings come back without quotes; objects and arrays as compact JSON.
fn json_value_to_string(value: &JsonValue) -> Result<String, String> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        JsonValue::Null => Ok("null".to_string()),
        JsonValue::Array(_) | JsonValue::Object(_) => serde_json::to_string(value)
            .map_err(|e| format!("failed to serialize JSON value: {}", e)),
    }
}
