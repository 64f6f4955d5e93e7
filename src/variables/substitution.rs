//! Templating engine.
//!
//! Replaces `{{name}}` placeholders in URLs, bodies, headers and query
//! parameters with values from a [`VariableStore`].
//!
//! Substitution is a single left-to-right pass: text produced by a
//! substitution is never scanned again, so a value that itself contains
//! `{{...}}` is inserted literally. Placeholders with no matching variable
//! are left in place untouched, which keeps template-like text in request
//! bodies (mustache snippets, JSON examples) from breaking a request.

use super::store::VariableStore;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};

/// Cached pattern for `{{name}}`. Names are matched exactly, without trimming.
static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("Failed to compile placeholder regex"));

/// A lookup table built once from a store and reused for every template of
/// one request.
#[derive(Debug, Clone)]
pub struct Renderer<'a> {
    values: HashMap<&'a str, &'a str>,
}

impl<'a> Renderer<'a> {
    /// Builds the lookup table. Later variables overwrite earlier ones with
    /// the same name.
    pub fn new(store: &'a VariableStore) -> Self {
        let mut values = HashMap::with_capacity(store.len());
        for variable in store {
            values.insert(variable.name(), variable.value());
        }
        Self { values }
    }

    /// Renders a single string.
    pub fn render(&self, text: &str) -> String {
        // Fast path: nothing to substitute
        if !text.contains("{{") {
            return text.to_string();
        }

        PLACEHOLDER_REGEX
            .replace_all(text, |caps: &Captures| match self.values.get(&caps[1]) {
                Some(value) => (*value).to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Renders every value of every key, keeping keys and value order as-is.
    pub fn render_map(&self, map: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
        map.iter()
            .map(|(key, values)| {
                let rendered = values.iter().map(|v| self.render(v)).collect();
                (key.clone(), rendered)
            })
            .collect()
    }
}

/// Renders `text` against `store`.
///
/// # Examples
///
/// ```
/// use http_monitor::variables::{render, Variable, VariableStore};
///
/// let mut store = VariableStore::new();
/// store.push(Variable::provided("token", "abc123"));
///
/// assert_eq!(render("/data?auth={{token}}", &store), "/data?auth=abc123");
/// assert_eq!(render("{{unknown}}", &store), "{{unknown}}");
/// ```
pub fn render(text: &str, store: &VariableStore) -> String {
    Renderer::new(store).render(text)
}

/// Renders every value of a header or query parameter map.
pub fn render_map(
    map: &BTreeMap<String, Vec<String>>,
    store: &VariableStore,
) -> BTreeMap<String, Vec<String>> {
    Renderer::new(store).render_map(map)
}

/// Lists the placeholder names referenced by `text`, in order of appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}
