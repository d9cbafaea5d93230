//! OpenAPI path template compilation
//!
//! Turns templated paths such as `/users/{id}/orders/{orderId}` into anchored
//! regexes with one capture group per placeholder, in declaration order.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::openapi::document::PathItem;

/// Matches a well-formed `{name}` placeholder within a single path segment
static PARAM_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}/]+)\}").expect("placeholder regex is valid"));

/// Regex fragment substituted for each placeholder
const SEGMENT_CAPTURE: &str = "([^/]+)";

/// Extract placeholder names from a path template, left to right
///
/// Unterminated or nested braces are skipped rather than rejected, so
/// `/users/{userId/orders/{orderId}` yields only `orderId` and
/// `/a/{{nested}}/b` yields nothing.
pub fn extract_parameter_names(template: &str) -> Vec<String> {
    placeholders(template)
        .map(|(_, _, name)| name.to_string())
        .collect()
}

/// Byte range and name of every well-formed placeholder in `template`
///
/// A `{name}` directly preceded or followed by another brace is part of a
/// nested or doubled construct and is not a placeholder.
fn placeholders(template: &str) -> impl Iterator<Item = (usize, usize, &str)> + '_ {
    let bytes = template.as_bytes();
    PARAM_NAME_REGEX
        .captures_iter(template)
        .filter_map(move |caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            let before = whole.start().checked_sub(1).map(|i| bytes[i]);
            let after = bytes.get(whole.end()).copied();
            if matches!(before, Some(b'{' | b'}')) || matches!(after, Some(b'{' | b'}')) {
                return None;
            }
            Some((whole.start(), whole.end(), name.as_str()))
        })
}

/// A compiled OpenAPI path template
///
/// Immutable once compiled. `param_names().len()` always equals the number of
/// capture groups in the compiled pattern.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    param_names: Vec<String>,
    source: String,
    regex: Regex,
    specificity: usize,
}

impl PathTemplate {
    /// Compile a single path template
    pub fn compile(raw: &str) -> Result<Self> {
        let mut source = String::with_capacity(raw.len() + 16);
        let mut param_names = Vec::new();
        let mut last = 0;

        for (start, end, name) in placeholders(raw) {
            source.push_str(&regex::escape(&raw[last..start]));
            source.push_str(SEGMENT_CAPTURE);
            param_names.push(name.to_string());
            last = end;
        }
        source.push_str(&regex::escape(&raw[last..]));

        let regex = Regex::new(&format!("^{}$", source)).map_err(|e| {
            Error::Configuration(format!("Invalid path template '{}': {}", raw, e))
        })?;

        Ok(Self {
            raw: raw.to_string(),
            specificity: calculate_specificity(raw),
            param_names,
            source,
            regex,
        })
    }

    /// The template exactly as declared in the specification
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in declaration order
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Unanchored pattern text, e.g. `/api/resource/([^/]+)`
    pub fn pattern_source(&self) -> &str {
        &self.source
    }

    /// Number of capture groups in the compiled pattern
    pub fn capture_group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// Full-match `path` and zip captured values with the parameter names
    ///
    /// Returns `None` when the path does not match the whole template.
    pub fn match_path(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let params = self
            .param_names
            .iter()
            .enumerate()
            .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.clone(), m.as_str().to_string())))
            .collect();
        Some(params)
    }
}

/// Specificity score used to order candidate templates
///
/// Literal segments outweigh placeholders so `/a/{x}/b` is tried before
/// `/a/{x}/{y}`.
fn calculate_specificity(template: &str) -> usize {
    let mut score = 0;
    for segment in template.split('/') {
        if segment.is_empty() {
            continue;
        }
        if placeholders(segment).next().is_some() {
            score += 7;
        } else {
            score += 10;
        }
    }
    score
}

/// The process-wide, read-only set of compiled templates
///
/// Built once at startup and shared behind an `Arc`; there is no way to
/// mutate it after construction.
#[derive(Debug, Clone, Default)]
pub struct PathTemplates {
    templates: BTreeMap<String, PathTemplate>,
    /// Keys ordered by descending specificity, then lexically
    match_order: Vec<String>,
}

impl PathTemplates {
    /// Compile every template that declares at least one path parameter
    ///
    /// Templates whose item declares only query/header parameters (or none)
    /// are left out: they carry nothing to resolve.
    pub fn compile<'a, I>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a PathItem)>,
    {
        let mut compiled = Vec::new();
        for (raw, item) in paths {
            if item.declares_path_parameters() {
                compiled.push(PathTemplate::compile(raw)?);
            }
        }
        Ok(Self::from_templates(compiled))
    }

    /// Build the set from already compiled templates
    pub fn from_templates(templates: impl IntoIterator<Item = PathTemplate>) -> Self {
        let templates: BTreeMap<String, PathTemplate> = templates
            .into_iter()
            .map(|t| (t.raw.clone(), t))
            .collect();

        let mut match_order: Vec<&PathTemplate> = templates.values().collect();
        match_order.sort_by(|a, b| {
            b.specificity
                .cmp(&a.specificity)
                .then_with(|| a.raw.cmp(&b.raw))
        });
        let match_order = match_order.into_iter().map(|t| t.raw.clone()).collect();

        Self {
            templates,
            match_order,
        }
    }

    /// Look up a compiled template by its raw text
    pub fn get(&self, raw: &str) -> Option<&PathTemplate> {
        self.templates.get(raw)
    }

    /// Templates in the order the resolver tries them
    pub fn iter_match_order(&self) -> impl Iterator<Item = &PathTemplate> {
        self.match_order
            .iter()
            .filter_map(|key| self.templates.get(key))
    }

    /// Number of compiled templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no template declares a path parameter
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::document::Parameter;

    fn item_with(params: &[(&str, &str)]) -> PathItem {
        PathItem {
            parameters: Some(
                params
                    .iter()
                    .map(|(location, name)| Parameter {
                        name: Some(name.to_string()),
                        location: Some(location.to_string()),
                    })
                    .collect(),
            ),
            ..PathItem::default()
        }
    }

    #[test]
    fn test_extract_parameter_names() {
        assert_eq!(
            extract_parameter_names("/users/{userId}/orders/{orderId}"),
            vec!["userId", "orderId"]
        );
        assert_eq!(extract_parameter_names("/users/{userId}/profile"), vec!["userId"]);
        assert!(extract_parameter_names("/users/orders").is_empty());
        assert!(extract_parameter_names("").is_empty());
    }

    #[test]
    fn test_extract_parameter_names_skips_malformed_braces() {
        assert_eq!(
            extract_parameter_names("/users/{userId/orders/{orderId}"),
            vec!["orderId"]
        );
        assert!(extract_parameter_names("/a/{{nested}}/b").is_empty());
        assert!(extract_parameter_names("/a/{x}}/b").is_empty());
        assert!(extract_parameter_names("/a/{unterminated").is_empty());
    }

    #[test]
    fn test_nested_braces_are_matched_literally() {
        let template = PathTemplate::compile("/a/{{nested}}/b").unwrap();
        assert!(template.param_names().is_empty());
        assert_eq!(template.capture_group_count(), 0);
        assert_eq!(
            template.match_path("/a/{{nested}}/b"),
            Some(BTreeMap::new())
        );
        assert!(template.match_path("/a/{value}/b").is_none());
        assert!(template.match_path("/a/value/b").is_none());
    }

    #[test]
    fn test_well_formed_placeholder_next_to_nested_one() {
        let template = PathTemplate::compile("/a/{{nested}}/{id}").unwrap();
        assert_eq!(template.param_names(), ["id"]);
        let params = template.match_path("/a/{{nested}}/7").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("7"));
    }

    #[test]
    fn test_compile_pattern_source() {
        let template = PathTemplate::compile("/api/resource/{id}").unwrap();
        assert_eq!(template.pattern_source(), "/api/resource/([^/]+)");

        let template = PathTemplate::compile("/api/resource/{id}/sub/{subId}").unwrap();
        assert_eq!(
            template.pattern_source(),
            "/api/resource/([^/]+)/sub/([^/]+)"
        );
        assert_eq!(template.param_names(), ["id", "subId"]);
    }

    #[test]
    fn test_capture_groups_match_param_names() {
        for raw in [
            "/static",
            "/users/{userId}",
            "/users/{userId}/orders/{orderId}",
            "/a/{b}/{c}/{d}/e",
            "/users/{userId/orders/{orderId}",
            "/a/{{nested}}/b",
        ] {
            let template = PathTemplate::compile(raw).unwrap();
            assert_eq!(
                template.param_names().len(),
                template.capture_group_count(),
                "mismatch for {}",
                raw
            );
            assert_eq!(template.param_names(), extract_parameter_names(raw).as_slice());
        }
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let template = PathTemplate::compile("/v1.0/items/{id}").unwrap();
        assert!(template.match_path("/v1.0/items/9").is_some());
        assert!(template.match_path("/v1x0/items/9").is_none());
    }

    #[test]
    fn test_match_path_is_anchored_and_single_segment() {
        let template = PathTemplate::compile("/users/{userId}").unwrap();
        assert!(template.match_path("/users/123").is_some());
        assert!(template.match_path("/users/123/extra").is_none());
        assert!(template.match_path("/prefix/users/123").is_none());
        assert!(template.match_path("/users/").is_none());
    }

    #[test]
    fn test_compile_only_keeps_templates_with_path_parameters() {
        let mut paths = BTreeMap::new();
        paths.insert("/api/resource/{id}".to_string(), item_with(&[("path", "id")]));
        paths.insert("/api/search".to_string(), item_with(&[("query", "q")]));
        paths.insert("/api/plain".to_string(), PathItem::default());
        paths.insert(
            "/api/mixed/{id}".to_string(),
            item_with(&[("path", "id"), ("query", "q")]),
        );

        let templates = PathTemplates::compile(&paths).unwrap();
        assert_eq!(templates.len(), 2);
        assert!(templates.get("/api/resource/{id}").is_some());
        assert!(templates.get("/api/mixed/{id}").is_some());
        assert!(templates.get("/api/search").is_none());
        assert!(templates.get("/api/plain").is_none());
    }

    #[test]
    fn test_match_order_prefers_literal_segments() {
        let templates = PathTemplates::from_templates(vec![
            PathTemplate::compile("/a/{x}/{y}").unwrap(),
            PathTemplate::compile("/a/{x}/b").unwrap(),
        ]);
        let order: Vec<&str> = templates.iter_match_order().map(|t| t.raw()).collect();
        assert_eq!(order, vec!["/a/{x}/b", "/a/{x}/{y}"]);
    }
}
