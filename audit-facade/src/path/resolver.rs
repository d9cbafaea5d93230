//! Path parameter resolution
//!
//! Matches a live request path against the compiled OpenAPI templates and
//! recovers the named path parameters. An unmatched path is a normal outcome:
//! plenty of endpoints carry no path parameters at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::template::PathTemplates;

/// Name to value mapping of resolved path parameters
pub type PathParameterSet = BTreeMap<String, String>;

/// Resolves path parameters for a request path
///
/// The seam the audit middleware depends on, so tests can substitute a fixed
/// mapping without loading an OpenAPI document.
pub trait PathParameterService: Send + Sync {
    /// Extract path parameters from the given request path
    ///
    /// Never fails; returns an empty mapping when nothing matches.
    fn path_parameters(&self, request_path: Option<&str>) -> PathParameterSet;
}

/// Resolver backed by the templates compiled from an OpenAPI specification
#[derive(Debug, Clone)]
pub struct OpenApiPathParameterResolver {
    templates: Arc<PathTemplates>,
}

impl OpenApiPathParameterResolver {
    /// Create a resolver over a shared, immutable template set
    pub fn new(templates: Arc<PathTemplates>) -> Self {
        Self { templates }
    }

    /// The template set this resolver matches against
    pub fn templates(&self) -> &PathTemplates {
        &self.templates
    }
}

impl PathParameterService for OpenApiPathParameterResolver {
    fn path_parameters(&self, request_path: Option<&str>) -> PathParameterSet {
        resolve(request_path, &self.templates)
    }
}

/// Resolve `request_path` against `templates`; the first full match wins
pub fn resolve(request_path: Option<&str>, templates: &PathTemplates) -> PathParameterSet {
    let path = match request_path {
        Some(path) if !path.is_empty() => path,
        _ => return PathParameterSet::new(),
    };

    for template in templates.iter_match_order() {
        if let Some(params) = template.match_path(path) {
            tracing::trace!(template = %template.raw(), path = %path, "Resolved path parameters");
            return params;
        }
    }

    PathParameterSet::new()
}
