//! OpenAPI specification loading and template compilation
//!
//! Runs once at startup. Every failure here is a [`Error::Configuration`]:
//! the service must refuse to start rather than audit with an empty path
//! table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::document::OpenApiDocument;
use super::loader::ResourceLoader;
use crate::error::{Error, Result};
use crate::path::PathTemplates;

/// A loaded OpenAPI specification and its compiled path templates
#[derive(Debug, Clone)]
pub struct OpenApiSpecification {
    location: Option<PathBuf>,
    path_count: usize,
    templates: Arc<PathTemplates>,
}

impl OpenApiSpecification {
    /// Locate, read, parse and compile the specification named by `rest_specification`
    pub fn load(loader: &ResourceLoader, rest_specification: Option<&str>) -> Result<Self> {
        let location = rest_specification.and_then(|pattern| loader.find_first(pattern));

        let Some(location) = location else {
            tracing::warn!(
                "No OpenAPI specification found at the specified path: {}",
                rest_specification.unwrap_or("<unset>")
            );
            return Err(Error::Configuration(
                "No OpenAPI specification found at the specified path".to_string(),
            ));
        };

        let contents = std::fs::read_to_string(&location).map_err(|e| {
            tracing::error!("Failed to read OpenAPI specification {}: {}", location.display(), e);
            Error::Configuration("Unable to parse OpenAPI specification at location".to_string())
        })?;

        let name = rest_specification.unwrap_or_default();
        let mut spec = Self::parse(name, &contents)?;
        spec.location = Some(location);
        Ok(spec)
    }

    /// Parse and compile a specification already held in memory
    ///
    /// `name` is the configured specification name, used in error messages.
    /// YAML and JSON documents are both accepted.
    pub fn parse(name: &str, contents: &str) -> Result<Self> {
        let document: OpenApiDocument = serde_yaml::from_str(contents).map_err(|e| {
            tracing::error!("Failed to parse OpenAPI specification {}: {}", name, e);
            Error::Configuration("Unable to parse OpenAPI specification at location".to_string())
        })?;

        Self::from_document(name, document)
    }

    /// Compile an already parsed document
    pub fn from_document(name: &str, document: OpenApiDocument) -> Result<Self> {
        let paths = match document.paths {
            Some(paths) if !paths.is_empty() => paths,
            _ => {
                tracing::warn!("Supplied specification has no endpoints defined: {}", name);
                return Err(Error::Configuration(format!(
                    "Supplied specification has no endpoints defined: {}",
                    name
                )));
            }
        };

        tracing::info!("Loaded {} paths from OpenAPI specification", paths.len());

        let mut items = Vec::with_capacity(paths.len());
        for (path, item) in &paths {
            match item {
                Some(item) => items.push((path, item)),
                None => {
                    return Err(Error::Configuration(format!(
                        "Invalid path specifications in file : {}",
                        name
                    )))
                }
            }
        }

        let templates = PathTemplates::compile(items)?;
        tracing::debug!(
            "Compiled {} path templates with path parameters",
            templates.len()
        );

        Ok(Self {
            location: None,
            path_count: paths.len(),
            templates: Arc::new(templates),
        })
    }

    /// File the specification was read from, when loaded from disk
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Number of paths declared by the specification
    pub fn path_count(&self) -> usize {
        self.path_count
    }

    /// Shared handle to the compiled templates
    pub fn templates(&self) -> Arc<PathTemplates> {
        Arc::clone(&self.templates)
    }
}
