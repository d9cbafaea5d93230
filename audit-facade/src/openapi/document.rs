//! Minimal OpenAPI document model
//!
//! Only what path parameter resolution needs: the `paths` object, and the
//! `name`/`in` of every parameter declared on a path item or its operations.
//! Unknown fields are ignored.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Parsed OpenAPI (or Swagger-style) document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiDocument {
    /// Declared `openapi` version, if any
    #[serde(default)]
    pub openapi: Option<String>,

    /// Path templates mapped to their items
    ///
    /// A `null` item is kept as `None` so the parser can reject it.
    #[serde(default)]
    pub paths: Option<BTreeMap<String, Option<PathItem>>>,
}

/// A single path item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default)]
    pub get: Option<Operation>,
    #[serde(default)]
    pub put: Option<Operation>,
    #[serde(default)]
    pub post: Option<Operation>,
    #[serde(default)]
    pub delete: Option<Operation>,
    #[serde(default)]
    pub options: Option<Operation>,
    #[serde(default)]
    pub head: Option<Operation>,
    #[serde(default)]
    pub patch: Option<Operation>,
    #[serde(default)]
    pub trace: Option<Operation>,
}

/// An operation on a path item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub parameters: Option<Vec<Parameter>>,
}

/// A declared parameter
///
/// `$ref` parameters deserialize with both fields absent and never count as
/// path parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "in")]
    pub location: Option<String>,
}

impl Parameter {
    /// Whether this parameter lives in the path
    pub fn is_path(&self) -> bool {
        self.location
            .as_deref()
            .is_some_and(|location| location.eq_ignore_ascii_case("path"))
    }
}

impl PathItem {
    fn operations(&self) -> impl Iterator<Item = &Operation> {
        [
            &self.get,
            &self.put,
            &self.post,
            &self.delete,
            &self.options,
            &self.head,
            &self.patch,
            &self.trace,
        ]
        .into_iter()
        .flatten()
    }

    /// Whether the item, or any of its operations, declares a path parameter
    pub fn declares_path_parameters(&self) -> bool {
        let item_level = self
            .parameters
            .iter()
            .flatten()
            .any(Parameter::is_path);

        item_level
            || self
                .operations()
                .flat_map(|op| op.parameters.iter().flatten())
                .any(Parameter::is_path)
    }
}
