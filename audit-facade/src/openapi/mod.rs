//! OpenAPI specification loading
//!
//! The specification is read once at startup; its templated paths become the
//! immutable [`PathTemplates`](crate::path::PathTemplates) table used to
//! resolve path parameters for every audited request.

pub mod document;
pub mod loader;
pub mod parser;

pub use document::{OpenApiDocument, Operation, Parameter, PathItem};
pub use loader::ResourceLoader;
pub use parser::OpenApiSpecification;
