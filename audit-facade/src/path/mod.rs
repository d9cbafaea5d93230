//! OpenAPI path templates and request path parameter resolution

pub mod resolver;
pub mod template;

pub use resolver::{resolve, OpenApiPathParameterResolver, PathParameterService, PathParameterSet};
pub use template::{extract_parameter_names, PathTemplate, PathTemplates};
