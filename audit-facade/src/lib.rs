//! # audit-facade
//!
//! OpenAPI-aware HTTP audit middleware for axum services.
//!
//! Every audited request produces a JSON audit envelope (and a second one for
//! a non-blank response) which is published, fire-and-forget, to the audit
//! topic `jms.topic.auditing.event`.
//!
//! ## Features
//!
//! - **Path parameters**: templated paths from the service's OpenAPI document
//!   are compiled once at startup and used to recover named path parameters
//! - **Schema tolerant**: object bodies are merged with query/path parameters;
//!   arrays, scalars and non-JSON bodies are wrapped under `_payload`
//! - **Correlation**: user and client correlation ids are lifted from headers
//! - **Non-blocking**: envelopes are queued and published by a background task
//! - **Transport**: NATS with the `events` feature, otherwise the log
//!
//! ## Example
//!
//! ```rust,no_run
//! use audit_facade::prelude::*;
//! use axum::{routing::get, Router};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let audit = AuditFacade::builder(config).build().await?;
//!     let app = audit.wrap(Router::new().route("/case/{id}/details", get(|| async { "{}" })));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!
//!     audit.shutdown(std::time::Duration::from_secs(5)).await;
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod events;
pub mod observability;
pub mod openapi;
pub mod path;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::audit::{
        audit_middleware, AuditConfig, AuditEnvelope, AuditEventEmitter, AuditFacade,
        AuditFacadeBuilder, AuditMetadata, AuditState, BodyShape, PayloadAssembler,
    };
    pub use crate::config::{Config, NatsConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::events::{AuditPublisher, TracingPublisher};
    pub use crate::observability::init_tracing;
    pub use crate::openapi::{OpenApiSpecification, ResourceLoader};
    pub use crate::path::{
        OpenApiPathParameterResolver, PathParameterService, PathParameterSet, PathTemplate,
        PathTemplates,
    };

    #[cfg(feature = "events")]
    pub use crate::events::NatsPublisher;
}
