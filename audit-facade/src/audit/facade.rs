//! Audit facade wiring
//!
//! Loads the OpenAPI specification, connects the publisher, starts the
//! dispatcher and hands out the middleware state.

use axum::{middleware::from_fn_with_state, Router};
use std::sync::Arc;
use std::time::Duration;

use super::dispatcher::{AuditDispatcher, DispatchTarget};
use super::emitter::AuditEventEmitter;
use super::middleware::{audit_middleware, AuditState};
use crate::config::Config;
use crate::error::Result;
use crate::events::{AuditPublisher, TracingPublisher};
use crate::openapi::{OpenApiSpecification, ResourceLoader};
use crate::path::{OpenApiPathParameterResolver, PathParameterService, PathTemplates};

/// Builder for [`AuditFacade`]
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::load()?;
/// let audit = AuditFacade::builder(config).build().await?;
/// let app = audit.wrap(Router::new().route("/case/{id}", get(handler)));
/// ```
pub struct AuditFacadeBuilder {
    config: Config,
    publisher: Option<Arc<dyn AuditPublisher>>,
    specification: Option<OpenApiSpecification>,
}

impl AuditFacadeBuilder {
    /// Publish through the given transport instead of the configured one
    pub fn with_publisher(mut self, publisher: Arc<dyn AuditPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Use an already loaded specification instead of searching for one
    pub fn with_specification(mut self, specification: OpenApiSpecification) -> Self {
        self.specification = Some(specification);
        self
    }

    /// Load the specification and start the dispatcher
    ///
    /// Must be called within a Tokio runtime. Fails only when the
    /// specification cannot be loaded or the broker connection fails.
    pub async fn build(self) -> Result<AuditFacade> {
        let audit = self.config.audit.clone();

        let templates = match self.specification {
            Some(specification) => specification.templates(),
            None if audit.enabled => {
                let loader = ResourceLoader::new(audit.spec_search_roots.clone());
                let pattern = Some(audit.openapi_rest_spec.as_str()).filter(|p| !p.trim().is_empty());
                let specification = OpenApiSpecification::load(&loader, pattern)?;
                tracing::info!(
                    location = ?specification.location(),
                    paths = specification.path_count(),
                    "OpenAPI specification loaded for audit"
                );
                specification.templates()
            }
            None => {
                tracing::info!("Auditing disabled");
                Arc::new(PathTemplates::default())
            }
        };

        let publisher = match self.publisher {
            Some(publisher) => publisher,
            None => default_publisher(&self.config).await?,
        };

        let resolver: Arc<dyn PathParameterService> =
            Arc::new(OpenApiPathParameterResolver::new(templates));

        let (emitter, dispatcher) = AuditEventEmitter::spawn(
            audit.channel_capacity,
            DispatchTarget {
                publisher,
                topic: audit.topic.clone(),
                event_name_attribute: audit.event_name_attribute.clone(),
            },
        );

        let state = AuditState::new(audit, &self.config.service.context_path, resolver, emitter);

        Ok(AuditFacade { state, dispatcher })
    }
}

#[cfg(feature = "events")]
async fn default_publisher(config: &Config) -> Result<Arc<dyn AuditPublisher>> {
    match &config.nats {
        Some(nats) => Ok(Arc::new(crate::events::NatsPublisher::connect(nats).await?)),
        None => {
            tracing::warn!("No NATS configuration, audit messages will only be logged");
            Ok(Arc::new(TracingPublisher))
        }
    }
}

#[cfg(not(feature = "events"))]
async fn default_publisher(config: &Config) -> Result<Arc<dyn AuditPublisher>> {
    if config.nats.is_some() {
        tracing::warn!("NATS configured but the `events` feature is disabled, audit messages will only be logged");
    }
    Ok(Arc::new(TracingPublisher))
}

/// A running audit pipeline
pub struct AuditFacade {
    state: AuditState,
    dispatcher: AuditDispatcher,
}

impl AuditFacade {
    pub fn builder(config: Config) -> AuditFacadeBuilder {
        AuditFacadeBuilder {
            config,
            publisher: None,
            specification: None,
        }
    }

    /// State for `from_fn_with_state(state, audit_middleware)`
    pub fn state(&self) -> AuditState {
        self.state.clone()
    }

    /// Apply the audit middleware to every route of `router`
    pub fn wrap(&self, router: Router) -> Router {
        router.layer(from_fn_with_state(self.state(), audit_middleware))
    }

    /// Stop dispatching, publishing what is already queued
    pub async fn shutdown(self, timeout: Duration) {
        drop(self.state);
        self.dispatcher.shutdown(timeout).await;
    }
}
