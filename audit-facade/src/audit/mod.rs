//! HTTP audit capture and emission
//!
//! Every audited exchange produces up to two envelopes (request, then
//! response) which are published, best effort, to the audit topic.
//!
//! # Architecture
//!
//! The middleware runs path resolution, extraction and payload assembly on
//! the request task. Emission serializes the envelope and queues it; a single
//! background dispatcher publishes queued messages in order, so auditing
//! never waits on the broker.

pub mod capture;
pub mod config;
pub mod dispatcher;
pub mod emitter;
pub mod extract;
pub mod facade;
pub mod metadata;
pub mod middleware;
pub mod payload;

pub use capture::{BodyCapture, Captured};
pub use config::AuditConfig;
pub use dispatcher::{AuditDispatcher, AuditMessage, DispatchTarget};
pub use emitter::AuditEventEmitter;
pub use facade::{AuditFacade, AuditFacadeBuilder};
pub use metadata::{AuditMetadata, Context, Correlation};
pub use middleware::{audit_middleware, AuditState};
pub use payload::{AuditEnvelope, BodyShape, PayloadAssembler};
