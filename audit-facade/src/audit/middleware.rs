//! Audit middleware for HTTP request/response capture
//!
//! Request and response bodies stream through to their consumers while the
//! first `body_capture_limit` bytes of each are kept for auditing. The request
//! envelope is queued once the handler returns, the response envelope once
//! the response body has been read to its end. The caller always receives the
//! downstream response unchanged, including any body errors.

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::capture::BodyCapture;
use super::config::AuditConfig;
use super::emitter::AuditEventEmitter;
use super::extract;
use super::payload::PayloadAssembler;
use crate::path::PathParameterService;

/// Shared state for [`audit_middleware`]
#[derive(Clone)]
pub struct AuditState {
    config: Arc<AuditConfig>,
    context_path: Arc<str>,
    resolver: Arc<dyn PathParameterService>,
    assembler: Arc<PayloadAssembler>,
    emitter: AuditEventEmitter,
}

impl AuditState {
    pub fn new(
        config: AuditConfig,
        context_path: &str,
        resolver: Arc<dyn PathParameterService>,
        emitter: AuditEventEmitter,
    ) -> Self {
        let assembler = PayloadAssembler::new(context_path, Some(config.event_name.clone()));
        Self {
            config: Arc::new(config),
            context_path: Arc::from(context_path),
            resolver,
            assembler: Arc::new(assembler),
            emitter,
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn emitter(&self) -> &AuditEventEmitter {
        &self.emitter
    }

    fn should_audit(&self, path: &str) -> bool {
        self.config.enabled && !self.config.is_excluded(path)
    }
}

/// Audit middleware function
///
/// Apply with `axum::middleware::from_fn_with_state(state, audit_middleware)`.
/// Requests to excluded routes pass straight through. A request whose body
/// fails mid-stream is not audited; the handler sees the error as it would
/// without this middleware.
pub async fn audit_middleware(
    State(state): State<AuditState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.should_audit(request.uri().path()) {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let request_headers = parts.headers.clone();
    let headers = extract::headers(&parts.headers);
    let query_params = extract::query_params(&parts.uri);
    let request_path = extract::request_path(parts.uri.path(), &state.context_path).to_string();

    let request_capture = BodyCapture::new(state.config.body_capture_limit);
    let body = request_capture.wrap(body);
    let response = next.run(Request::from_parts(parts, body)).await;

    let captured = request_capture.snapshot();
    if captured.failed {
        tracing::warn!(path = %request_path, "Request body failed mid-stream, skipping audit");
        return response;
    }
    if captured.truncated() {
        tracing::debug!(
            path = %request_path,
            total = captured.total,
            kept = captured.bytes.len(),
            "Request body truncated for audit"
        );
    }

    let request_body = extract::decode_body(&captured.bytes, &request_headers);
    let path_params = state.resolver.path_parameters(Some(&request_path));
    let request_envelope =
        state
            .assembler
            .assemble(&request_body, &headers, &query_params, &path_params);
    state.emitter.emit(Some(request_envelope));

    let (parts, body) = response.into_parts();
    let response_headers = parts.headers.clone();
    let assembler = Arc::clone(&state.assembler);
    let emitter = state.emitter.clone();
    let body = BodyCapture::new(state.config.body_capture_limit).wrap_with(body, move |captured| {
        let response_body = extract::decode_body(&captured.bytes, &response_headers);
        if response_body.trim().is_empty() {
            return;
        }
        let no_params = Default::default();
        let response_envelope =
            assembler.assemble(&response_body, &headers, &no_params, &no_params);
        emitter.emit(Some(response_envelope));
    });

    Response::from_parts(parts, body)
}
