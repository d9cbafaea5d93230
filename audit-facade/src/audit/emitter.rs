//! Audit event emission
//!
//! `emit` never blocks and never fails: the envelope is serialized on the
//! calling task and queued for the dispatcher. A full or closed queue drops
//! the event.

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::dispatcher::{AuditDispatcher, AuditMessage, DispatchTarget};
use super::payload::AuditEnvelope;
use crate::error::Result;

/// Fire-and-forget handle for publishing audit envelopes
#[derive(Debug, Clone)]
pub struct AuditEventEmitter {
    sender: mpsc::Sender<AuditMessage>,
}

impl AuditEventEmitter {
    /// Wrap the sending half of an emission queue
    pub fn new(sender: mpsc::Sender<AuditMessage>) -> Self {
        Self { sender }
    }

    /// Create an emitter and spawn the dispatcher draining it
    pub fn spawn(capacity: usize, target: DispatchTarget) -> (Self, AuditDispatcher) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let dispatcher = AuditDispatcher::spawn(receiver, target);
        (Self::new(sender), dispatcher)
    }

    /// Serialize and queue an envelope for publication
    ///
    /// A missing envelope is logged and ignored.
    pub fn emit(&self, envelope: Option<AuditEnvelope>) {
        let Some(envelope) = envelope else {
            tracing::warn!("No audit envelope to emit");
            return;
        };

        let event_id = envelope.metadata.id.map(|id| id.to_string());

        let body = match to_wire(&envelope) {
            Ok(body) => body,
            Err(e) => {
                match &event_id {
                    Some(id) => tracing::error!(event_id = %id, error = %e, "Failed to serialize audit message"),
                    None => tracing::error!(error = %e, "Failed to serialize audit message"),
                }
                return;
            }
        };

        tracing::info!(
            event_id = event_id.as_deref().unwrap_or("<none>"),
            timestamp = %envelope.timestamp,
            "Posting audit message"
        );

        let message = AuditMessage {
            event_id,
            event_name: envelope.metadata.name,
            body,
        };

        match self.sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                tracing::warn!(
                    event_id = message.event_id.as_deref().unwrap_or("<none>"),
                    "Audit queue full, dropping audit message"
                );
            }
            Err(TrySendError::Closed(message)) => {
                tracing::warn!(
                    event_id = message.event_id.as_deref().unwrap_or("<none>"),
                    "Audit dispatcher stopped, dropping audit message"
                );
            }
        }
    }
}

/// Serialize a message body for the wire
fn to_wire<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
