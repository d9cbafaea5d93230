//! Background audit dispatch
//!
//! A single task drains the emission queue and hands each message to the
//! publisher, one at a time, in the order they were queued. Publish failures
//! are logged and the message is dropped.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::AuditPublisher;

/// A serialized envelope waiting to be published
#[derive(Debug, Clone)]
pub struct AuditMessage {
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub body: String,
}

/// Handle to the running dispatch task
#[derive(Debug)]
pub struct AuditDispatcher {
    cancellation_token: CancellationToken,
    join_handle: Option<JoinHandle<()>>,
}

/// Where and how messages are published
#[derive(Clone)]
pub struct DispatchTarget {
    pub publisher: Arc<dyn AuditPublisher>,
    pub topic: String,
    pub event_name_attribute: String,
}

impl AuditDispatcher {
    /// Spawn the dispatch task on the current runtime
    pub fn spawn(receiver: mpsc::Receiver<AuditMessage>, target: DispatchTarget) -> Self {
        let cancellation_token = CancellationToken::new();
        let token = cancellation_token.clone();

        let join_handle = tokio::spawn(async move {
            run(receiver, target, token).await;
        });

        Self {
            cancellation_token,
            join_handle: Some(join_handle),
        }
    }

    /// Token that stops the task when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Stop the task, publishing anything already queued
    ///
    /// Waits at most `timeout` for the queue to drain.
    pub async fn shutdown(mut self, timeout: Duration) {
        self.cancellation_token.cancel();

        if let Some(handle) = self.join_handle.take() {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => tracing::debug!("Audit dispatcher stopped"),
                Ok(Err(e)) => tracing::warn!(error = %e, "Audit dispatcher panicked"),
                Err(_) => tracing::warn!("Audit dispatcher shutdown timed out"),
            }
        }
    }
}

async fn run(
    mut receiver: mpsc::Receiver<AuditMessage>,
    target: DispatchTarget,
    token: CancellationToken,
) {
    tracing::debug!(topic = %target.topic, "Audit dispatcher started");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                receiver.close();
                while let Some(message) = receiver.recv().await {
                    publish(&target, message).await;
                }
                break;
            }
            message = receiver.recv() => match message {
                Some(message) => publish(&target, message).await,
                None => break,
            },
        }
    }

    tracing::debug!("Audit dispatcher finished");
}

async fn publish(target: &DispatchTarget, message: AuditMessage) {
    tracing::debug!(
        event_name = message.event_name.as_deref().unwrap_or("<none>"),
        topic = %target.topic,
        "Publishing audit message"
    );

    let mut attributes = BTreeMap::new();
    if let Some(event_name) = message.event_name {
        attributes.insert(target.event_name_attribute.clone(), event_name);
    }

    if let Err(e) = target
        .publisher
        .publish(&target.topic, message.body, attributes)
        .await
    {
        match message.event_id {
            Some(id) => tracing::error!(event_id = %id, error = %e, "Failed to post audit message"),
            None => tracing::error!(error = %e, "Failed to post audit message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testing::RecordingPublisher;

    fn target(publisher: RecordingPublisher) -> DispatchTarget {
        DispatchTarget {
            publisher: Arc::new(publisher),
            topic: "jms.topic.auditing.event".to_string(),
            event_name_attribute: "CPPNAME".to_string(),
        }
    }

    fn message(n: usize) -> AuditMessage {
        AuditMessage {
            event_id: Some(n.to_string()),
            event_name: Some("audit.events.audit-recorded".to_string()),
            body: format!("{{\"n\":{}}}", n),
        }
    }

    #[tokio::test]
    async fn test_publishes_in_queue_order() {
        let recorder = RecordingPublisher::default();
        let (tx, rx) = mpsc::channel(16);
        let dispatcher = AuditDispatcher::spawn(rx, target(recorder.clone()));

        for n in 0..5 {
            tx.try_send(message(n)).unwrap();
        }
        drop(tx);
        dispatcher.shutdown(Duration::from_secs(5)).await;

        let messages = recorder.messages();
        assert_eq!(messages.len(), 5);
        for (n, published) in messages.iter().enumerate() {
            assert_eq!(published.json()["n"], n);
            assert_eq!(published.topic, "jms.topic.auditing.event");
            assert_eq!(
                published.attributes.get("CPPNAME").map(String::as_str),
                Some("audit.events.audit-recorded")
            );
        }
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_dispatch() {
        let recorder = RecordingPublisher::failing();
        let (tx, rx) = mpsc::channel(16);
        let dispatcher = AuditDispatcher::spawn(rx, target(recorder.clone()));

        tx.try_send(message(1)).unwrap();
        tx.try_send(message(2)).unwrap();
        drop(tx);
        dispatcher.shutdown(Duration::from_secs(5)).await;

        assert_eq!(recorder.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue_while_senders_alive() {
        let recorder = RecordingPublisher::default();
        let (tx, rx) = mpsc::channel(16);
        let dispatcher = AuditDispatcher::spawn(rx, target(recorder.clone()));

        tx.try_send(message(1)).unwrap();
        dispatcher.shutdown(Duration::from_secs(5)).await;

        assert_eq!(recorder.messages().len(), 1);
        assert!(tx.try_send(message(2)).is_err());
    }

    #[tokio::test]
    async fn test_missing_event_name_omits_attribute() {
        let recorder = RecordingPublisher::default();
        let (tx, rx) = mpsc::channel(4);
        let dispatcher = AuditDispatcher::spawn(rx, target(recorder.clone()));

        tx.try_send(AuditMessage {
            event_id: None,
            event_name: None,
            body: "{}".to_string(),
        })
        .unwrap();
        drop(tx);
        dispatcher.shutdown(Duration::from_secs(5)).await;

        assert!(recorder.messages()[0].attributes.is_empty());
    }
}
