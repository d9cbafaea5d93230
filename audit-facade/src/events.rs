//! Audit message transport
//!
//! Audit envelopes leave the process through an [`AuditPublisher`]: a single
//! one-way `publish` call taking a topic, a serialized body and free-form
//! string attributes. The NATS publisher is the production transport; the
//! tracing publisher is used when no broker is configured.

use async_trait::async_trait;
use std::collections::BTreeMap;

#[cfg(feature = "events")]
use async_nats::Client;
#[cfg(feature = "events")]
use std::time::Duration;

#[cfg(feature = "events")]
use crate::config::NatsConfig;
use crate::error::Result;
#[cfg(feature = "events")]
use crate::error::Error;

/// One-way message transport
#[async_trait]
pub trait AuditPublisher: Send + Sync {
    /// Publish `body` to `topic`, tagged with `attributes`
    async fn publish(
        &self,
        topic: &str,
        body: String,
        attributes: BTreeMap<String, String>,
    ) -> Result<()>;
}

/// Publisher that writes audit messages to the log
#[derive(Debug, Clone, Default)]
pub struct TracingPublisher;

#[async_trait]
impl AuditPublisher for TracingPublisher {
    async fn publish(
        &self,
        topic: &str,
        body: String,
        attributes: BTreeMap<String, String>,
    ) -> Result<()> {
        tracing::info!(
            target: "audit",
            topic = %topic,
            attributes = ?attributes,
            body = %body,
            "audit message"
        );
        Ok(())
    }
}

/// Publisher backed by a NATS connection
///
/// The topic is used as the subject; attributes become message headers.
#[cfg(feature = "events")]
#[derive(Debug, Clone)]
pub struct NatsPublisher {
    client: Client,
}

#[cfg(feature = "events")]
impl NatsPublisher {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the given configuration
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        Ok(Self::new(create_client(config).await?))
    }
}

#[cfg(feature = "events")]
#[async_trait]
impl AuditPublisher for NatsPublisher {
    async fn publish(
        &self,
        topic: &str,
        body: String,
        attributes: BTreeMap<String, String>,
    ) -> Result<()> {
        let mut headers = async_nats::HeaderMap::new();
        for (name, value) in &attributes {
            headers.insert(name.as_str(), value.as_str());
        }

        self.client
            .publish_with_headers(topic.to_string(), headers, body.into_bytes().into())
            .await
            .map_err(|e| Error::Nats(format!("Failed to publish to {}: {}", topic, e)))?;

        Ok(())
    }
}

/// Create a NATS client, retrying with exponential backoff
#[cfg(feature = "events")]
pub(crate) async fn create_client(config: &NatsConfig) -> Result<Client> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_client(config).await {
            Ok(client) => {
                if attempt > 0 {
                    tracing::info!(
                        "NATS connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!("NATS client connected to {}", config.url);
                }
                return Ok(client);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        "Failed to connect to NATS after {} attempts: {}",
                        config.max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));
                tracing::warn!(
                    "NATS connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(feature = "events")]
async fn try_create_client(config: &NatsConfig) -> Result<Client> {
    let mut opts = async_nats::ConnectOptions::new();

    if let Some(name) = &config.name {
        opts = opts.name(name);
    }

    opts = opts.max_reconnects(Some(config.max_reconnects));

    opts.connect(&config.url).await.map_err(|e| {
        Error::Nats(format!(
            "Failed to connect to NATS server at '{}' (client name: {}): {}",
            config.url,
            config.name.as_deref().unwrap_or("<none>"),
            e
        ))
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A message captured by [`RecordingPublisher`]
    #[derive(Debug, Clone)]
    pub struct PublishedMessage {
        pub topic: String,
        pub body: String,
        pub attributes: BTreeMap<String, String>,
    }

    impl PublishedMessage {
        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    /// In-memory publisher for assertions
    #[derive(Debug, Clone, Default)]
    pub struct RecordingPublisher {
        messages: Arc<Mutex<Vec<PublishedMessage>>>,
        fail: bool,
    }

    impl RecordingPublisher {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn messages(&self) -> Vec<PublishedMessage> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuditPublisher for RecordingPublisher {
        async fn publish(
            &self,
            topic: &str,
            body: String,
            attributes: BTreeMap<String, String>,
        ) -> Result<()> {
            self.messages.lock().unwrap().push(PublishedMessage {
                topic: topic.to_string(),
                body,
                attributes,
            });
            if self.fail {
                return Err(crate::error::Error::Nats("broker unavailable".to_string()));
            }
            Ok(())
        }
    }
}
