//! Async RabbitMQ publisher for verified webhooks.
//!
//! The publisher keeps one connection and channel and reconnects lazily when
//! the channel drops. Message bodies are the verified request bytes, unchanged.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use lapin::{
    options::{BasicPublishOptions, QueueDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{VerifiedEvent, VERIFIED_QUEUE};
use super::EventSink;

/// RabbitMQ publisher with connection management.
#[derive(Clone)]
pub struct QueuePublisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    connection: RwLock<Option<Connection>>,
    channel: RwLock<Option<Channel>>,
}

impl QueuePublisher {
    /// Create a new publisher. No connection is made until the first publish.
    pub fn new(url: String) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url,
                connection: RwLock::new(None),
                channel: RwLock::new(None),
            }),
        }
    }

    /// Ensure we have a valid connection and channel.
    async fn ensure_connected(&self) -> Result<Channel> {
        if let Some(ch) = live_channel(&*self.inner.channel.read().await) {
            return Ok(ch);
        }

        // Lock order is connection, then channel, here and in `close`.
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        // Another publish may have reconnected while we waited.
        if let Some(ch) = live_channel(&channel) {
            return Ok(ch);
        }

        info!("rabbitmq_publisher_connecting");

        let conn = Connection::connect(&self.inner.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to RabbitMQ")?;

        let ch = conn
            .create_channel()
            .await
            .context("Failed to create channel")?;

        ch.queue_declare(
            VERIFIED_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .context("Failed to declare verified queue")?;

        info!(queue = VERIFIED_QUEUE, "rabbitmq_publisher_connected");

        *connection = Some(conn);
        *channel = Some(ch.clone());

        Ok(ch)
    }

    /// Publish the raw body of a verified event.
    pub async fn publish(&self, event: &VerifiedEvent) -> Result<()> {
        let channel = self.ensure_connected().await?;

        let properties = BasicProperties::default()
            .with_delivery_mode(2) // Persistent
            .with_content_type(
                event
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .into(),
            )
            .with_kind(event.source.as_str().into())
            .with_app_id("hookcheck".into());

        channel
            .basic_publish(
                "",
                VERIFIED_QUEUE,
                BasicPublishOptions::default(),
                &event.body,
                properties,
            )
            .await
            .context("Failed to publish to verified queue")?
            .await
            .context("Failed to confirm publish")?;

        info!(
            queue = VERIFIED_QUEUE,
            source = %event.source,
            body_length = event.body.len(),
            "rabbitmq_verified_published"
        );

        Ok(())
    }

    /// Close the connection gracefully.
    pub async fn close(&self) {
        // Same order as `ensure_connected`.
        let mut connection = self.inner.connection.write().await;
        let mut channel = self.inner.channel.write().await;

        if let Some(ch) = channel.take() {
            if let Err(e) = ch.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_channel_close_error");
            }
        }

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

/// The cached channel, if it is still open.
fn live_channel(channel: &Option<Channel>) -> Option<Channel> {
    channel.as_ref().filter(|ch| ch.status().connected()).cloned()
}

impl EventSink for QueuePublisher {
    fn deliver(&self, event: VerifiedEvent) -> BoxFuture<'static, Result<()>> {
        let publisher = self.clone();
        Box::pin(async move { publisher.publish(&event).await })
    }
}
