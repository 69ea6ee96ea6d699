use std::time::Duration;

use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
    Consumer,
};
use serde::Serialize;

use crate::types::Event;

pub const EXCHANGE_NAME: &str = "feed.events";

const CONSUMER_PREFETCH: u16 = 16;

#[derive(Clone)]
pub struct RabbitMQClient {
    channel: Channel,
}

impl RabbitMQClient {
    pub async fn connect(url: &str) -> Result<Self, lapin::Error> {
        let conn = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;

        channel
            .exchange_declare(
                EXCHANGE_NAME,
                lapin::ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        tracing::info!(exchange = EXCHANGE_NAME, "connected to RabbitMQ");
        Ok(Self { channel })
    }

    /// Retries `connect` with a fixed delay; the broker often comes up after the services.
    pub async fn connect_with_retry(url: &str, attempts: u32, delay: Duration) -> Result<Self, lapin::Error> {
        let mut attempt = 1;
        loop {
            match Self::connect(url).await {
                Ok(client) => return Ok(client),
                Err(e) if attempt < attempts => {
                    tracing::warn!(error = %e, attempt, "RabbitMQ not reachable, retrying");
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.channel.status().connected()
    }

    /// Publish an event with a routing key
    pub async fn publish<T: Serialize>(
        &self,
        routing_key: &str,
        event: &Event<T>,
    ) -> Result<(), lapin::Error> {
        let payload = encode_event(event).map_err(|e| {
            tracing::error!(error = %e, "failed to serialize event");
            lapin::Error::IOError(std::sync::Arc::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e,
            )))
        })?;

        self.channel
            .basic_publish(
                EXCHANGE_NAME,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_message_id(event.id.to_string().into())
                    .with_delivery_mode(2), // persistent
            )
            .await?
            .await?;

        tracing::debug!(
            routing_key = %routing_key,
            event_id = %event.id,
            "event published"
        );

        Ok(())
    }

    /// Declare a durable queue, bind it to routing keys and start consuming
    pub async fn subscribe(
        &self,
        queue_name: &str,
        routing_keys: &[&str],
    ) -> Result<Consumer, lapin::Error> {
        self.channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        for key in routing_keys {
            self.channel
                .queue_bind(
                    queue_name,
                    EXCHANGE_NAME,
                    key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
        }

        self.channel
            .basic_qos(CONSUMER_PREFETCH, BasicQosOptions::default())
            .await?;

        let consumer = self.channel
            .basic_consume(
                queue_name,
                &format!("{queue_name}-consumer"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!(
            queue = %queue_name,
            bindings = ?routing_keys,
            "subscribed to RabbitMQ queue"
        );

        Ok(consumer)
    }
}

pub fn encode_event<T: Serialize>(event: &Event<T>) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::event::{payloads, routing_keys};
    use uuid::Uuid;

    #[test]
    fn encoded_event_is_json_envelope() {
        let event = Event::new(
            "feed-social",
            routing_keys::SOCIAL_POST_CREATED,
            payloads::PostCreated { post_id: Uuid::new_v4(), author_id: Uuid::new_v4(), has_image: false },
        );
        let bytes = encode_event(&event).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["source"], "feed-social");
        assert_eq!(value["data"]["has_image"], false);
    }
}
