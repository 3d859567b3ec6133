use async_trait::async_trait;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, instrument};

use super::serializer::JsonSerializer;
use crate::config::KafkaConfig;
use crate::model::{Change, UserId};
use crate::publisher::Publisher;
use crate::{Error, Result};

/// Publishes sanitized user events to the outbound topic.
///
/// Each call waits for the delivery report, so it returns only once the
/// broker has accepted the event under the configured `acks` level.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
    delivery_timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .set("compression.type", &config.compression)
            .set("acks", &config.acks)
            .set("linger.ms", config.linger_ms.to_string())
            .set("message.timeout.ms", config.delivery_timeout_ms.to_string())
            .create()
            .map_err(Error::Kafka)?;

        Ok(Self {
            producer,
            topic: config.outbound_topic.clone(),
            delivery_timeout: Duration::from_millis(config.delivery_timeout_ms),
        })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    #[instrument(skip_all, fields(event_id = %change.id(), topic = %self.topic))]
    async fn publish(&self, change: &Change) -> Result<()> {
        let payload = JsonSerializer::serialize(change)?;
        let key = change.user_id().map(UserId::as_str).unwrap_or_default();
        let headers = OwnedHeaders::new().insert(Header {
            key: "event_id",
            value: Some(change.id()),
        });

        let record = FutureRecord::to(&self.topic)
            .payload(&payload)
            .key(key)
            .headers(headers);

        self.producer
            .send(record, self.delivery_timeout)
            .await
            .map_err(|(e, _)| Error::Publish {
                message: format!("event {} was not accepted: {}", change.id(), e),
            })?;

        debug!("Delivery confirmed");
        Ok(())
    }
}
