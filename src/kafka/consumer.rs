use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::BorrowedMessage;
use rdkafka::{ClientConfig, Message, Offset, TopicPartitionList};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::KafkaConfig;
use crate::relay::{InboundMessage, Subscription};
use crate::{Error, Result};

const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// Consumer-group subscription to the raw change topic.
///
/// Offsets are committed only on acknowledgement. A negative acknowledgement
/// rewinds the partition to the rejected message so it is fetched again.
pub struct KafkaSubscription {
    consumer: StreamConsumer,
    redelivery_delay: Duration,
}

impl KafkaSubscription {
    pub fn new(config: &KafkaConfig, redelivery_delay: Duration) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .create()
            .map_err(Error::Kafka)?;

        consumer.subscribe(&[config.inbound_topic.as_str()])?;
        info!(topic = %config.inbound_topic, group = %config.group_id, "Subscribed to change topic");

        Ok(Self {
            consumer,
            redelivery_delay,
        })
    }
}

impl From<&BorrowedMessage<'_>> for InboundMessage {
    fn from(msg: &BorrowedMessage<'_>) -> Self {
        InboundMessage::new(
            msg.topic(),
            msg.partition(),
            msg.offset(),
            msg.payload().map(Bytes::copy_from_slice),
        )
    }
}

#[async_trait]
impl Subscription for KafkaSubscription {
    async fn next(&mut self) -> Result<InboundMessage> {
        let msg = self.consumer.recv().await?;
        Ok(InboundMessage::from(&msg))
    }

    async fn ack(&mut self, message: &InboundMessage) -> Result<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )?;
        self.consumer.commit(&tpl, CommitMode::Async)?;
        debug!(event_id = %message.id, "Committed offset");
        Ok(())
    }

    async fn nack(&mut self, message: &InboundMessage) -> Result<()> {
        tokio::time::sleep(self.redelivery_delay).await;
        self.consumer.seek(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset),
            SEEK_TIMEOUT,
        )?;
        debug!(event_id = %message.id, "Rewound partition for redelivery");
        Ok(())
    }
}
