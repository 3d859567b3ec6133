use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{info, instrument};

use crate::config::KafkaConfig;
use crate::{Error, Result};

/// Creates the outbound topic at start-up when it does not exist yet.
pub struct TopicManager {
    admin_client: AdminClient<DefaultClientContext>,
    partitions: i32,
    replication_factor: i32,
}

impl TopicManager {
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let admin_client: AdminClient<_> = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .create()
            .map_err(Error::Kafka)?;

        Ok(Self {
            admin_client,
            partitions: config.topic_partitions,
            replication_factor: config.topic_replication_factor,
        })
    }

    #[instrument(skip(self))]
    pub async fn ensure_topic_exists(&self, topic_name: &str) -> Result<()> {
        if self.topic_exists(topic_name)? {
            info!("Topic '{}' already exists", topic_name);
            return Ok(());
        }

        info!("Creating topic '{}'", topic_name);
        self.create_topic(topic_name).await
    }

    fn topic_exists(&self, topic_name: &str) -> Result<bool> {
        let metadata = self
            .admin_client
            .inner()
            .fetch_metadata(Some(topic_name), Duration::from_secs(5))
            .map_err(Error::Kafka)?;

        // auto-created metadata entries carry an error and no partitions
        Ok(metadata
            .topics()
            .iter()
            .any(|topic| topic.name() == topic_name && topic.error().is_none()))
    }

    async fn create_topic(&self, topic_name: &str) -> Result<()> {
        let new_topic = NewTopic::new(
            topic_name,
            self.partitions,
            TopicReplication::Fixed(self.replication_factor),
        )
        .set("cleanup.policy", "delete");

        let opts = AdminOptions::new().operation_timeout(Some(Duration::from_secs(30)));

        let results = self
            .admin_client
            .create_topics(&[new_topic], &opts)
            .await
            .map_err(Error::Kafka)?;

        for result in results {
            match result {
                Ok(topic) => info!("Successfully created topic: {}", topic),
                Err((_topic, rdkafka::types::RDKafkaErrorCode::TopicAlreadyExists)) => {
                    info!("Topic '{}' was created concurrently", topic_name)
                }
                Err((_topic, error)) => {
                    return Err(Error::Kafka(rdkafka::error::KafkaError::AdminOp(error)));
                }
            }
        }

        Ok(())
    }
}
