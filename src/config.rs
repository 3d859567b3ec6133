use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::decoder::SourceVariant;
use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub group_id: String,
    /// Topic the replication connector writes raw change envelopes to.
    pub inbound_topic: String,
    /// Public topic receiving sanitized user events.
    pub outbound_topic: String,
    #[serde(default = "default_acks")]
    pub acks: String,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default = "default_linger_ms")]
    pub linger_ms: u32,
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    #[serde(default)]
    pub create_topics: bool,
    #[serde(default = "default_topic_partitions")]
    pub topic_partitions: i32,
    #[serde(default = "default_topic_replication_factor")]
    pub topic_replication_factor: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Wire variant of the inbound envelopes.
    #[serde(default)]
    pub source: SourceVariant,
    /// Table or collection name whose changes are relayed.
    #[serde(default = "default_entity")]
    pub entity: String,
    /// Number of consumers started in the same group.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_redelivery_delay_ms")]
    pub redelivery_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            source: SourceVariant::default(),
            entity: default_entity(),
            workers: default_workers(),
            redelivery_delay_ms: default_redelivery_delay_ms(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("USER_EVENT_RELAY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.kafka.brokers.iter().all(|b| b.trim().is_empty()) {
            return Err(Error::Config("kafka.brokers must not be empty".to_string()));
        }
        for (name, value) in [
            ("kafka.group_id", &self.kafka.group_id),
            ("kafka.inbound_topic", &self.kafka.inbound_topic),
            ("kafka.outbound_topic", &self.kafka.outbound_topic),
            ("relay.entity", &self.relay.entity),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", name)));
            }
        }
        if self.relay.workers == 0 {
            return Err(Error::Config("relay.workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl KafkaConfig {
    /// Broker list in the form librdkafka expects for `bootstrap.servers`.
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

fn default_acks() -> String {
    "all".to_string()
}

fn default_compression() -> String {
    "snappy".to_string()
}

fn default_linger_ms() -> u32 {
    5
}

fn default_delivery_timeout_ms() -> u64 {
    30_000
}

fn default_session_timeout_ms() -> u64 {
    10_000
}

fn default_topic_partitions() -> i32 {
    3
}

fn default_topic_replication_factor() -> i32 {
    1
}

fn default_entity() -> String {
    "users".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_redelivery_delay_ms() -> u64 {
    1000
}
