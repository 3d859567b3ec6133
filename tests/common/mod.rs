#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::error::KafkaError;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use user_event_relay::model::Change;
use user_event_relay::relay::{InboundMessage, Subscription};
use user_event_relay::{Error, Publisher, Result};

pub const TOPIC: &str = "cdc.users";

/// Field values of a user, written out in either wire variant.
#[derive(Debug, Clone)]
pub struct UserFixture {
    pub id: String,
    pub first_name: String,
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl UserFixture {
    pub fn new(id: &str, first_name: &str) -> Self {
        Self {
            id: id.to_string(),
            first_name: first_name.to_string(),
            password_hash: "h1".to_string(),
            created_at: 1_697_365_800_000_000,
            updated_at: 1_697_365_800_000_000,
            deleted_at: None,
        }
    }

    pub fn password(mut self, hash: &str) -> Self {
        self.password_hash = hash.to_string();
        self
    }

    pub fn updated(mut self, micros: i64) -> Self {
        self.updated_at = micros;
        self
    }

    pub fn deleted(mut self, micros: i64) -> Self {
        self.deleted_at = Some(micros);
        self
    }

    pub fn row(&self) -> Value {
        json!({
            "id": self.id,
            "first_name": self.first_name,
            "last_name": "Doe",
            "nickname": "jd",
            "email": "joe@example.com",
            "password_hash": self.password_hash,
            "country": "UK",
            "created_at": self.created_at,
            "updated_at": self.updated_at,
            "deleted_at": self.deleted_at,
        })
    }

    pub fn document(&self) -> Value {
        let mut doc = json!({
            "_id": { "$oid": self.id },
            "first_name": self.first_name,
            "last_name": "Doe",
            "nickname": "jd",
            "email": "joe@example.com",
            "password_hash": self.password_hash,
            "country": "UK",
            "created_at": { "$date": self.created_at },
            "updated_at": { "$date": self.updated_at },
        });
        if let Some(micros) = self.deleted_at {
            doc["deleted_at"] = json!({ "$date": micros });
        }
        Value::String(doc.to_string())
    }
}

pub fn relational_envelope(
    table: &str,
    before: Option<&UserFixture>,
    after: Option<&UserFixture>,
) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "payload": {
            "op": "u",
            "source": { "schema": "public", "table": table },
            "before": before.map(UserFixture::row),
            "after": after.map(UserFixture::row),
        }
    }))
    .unwrap()
}

pub fn document_envelope(
    collection: &str,
    before: Option<&UserFixture>,
    after: Option<&UserFixture>,
) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "payload": {
            "op": "u",
            "source": { "db": "accounts", "collection": collection },
            "before": before.map(UserFixture::document),
            "after": after.map(UserFixture::document),
        }
    }))
    .unwrap()
}

pub fn message(offset: i64, payload: Vec<u8>) -> InboundMessage {
    InboundMessage::new(TOPIC, 0, offset, Some(Bytes::from(payload)))
}

/// Records published changes; fails every publish while `failing` is set.
#[derive(Default)]
pub struct MockPublisher {
    published: Mutex<Vec<Change>>,
    failing: AtomicBool,
}

impl MockPublisher {
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.failing.store(true, Ordering::SeqCst);
        publisher
    }

    pub fn published(&self) -> Vec<Change> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, change: &Change) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Publish {
                message: "broker unavailable".to_string(),
            });
        }
        self.published.lock().unwrap().push(change.clone());
        Ok(())
    }
}

/// Hands out queued messages, then signals `drained` and waits forever.
/// Every `nack` fails while `failing_nack` is set.
pub struct MockSubscription {
    queue: VecDeque<InboundMessage>,
    pub acked: Vec<String>,
    pub nacked: Vec<String>,
    drained: Arc<Notify>,
    failing_nack: bool,
}

impl MockSubscription {
    pub fn new(messages: Vec<InboundMessage>, drained: Arc<Notify>) -> Self {
        Self {
            queue: messages.into(),
            acked: Vec::new(),
            nacked: Vec::new(),
            drained,
            failing_nack: false,
        }
    }

    pub fn failing_nack(mut self) -> Self {
        self.failing_nack = true;
        self
    }
}

#[async_trait]
impl Subscription for MockSubscription {
    async fn next(&mut self) -> Result<InboundMessage> {
        match self.queue.pop_front() {
            Some(message) => Ok(message),
            None => {
                self.drained.notify_one();
                std::future::pending().await
            }
        }
    }

    async fn ack(&mut self, message: &InboundMessage) -> Result<()> {
        self.acked.push(message.id.clone());
        Ok(())
    }

    async fn nack(&mut self, message: &InboundMessage) -> Result<()> {
        if self.failing_nack {
            return Err(Error::Kafka(KafkaError::Seek("broker unavailable".to_string())));
        }
        self.nacked.push(message.id.clone());
        Ok(())
    }
}
