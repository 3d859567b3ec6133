//! The consume loop driving decode, sanitize and publish for every inbound
//! message, and settling each one with the broker.
//!
//! Each message is handled independently: nothing is shared between two
//! invocations of [`Relay::handle`] besides the publisher, so one relay can
//! serve several subscriptions at once. Failed messages are settled with a
//! negative acknowledgement and left to broker redelivery; the loop only
//! stops when that rejection itself fails.

use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::decoder::{Decoded, EnvelopeDecoder, SourceDescriptor};
use crate::informer::{sanitize, Verdict};
use crate::model::{ChangeKind, UserId};
use crate::publisher::Publisher;
use crate::Result;

const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// A raw message as delivered by the inbound subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Broker message identifier, reused as the outbound event id.
    pub id: String,
    /// `None` for tombstones.
    pub payload: Option<Bytes>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl InboundMessage {
    pub fn new(topic: &str, partition: i32, offset: i64, payload: Option<Bytes>) -> Self {
        Self {
            id: format!("{}-{}-{}", topic, partition, offset),
            payload,
            topic: topic.to_string(),
            partition,
            offset,
        }
    }
}

/// Inbound side of the relay.
#[async_trait]
pub trait Subscription: Send {
    /// Waits for the next message.
    async fn next(&mut self) -> Result<InboundMessage>;

    /// Marks the message as consumed for good.
    async fn ack(&mut self, message: &InboundMessage) -> Result<()>;

    /// Makes the message eligible for redelivery.
    async fn nack(&mut self, message: &InboundMessage) -> Result<()>;
}

/// How a message is settled with the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Nack,
}

/// Terminal state of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Tombstone with no payload.
    Tombstone,
    /// Change of an unrelated table or collection.
    Ignored(SourceDescriptor),
    /// Malformed envelope.
    DecodeFailed,
    /// Nothing externally visible changed.
    Suppressed,
    Published(ChangeKind),
    PublishFailed,
}

impl Outcome {
    pub fn disposition(&self) -> Disposition {
        match self {
            Outcome::DecodeFailed | Outcome::PublishFailed => Disposition::Nack,
            Outcome::Tombstone
            | Outcome::Ignored(_)
            | Outcome::Suppressed
            | Outcome::Published(_) => Disposition::Ack,
        }
    }
}

pub struct Relay<P> {
    decoder: Box<dyn EnvelopeDecoder>,
    publisher: P,
}

impl<P: Publisher> Relay<P> {
    pub fn new(decoder: Box<dyn EnvelopeDecoder>, publisher: P) -> Self {
        Self { decoder, publisher }
    }

    /// Takes one message through decode, sanitize and publish.
    #[instrument(skip_all, fields(event_id = %message.id))]
    pub async fn handle(&self, message: &InboundMessage) -> Outcome {
        let Some(payload) = message.payload.as_deref() else {
            debug!("Skipping tombstone");
            return Outcome::Tombstone;
        };

        let change = match self.decoder.decode(&message.id, payload) {
            Ok(Decoded::Change(change)) => change,
            Ok(Decoded::Ignored(source)) => return Outcome::Ignored(source),
            Err(e) => {
                error!(error = %e, "Failed to decode change envelope");
                return Outcome::DecodeFailed;
            }
        };

        let change = match sanitize(change) {
            Verdict::Publish(change) => change,
            Verdict::Suppress => {
                debug!("No externally visible change, suppressing");
                return Outcome::Suppressed;
            }
        };

        let kind = change.kind();
        let user_id = change.user_id().map(UserId::as_str).unwrap_or_default();
        match self.publisher.publish(&change).await {
            Ok(()) => {
                info!(%kind, %user_id, "Published user event");
                Outcome::Published(kind)
            }
            Err(e) => {
                error!(error = %e, %kind, %user_id, "Failed to publish user event");
                Outcome::PublishFailed
            }
        }
    }

    /// Consumes `subscription` until `shutdown` completes.
    ///
    /// Messages still being handled when shutdown is observed are settled
    /// first; anything not settled is redelivered by the broker.
    ///
    /// Returns the error when a message cannot be rejected. Acknowledging
    /// anything after it would commit past the rejected offset, so the
    /// subscription must be dropped and rebuilt from the committed position.
    pub async fn run<S, F>(&self, subscription: &mut S, shutdown: F) -> Result<()>
    where
        S: Subscription,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(variant = %self.decoder.variant(), "Relay consume loop started");

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping consume loop");
                    break;
                }
                next = subscription.next() => next,
            };

            let message = match next {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "Failed to receive message");
                    tokio::time::sleep(RECEIVE_BACKOFF).await;
                    continue;
                }
            };

            match self.handle(&message).await.disposition() {
                Disposition::Ack => {
                    // a later commit on the partition covers this offset too
                    if let Err(e) = subscription.ack(&message).await {
                        warn!(event_id = %message.id, error = %e, "Failed to acknowledge message");
                    }
                }
                Disposition::Nack => {
                    if let Err(e) = subscription.nack(&message).await {
                        error!(
                            event_id = %message.id,
                            error = %e,
                            "Failed to reject message, abandoning subscription"
                        );
                        return Err(e);
                    }
                }
            }
        }

        Ok(())
    }
}
