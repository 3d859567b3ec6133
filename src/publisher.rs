use async_trait::async_trait;
use std::sync::Arc;

use crate::model::Change;
use crate::Result;

/// Outbound side of the relay.
///
/// Implementations must not return before the broker has confirmed the
/// event, and must not retry on their own; a failed publish is redelivered
/// by the inbound broker instead.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, change: &Change) -> Result<()>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn publish(&self, change: &Change) -> Result<()> {
        (**self).publish(change).await
    }
}
