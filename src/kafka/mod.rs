pub mod consumer;
pub mod producer;
pub mod serializer;
pub mod topic_manager;

pub use consumer::KafkaSubscription;
pub use producer::KafkaPublisher;
pub use serializer::{JsonSerializer, OutboundEvent, OutboundUser};
pub use topic_manager::TopicManager;
