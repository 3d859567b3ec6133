mod common;

use common::{relational_envelope, UserFixture};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::Message;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use user_event_relay::config::KafkaConfig;
use user_event_relay::decoder::SourceVariant;
use user_event_relay::kafka::{KafkaPublisher, KafkaSubscription, TopicManager};
use user_event_relay::Relay;

fn test_kafka_config() -> KafkaConfig {
    let brokers = env::var("TEST_KAFKA_BROKERS")
        .unwrap_or_else(|_| "localhost:9092".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .collect();

    KafkaConfig {
        brokers,
        group_id: format!("test_relay_{}", std::process::id()),
        inbound_topic: format!("test_cdc_users_{}", std::process::id()),
        outbound_topic: format!("test_public_users_{}", std::process::id()),
        acks: "all".to_string(),
        compression: "none".to_string(),
        linger_ms: 0,
        delivery_timeout_ms: 10_000,
        session_timeout_ms: 10_000,
        create_topics: true,
        topic_partitions: 1,
        topic_replication_factor: 1,
    }
}

#[tokio::test]
#[ignore] // Requires running Kafka: TEST_KAFKA_BROKERS=localhost:9092 cargo test -- --ignored
async fn test_end_to_end_relay() {
    tracing_subscriber::fmt()
        .with_env_filter("user_event_relay=debug,rdkafka=info")
        .try_init()
        .ok();

    let config = test_kafka_config();
    let topics = TopicManager::new(&config).unwrap();
    topics.ensure_topic_exists(&config.inbound_topic).await.unwrap();
    topics.ensure_topic_exists(&config.outbound_topic).await.unwrap();

    let raw_producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", config.bootstrap_servers())
        .create()
        .unwrap();
    let joe = UserFixture::new("u1", "Joe");
    for payload in [
        relational_envelope("orders", None, Some(&joe)),
        relational_envelope("users", None, Some(&joe)),
        relational_envelope("users", Some(&joe), Some(&joe.clone().password("h2"))),
        relational_envelope("users", Some(&joe), None),
    ] {
        raw_producer
            .send(
                FutureRecord::to(&config.inbound_topic).payload(&payload).key("u1"),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
    }

    let relay = Relay::new(
        SourceVariant::Relational.decoder("users"),
        KafkaPublisher::new(&config).unwrap(),
    );
    let mut subscription = KafkaSubscription::new(&config, Duration::from_millis(100)).unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let relay_handle = tokio::spawn(async move {
        relay
            .run(&mut subscription, async move {
                let _ = stop_rx.await;
            })
            .await
    });

    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", config.bootstrap_servers())
        .set("group.id", format!("{}_verify", config.group_id))
        .set("auto.offset.reset", "earliest")
        .create()
        .unwrap();
    consumer.subscribe(&[config.outbound_topic.as_str()]).unwrap();

    let mut events = Vec::new();
    let start = tokio::time::Instant::now();
    while events.len() < 2 && start.elapsed() < Duration::from_secs(20) {
        if let Ok(Ok(message)) = timeout(Duration::from_secs(1), consumer.recv()).await {
            let json: Value = serde_json::from_slice(message.payload().unwrap()).unwrap();
            events.push(json);
        }
    }

    let _ = stop_tx.send(());
    relay_handle.await.unwrap().unwrap();

    assert_eq!(events.len(), 2, "only the creation and deletion are public");
    assert!(events[0]["before"].is_null());
    assert_eq!(events[0]["after"]["first_name"], "Joe");
    assert!(events[0]["after"].get("password_hash").is_none());
    assert_eq!(events[1]["before"]["id"], "u1");
    assert!(events[1]["after"].is_null());
}
