use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use user_event_relay::config::KafkaConfig;
use user_event_relay::kafka::{KafkaPublisher, KafkaSubscription, TopicManager};
use user_event_relay::shutdown::shutdown_signal;
use user_event_relay::{Config, Relay};

const CONSUMER_REBUILD_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "user-event-relay")]
#[command(about = "Relays user change-data-capture events to a public topic", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    info!("Starting user-event-relay");
    info!("Loading configuration from {:?}", args.config);

    let config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load configuration from {:?}", args.config))?;

    info!(
        kafka_brokers = ?config.kafka.brokers,
        inbound_topic = %config.kafka.inbound_topic,
        outbound_topic = %config.kafka.outbound_topic,
        group_id = %config.kafka.group_id,
        source = %config.relay.source,
        entity = %config.relay.entity,
        workers = config.relay.workers,
        "Configuration summary"
    );

    if config.kafka.create_topics {
        TopicManager::new(&config.kafka)?
            .ensure_topic_exists(&config.kafka.outbound_topic)
            .await
            .context("failed to prepare outbound topic")?;
    }

    let publisher = KafkaPublisher::new(&config.kafka).context("failed to create producer")?;
    let decoder = config.relay.source.decoder(config.relay.entity.clone());
    let relay = Arc::new(Relay::new(decoder, publisher));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let redelivery_delay = Duration::from_millis(config.relay.redelivery_delay_ms);

    let mut workers = Vec::with_capacity(config.relay.workers);
    for worker in 0..config.relay.workers {
        let kafka = config.kafka.clone();
        let relay = Arc::clone(&relay);
        let shutdown = shutdown_rx.clone();
        workers.push(tokio::spawn(run_worker(
            worker,
            kafka,
            redelivery_delay,
            relay,
            shutdown,
        )));
    }

    shutdown_signal()
        .context("failed to listen for shutdown signal")?
        .await;
    info!("Shutting down workers");
    let _ = shutdown_tx.send(true);

    for result in futures::future::join_all(workers).await {
        if let Err(e) = result {
            error!(error = %e, "Worker task panicked");
        }
    }

    info!("user-event-relay stopped");
    Ok(())
}

/// Runs one consume loop, rebuilding the consumer whenever the loop gives up
/// on it. A fresh consumer resumes from the group's committed offsets.
async fn run_worker(
    worker: usize,
    kafka: KafkaConfig,
    redelivery_delay: Duration,
    relay: Arc<Relay<KafkaPublisher>>,
    shutdown: watch::Receiver<bool>,
) {
    while !*shutdown.borrow() {
        match KafkaSubscription::new(&kafka, redelivery_delay) {
            Ok(mut subscription) => {
                let mut stop = shutdown.clone();
                let stopped = async move {
                    let _ = stop.wait_for(|stop| *stop).await;
                };
                match relay.run(&mut subscription, stopped).await {
                    Ok(()) => break,
                    Err(e) => error!(worker, error = %e, "Consume loop failed, rebuilding consumer"),
                }
            }
            Err(e) => error!(worker, error = %e, "Failed to create consumer"),
        }
        tokio::time::sleep(CONSUMER_REBUILD_BACKOFF).await;
    }
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("user_event_relay=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("user_event_relay=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
