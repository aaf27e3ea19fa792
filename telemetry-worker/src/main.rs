use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use common_kafka::admin::ensure_topic;
use common_kafka::kafka_consumer::SingleTopicConsumer;
use serve_metrics::{serve, setup_metrics_routes};
use telemetry_worker::app_context::AppContext;
use telemetry_worker::config::Config;
use telemetry_worker::store::PostgresLocationStore;
use telemetry_worker::worker::run_worker;

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

pub async fn index() -> &'static str {
    "vehicle telemetry worker"
}

fn start_health_liveness_server(config: &Config, context: Arc<AppContext>) -> JoinHandle<()> {
    let router = Router::new()
        .route("/", get(index))
        .route("/_readiness", get(index))
        .route(
            "/_liveness",
            get(move || std::future::ready(context.liveness.get_status())),
        );
    let router = setup_metrics_routes(router);
    let bind = format!("{}:{}", config.host, config.port);
    tokio::task::spawn(async move {
        serve(router, &bind)
            .await
            .expect("failed to start serving metrics");
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    info!("starting telemetry ingestion worker");

    let config = Config::init_with_defaults().context("failed to load configuration")?;

    let context = Arc::new(
        AppContext::new(&config)
            .await
            .context("failed to connect to the store")?,
    );

    // Bootstrap is idempotent and fatal on failure: nothing is consumed
    // against an unverified schema or topic.
    sqlx::migrate!()
        .run(&context.pool)
        .await
        .context("failed to run store migrations")?;
    ensure_topic(
        &config.kafka,
        &config.consumer.kafka_consumer_topic,
        config.kafka_topic_partitions,
        config.kafka_topic_replication,
    )
    .await
    .context("topic provisioning failed")?;

    let consumer = SingleTopicConsumer::new(config.kafka.clone(), config.consumer.clone())
        .context("failed to create Kafka consumer")?;
    info!(
        "subscribed to topic: {}",
        config.consumer.kafka_consumer_topic
    );

    start_health_liveness_server(&config, context.clone());

    let store = Arc::new(PostgresLocationStore::new(context.pool.clone()));
    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(run_worker(
        consumer,
        store,
        context.worker_liveness.clone(),
        Duration::from_millis(config.poll_timeout_ms),
        shutdown.clone(),
    ));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received, draining");
    shutdown.cancel();
    worker.await.context("worker task panicked")?;

    Ok(())
}
