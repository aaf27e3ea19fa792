use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use envconfig::Envconfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use common_kafka::admin::ensure_topic;
use health::{ComponentStatus, HealthRegistry};
use serve_metrics::setup_metrics_routes;
use telemetry_api::config::Config;
use telemetry_api::router::router;
use telemetry_api::sinks::kafka::KafkaSink;
use telemetry_api::sinks::print::PrintSink;
use telemetry_api::sinks::LocationSink;

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for shutdown signal");
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    info!("starting telemetry capture service");

    let config = Config::init_from_env().context("failed to load configuration")?;

    // The topic must be verified to exist before any report is accepted;
    // anything other than "created" or "already exists" aborts startup.
    ensure_topic(
        &config.kafka,
        &config.kafka_topic,
        config.kafka_topic_partitions,
        config.kafka_topic_replication,
    )
    .await
    .context("topic provisioning failed")?;

    let liveness = HealthRegistry::new("liveness");

    let sink: Arc<dyn LocationSink + Send + Sync> = if config.print_sink {
        // Print sink is only used for local debug, don't allow a container
        // with it to pass its probes on prod
        liveness
            .register("print_sink".to_string(), Duration::from_secs(30))
            .await
            .report_status(ComponentStatus::Unhealthy)
            .await;

        Arc::new(PrintSink {})
    } else {
        let sink_liveness = liveness
            .register("rdkafka".to_string(), Duration::from_secs(30))
            .await;

        Arc::new(
            KafkaSink::new(&config.kafka, config.kafka_topic.clone(), sink_liveness)
                .await
                .context("failed to start Kafka sink")?,
        )
    };

    let app = setup_metrics_routes(router(sink, liveness));

    let listener = tokio::net::TcpListener::bind(config.address).await?;
    info!("listening on {}", config.address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
