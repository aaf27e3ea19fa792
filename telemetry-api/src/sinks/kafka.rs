use async_trait::async_trait;
use metrics::counter;
use rdkafka::error::KafkaError;
use rdkafka::producer::{DeliveryFuture, FutureProducer, FutureRecord};
use tracing::{error, info, instrument};

use common_kafka::config::KafkaConfig;
use common_kafka::kafka_producer::{create_kafka_producer, KafkaContext};
use common_types::VehicleLocation;
use health::HealthHandle;

use crate::api::ApiError;
use crate::sinks::LocationSink;

pub struct KafkaSink {
    producer: FutureProducer<KafkaContext>,
    topic: String,
}

impl KafkaSink {
    pub async fn new(
        config: &KafkaConfig,
        topic: String,
        liveness: HealthHandle,
    ) -> Result<KafkaSink, KafkaError> {
        info!("connecting to Kafka brokers at {}...", config.kafka_hosts);
        let producer = create_kafka_producer(config, liveness).await?;

        Ok(KafkaSink { producer, topic })
    }

    fn kafka_send(&self, location: &VehicleLocation) -> Result<DeliveryFuture, ApiError> {
        let payload = serde_json::to_string(location).map_err(|e| {
            error!("failed to serialize location report: {}", e);
            ApiError::NonRetryableSinkError
        })?;

        // Keyed on the vehicle id, so one vehicle's reports stay on one
        // partition and arrive at the worker in order.
        match self.producer.send_result(FutureRecord {
            topic: self.topic.as_str(),
            payload: Some(&payload),
            partition: None,
            key: Some(location.key()),
            timestamp: None,
            headers: None,
        }) {
            Ok(ack) => Ok(ack),
            Err((e, _)) => {
                counter!("telemetry_api_publish_errors_total").increment(1);
                error!("failed to enqueue location report: {}", e);
                Err(ApiError::DeliveryFailed)
            }
        }
    }

    async fn process_ack(delivery: DeliveryFuture) -> Result<(), ApiError> {
        match delivery.await {
            Err(_) => {
                // Cancelled due to timeout while retrying
                counter!("telemetry_api_publish_errors_total").increment(1);
                error!("failed to produce location report before write timeout");
                Err(ApiError::DeliveryFailed)
            }
            Ok(Err((err, _))) => {
                counter!("telemetry_api_publish_errors_total").increment(1);
                error!("failed to produce location report: {}", err);
                Err(ApiError::DeliveryFailed)
            }
            Ok(Ok(_)) => {
                counter!("telemetry_api_reports_published_total").increment(1);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl LocationSink for KafkaSink {
    #[instrument(skip_all, fields(vehicle_id = %location.vehicle_id))]
    async fn send(&self, location: VehicleLocation) -> Result<(), ApiError> {
        let ack = self.kafka_send(&location)?;
        Self::process_ack(ack).await
    }
}
