use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use common_kafka::kafka_consumer::{RecvErr, SingleTopicConsumer};
use common_types::VehicleLocation;
use health::HealthHandle;

use crate::metrics_consts::{
    COMMIT_ERRORS, DECODE_ERRORS, DUPLICATES_SKIPPED, POLL_ERRORS, RECORDS_INSERTED, STORE_FAULTS,
};
use crate::store::{LocationStore, PersistOutcome, StoreError};

/// How one message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted,
    DuplicateSkipped,
}

/// Dedup-then-insert for a single record. The existence check is an
/// optimization only; the table's primary key catches the window where a
/// concurrent writer lands the same key between check and insert, and that
/// race loss comes back as a duplicate, never as an error.
pub async fn ingest_one(
    store: &dyn LocationStore,
    location: &VehicleLocation,
) -> Result<IngestOutcome, StoreError> {
    if store
        .exists(&location.vehicle_id, location.timestamp)
        .await?
    {
        return Ok(IngestOutcome::DuplicateSkipped);
    }

    match store.persist(location).await? {
        PersistOutcome::Inserted => Ok(IngestOutcome::Inserted),
        PersistOutcome::Duplicate => Ok(IngestOutcome::DuplicateSkipped),
    }
}

/// The ingestion loop. Owns the consumer for its whole lifetime; nothing
/// that happens to a single message stops the loop, and a message's offset
/// is only stored and committed once its record is durably persisted or
/// confirmed to be a duplicate. A crash anywhere before that point means
/// redelivery, which the dedup path absorbs.
pub async fn run_worker(
    consumer: SingleTopicConsumer,
    store: Arc<dyn LocationStore>,
    liveness: HealthHandle,
    poll_timeout: Duration,
    shutdown: CancellationToken,
) {
    info!("ingestion worker subscribed to {}", consumer.topic());

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = tokio::time::timeout(poll_timeout, consumer.json_recv::<VehicleLocation>()) => next,
        };

        liveness.report_healthy().await;

        let Ok(received) = next else {
            // Empty poll, nothing arrived within the timeout
            continue;
        };

        let (location, offset) = match received {
            Ok(pair) => pair,
            Err(RecvErr::Kafka(err)) => {
                counter!(POLL_ERRORS).increment(1);
                error!("failed to poll for messages: {}", err);
                continue;
            }
            Err(err @ (RecvErr::Empty { .. } | RecvErr::Payload { .. })) => {
                // Offset deliberately not stored: the message redelivers on
                // restart instead of being silently dropped.
                counter!(DECODE_ERRORS).increment(1);
                warn!("{}", err);
                continue;
            }
        };

        let (partition, position) = (offset.partition(), offset.offset());

        match ingest_one(store.as_ref(), &location).await {
            Ok(IngestOutcome::Inserted) => {
                counter!(RECORDS_INSERTED).increment(1);
                info!(
                    vehicle_id = %location.vehicle_id,
                    timestamp = %location.timestamp,
                    partition,
                    offset = position,
                    "inserted vehicle location"
                );
            }
            Ok(IngestOutcome::DuplicateSkipped) => {
                counter!(DUPLICATES_SKIPPED).increment(1);
                info!(
                    vehicle_id = %location.vehicle_id,
                    timestamp = %location.timestamp,
                    partition,
                    offset = position,
                    "skipped duplicate vehicle location"
                );
            }
            Err(err) => {
                // Contained to this message: the position does not advance,
                // the broker redelivers, and the dedup check absorbs the
                // retry once the store recovers.
                counter!(STORE_FAULTS).increment(1);
                error!(
                    vehicle_id = %location.vehicle_id,
                    partition,
                    offset = position,
                    "failed to persist vehicle location: {}", err
                );
                continue;
            }
        }

        // Only now does the position advance: store it locally, then ask the
        // broker to record it for the group.
        if let Err(err) = offset.store() {
            error!(
                partition,
                offset = position,
                "failed to store offset: {}", err
            );
            continue;
        }
        if let Err(err) = consumer.commit_stored_async() {
            counter!(COMMIT_ERRORS).increment(1);
            warn!("failed to request offset commit: {}", err);
        }
    }

    // Orderly exit: flush stored offsets synchronously so the group
    // rebalances from the right position, then drop the subscription.
    match consumer.commit_stored_sync() {
        Ok(()) => {}
        Err(KafkaError::ConsumerCommit(RDKafkaErrorCode::NoOffset)) => {
            // Nothing was processed, nothing to commit
        }
        Err(err) => warn!("final offset commit failed: {}", err),
    }
    info!("ingestion worker stopped");
}
