use std::sync::{Arc, Weak};

use rdkafka::{
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::KafkaError,
    ClientConfig, Message,
};
use serde::de::DeserializeOwned;

use crate::config::{ConsumerConfig, KafkaConfig};

/// A consumer subscribed to exactly one topic, with offset storing and
/// committing under the caller's explicit control. The caller stores a
/// message's offset only once it has finished handling the message; anything
/// not stored is redelivered after a restart or rebalance.
#[derive(Clone)]
pub struct SingleTopicConsumer {
    inner: Arc<Inner>,
}

struct Inner {
    consumer: StreamConsumer,
    topic: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RecvErr {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("undecodable payload at partition {partition} offset {offset}: {error}")]
    Payload {
        partition: i32,
        offset: i64,
        error: serde_json::Error,
    },
    #[error("empty payload at partition {partition} offset {offset}")]
    Empty { partition: i32, offset: i64 },
}

#[derive(Debug, thiserror::Error)]
pub enum OffsetErr {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("consumer gone")]
    Gone,
}

impl SingleTopicConsumer {
    pub fn new(
        common_config: KafkaConfig,
        consumer_config: ConsumerConfig,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &common_config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("group.id", consumer_config.kafka_consumer_group)
            .set(
                "auto.offset.reset",
                consumer_config.kafka_consumer_offset_reset,
            )
            .set(
                "allow.auto.create.topics",
                consumer_config.kafka_allow_auto_create_topics.to_string(),
            );

        // Offsets are stored per message by the caller and committed
        // explicitly, never behind its back.
        client_config
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false");

        if common_config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[consumer_config.kafka_consumer_topic.as_str()])?;

        let inner = Inner {
            consumer,
            topic: consumer_config.kafka_consumer_topic,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn topic(&self) -> &str {
        &self.inner.topic
    }

    /// Receive the next message and decode its JSON payload. Decode failures
    /// return the partition and offset of the offending message, and its
    /// offset is NOT stored: the message is redelivered until an operator
    /// intervenes or a fixed build decodes it.
    pub async fn json_recv<T>(&self) -> Result<(T, Offset), RecvErr>
    where
        T: DeserializeOwned,
    {
        let message = self.inner.consumer.recv().await?;

        let offset = Offset {
            handle: Arc::downgrade(&self.inner),
            partition: message.partition(),
            offset: message.offset(),
        };

        let Some(payload) = message.payload() else {
            return Err(RecvErr::Empty {
                partition: offset.partition,
                offset: offset.offset,
            });
        };

        let payload = match serde_json::from_slice(payload) {
            Ok(p) => p,
            Err(error) => {
                return Err(RecvErr::Payload {
                    partition: offset.partition,
                    offset: offset.offset,
                    error,
                });
            }
        };

        Ok((payload, offset))
    }

    /// Ask the broker to durably record the stored offsets for this group,
    /// without blocking the poll loop.
    pub fn commit_stored_async(&self) -> Result<(), KafkaError> {
        self.inner
            .consumer
            .commit_consumer_state(CommitMode::Async)
    }

    /// Commit stored offsets and wait for the broker's answer. Called once at
    /// shutdown so the group rebalances from the right position.
    pub fn commit_stored_sync(&self) -> Result<(), KafkaError> {
        self.inner.consumer.commit_consumer_state(CommitMode::Sync)
    }
}

/// The position of one received message. Storing it marks the message as
/// processed, making it eligible for the next offset commit.
pub struct Offset {
    handle: Weak<Inner>,
    partition: i32,
    offset: i64,
}

impl Offset {
    pub fn partition(&self) -> i32 {
        self.partition
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn store(self) -> Result<(), OffsetErr> {
        let inner = self.handle.upgrade().ok_or(OffsetErr::Gone)?;
        inner
            .consumer
            .store_offset(&inner.topic, self.partition, self.offset)?;
        Ok(())
    }
}
