use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::ClientConfig;
use tracing::info;

use crate::config::KafkaConfig;

#[derive(Debug, thiserror::Error)]
pub enum EnsureTopicError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("topic creation rejected for {topic}: {code}")]
    Rejected {
        topic: String,
        code: RDKafkaErrorCode,
    },
}

/// Create a topic if it does not exist yet. An already existing topic is a
/// success, regardless of its current partition or replication settings; any
/// other broker answer is an error, and callers treat it as fatal at startup
/// rather than produce or consume against an unverified topic.
pub async fn ensure_topic(
    config: &KafkaConfig,
    topic: &str,
    num_partitions: i32,
    replication_factor: i32,
) -> Result<(), EnsureTopicError> {
    let mut client_config = ClientConfig::new();
    client_config.set("bootstrap.servers", &config.kafka_hosts);

    if config.kafka_tls {
        client_config
            .set("security.protocol", "ssl")
            .set("enable.ssl.certificate.verification", "false");
    };

    let admin: AdminClient<DefaultClientContext> = client_config.create()?;

    let new_topic = NewTopic::new(
        topic,
        num_partitions,
        TopicReplication::Fixed(replication_factor),
    );
    let results = admin
        .create_topics(&[new_topic], &AdminOptions::new())
        .await?;

    for result in results {
        match result {
            Ok(name) => info!("created topic {name}"),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                info!("topic {name} already exists")
            }
            Err((name, code)) => {
                return Err(EnsureTopicError::Rejected { topic: name, code });
            }
        }
    }

    Ok(())
}
