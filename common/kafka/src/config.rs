use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct KafkaConfig {
    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    #[envconfig(default = "5")]
    pub kafka_producer_linger_ms: u32, // Maximum time between producer batches during low traffic

    #[envconfig(default = "400")]
    pub kafka_producer_queue_mib: u32, // Size of the in-memory producer queue in mebibytes

    #[envconfig(default = "100000")]
    pub kafka_producer_queue_messages: u32, // Maximum number of messages in the in-memory producer queue

    #[envconfig(default = "30000")]
    pub kafka_message_timeout_ms: u32, // Time before we stop retrying producing a message: 30 seconds

    #[envconfig(default = "snappy")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd

    // Idempotent production: broker-side retries of a send never result in
    // more than one durably-accepted copy. Requires acks=all and bounds
    // max.in.flight to 5, which the producer constructor enforces.
    #[envconfig(default = "true")]
    pub kafka_enable_idempotence: bool,

    #[envconfig(default = "3")]
    pub kafka_send_max_retries: u32,

    #[envconfig(default = "100")]
    pub kafka_retry_backoff_ms: u32,

    #[envconfig(default = "5")]
    pub kafka_max_in_flight: u32,
}

#[derive(Envconfig, Clone)]
pub struct ConsumerConfig {
    pub kafka_consumer_group: String,
    pub kafka_consumer_topic: String,

    // Applies on first subscribe only: whether a new consumer group replays
    // the topic backlog or starts at the head.
    #[envconfig(default = "earliest")]
    pub kafka_consumer_offset_reset: String, // earliest, latest

    // Development convenience only. Production deployments provision topics
    // explicitly at startup and keep this off.
    #[envconfig(default = "false")]
    pub kafka_allow_auto_create_topics: bool,
}

impl ConsumerConfig {
    /// Consumer group and topic are application specific, so no good defaults
    /// can live in the derive macro. Callers set theirs here before init'ing
    /// their main config struct.
    pub fn set_defaults(consumer_group: &str, consumer_topic: &str) {
        if std::env::var("KAFKA_CONSUMER_GROUP").is_err() {
            std::env::set_var("KAFKA_CONSUMER_GROUP", consumer_group);
        };
        if std::env::var("KAFKA_CONSUMER_TOPIC").is_err() {
            std::env::set_var("KAFKA_CONSUMER_TOPIC", consumer_topic);
        };
    }
}
