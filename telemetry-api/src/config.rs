use std::net::SocketAddr;

use common_kafka::config::KafkaConfig;
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "127.0.0.1:3000")]
    pub address: SocketAddr,

    #[envconfig(default = "false")]
    pub print_sink: bool,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(default = "vehicle-locations")]
    pub kafka_topic: String,

    // Provisioning parameters, only applied if the topic does not exist yet
    #[envconfig(default = "3")]
    pub kafka_topic_partitions: i32,

    #[envconfig(default = "1")]
    pub kafka_topic_replication: i32,
}
