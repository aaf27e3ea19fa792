use async_trait::async_trait;
use common_types::VehicleLocation;

use crate::api::ApiError;

pub mod kafka;
pub mod print;

/// Where accepted location reports go. The production implementation is the
/// Kafka sink; `PrintSink` exists for running the service without a broker.
#[async_trait]
pub trait LocationSink {
    async fn send(&self, location: VehicleLocation) -> Result<(), ApiError>;
}
