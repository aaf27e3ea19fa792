use async_trait::async_trait;
use metrics::counter;
use tracing::info;

use common_types::VehicleLocation;

use crate::api::ApiError;
use crate::sinks::LocationSink;

pub struct PrintSink {}

#[async_trait]
impl LocationSink for PrintSink {
    async fn send(&self, location: VehicleLocation) -> Result<(), ApiError> {
        info!("location report: {:?}", location);
        counter!("telemetry_api_reports_published_total").increment(1);

        Ok(())
    }
}
