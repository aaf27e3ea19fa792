use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// The telemetry record reported by field devices. Travels unmodified from
// the ingress endpoint through Kafka into Postgres. `(vehicle_id, timestamp)`
// is the identity key, enforced by the store as the composite primary key.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleLocation {
    pub vehicle_id: String,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: i32,
    pub fuel_level: i32,
}

impl VehicleLocation {
    /// Kafka partition key. Keying on the vehicle id routes every report for
    /// one vehicle to the same partition, so they are consumed in order.
    pub fn key(&self) -> &str {
        &self.vehicle_id
    }
}
