use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use common_types::VehicleLocation;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of a persistence attempt. A duplicate is an expected outcome of
/// redelivery, not a failure; callers advance past it exactly as they
/// advance past a fresh insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Inserted,
    Duplicate,
}

#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Read-only probe of the identity key, used to skip duplicate writes
    /// without a constraint-violation round-trip. Takes no blocking locks.
    async fn exists(&self, vehicle_id: &str, timestamp: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Durably insert one record, or report it a duplicate. The table's
    /// composite primary key is what makes this safe against concurrent
    /// writers; losing that race surfaces as `Duplicate` here.
    async fn persist(&self, location: &VehicleLocation) -> Result<PersistOutcome, StoreError>;
}

pub struct PostgresLocationStore {
    pool: PgPool,
}

impl PostgresLocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationStore for PostgresLocationStore {
    async fn exists(&self, vehicle_id: &str, timestamp: DateTime<Utc>) -> Result<bool, StoreError> {
        let found: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM vehicle_locations WHERE vehicle_id = $1 AND "timestamp" = $2)"#,
        )
        .bind(vehicle_id)
        .bind(timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }

    async fn persist(&self, location: &VehicleLocation) -> Result<PersistOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"INSERT INTO vehicle_locations (vehicle_id, "timestamp", latitude, longitude, speed, fuel_level)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&location.vehicle_id)
        .bind(location.timestamp)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.speed)
        .bind(location.fuel_level)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                Ok(PersistOutcome::Inserted)
            }
            Err(err) if is_unique_violation(&err) => {
                // Lost the race to a concurrent writer. The row is there,
                // which is all the pipeline needs.
                tx.rollback().await?;
                Ok(PersistOutcome::Duplicate)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
