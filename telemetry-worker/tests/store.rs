use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;

use common_types::VehicleLocation;
use telemetry_worker::store::{LocationStore, PersistOutcome, PostgresLocationStore};
use telemetry_worker::worker::{ingest_one, IngestOutcome};

fn location_at(vehicle_id: &str, timestamp: DateTime<Utc>) -> VehicleLocation {
    VehicleLocation {
        vehicle_id: vehicle_id.to_string(),
        timestamp,
        latitude: 12.9,
        longitude: 77.6,
        speed: 40,
        fuel_level: 80,
    }
}

fn midnight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

async fn count_rows(db: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM vehicle_locations")
        .fetch_one(db)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn exists_reflects_persisted_rows(db: PgPool) {
    let store = PostgresLocationStore::new(db);
    let location = location_at("V1", midnight());

    assert!(!store
        .exists(&location.vehicle_id, location.timestamp)
        .await
        .unwrap());

    assert_eq!(
        store.persist(&location).await.unwrap(),
        PersistOutcome::Inserted
    );

    assert!(store
        .exists(&location.vehicle_id, location.timestamp)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn primary_key_keeps_the_first_writer(db: PgPool) {
    let store = PostgresLocationStore::new(db.clone());
    let first = location_at("V1", midnight());
    // Same identity key, different readings: the first writer wins and the
    // later one observes a duplicate outcome, not an error
    let mut second = first.clone();
    second.speed = 90;

    assert_eq!(
        store.persist(&first).await.unwrap(),
        PersistOutcome::Inserted
    );
    assert_eq!(
        store.persist(&second).await.unwrap(),
        PersistOutcome::Duplicate
    );

    assert_eq!(count_rows(&db).await, 1);
    let speed: i32 = sqlx::query_scalar("SELECT speed FROM vehicle_locations WHERE vehicle_id = $1")
        .bind("V1")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(speed, 40);
}

#[sqlx::test(migrations = "./migrations")]
async fn redelivered_message_lands_exactly_once(db: PgPool) {
    let store = PostgresLocationStore::new(db.clone());
    let location = location_at("V1", midnight());

    assert_eq!(
        ingest_one(&store, &location).await.unwrap(),
        IngestOutcome::Inserted
    );
    assert_eq!(
        ingest_one(&store, &location).await.unwrap(),
        IngestOutcome::DuplicateSkipped
    );

    assert_eq!(count_rows(&db).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn distinct_keys_do_not_collide(db: PgPool) {
    let store = PostgresLocationStore::new(db.clone());

    // Two vehicles reporting at the same instant, and one of them again an
    // hour later: three distinct identity keys, three rows
    let later = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
    for location in [
        location_at("V1", midnight()),
        location_at("V2", midnight()),
        location_at("V1", later),
    ] {
        assert_eq!(
            store.persist(&location).await.unwrap(),
            PersistOutcome::Inserted
        );
    }

    assert_eq!(count_rows(&db).await, 3);
}
