pub const RECORDS_INSERTED: &str = "telemetry_worker_records_inserted_total";
pub const DUPLICATES_SKIPPED: &str = "telemetry_worker_duplicates_skipped_total";
pub const DECODE_ERRORS: &str = "telemetry_worker_decode_errors_total";
pub const STORE_FAULTS: &str = "telemetry_worker_store_faults_total";
pub const POLL_ERRORS: &str = "telemetry_worker_poll_errors_total";
pub const COMMIT_ERRORS: &str = "telemetry_worker_commit_errors_total";
