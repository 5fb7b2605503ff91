///! Integration tests for the PostgreSQL store layer.
///! All tests are `#[ignore]` — run with `cargo test -- --ignored` against a live database.
///!
///! Requirements: DB_HOST, DB_PORT, DB_USERNAME, DB_PASSWORD, DB_DATABASE
///! pointing at a reachable, migratable PostgreSQL instance.
use dwp_common::{CycleRecord, CycleType, QualityGrade, SensorValidity, Side};
use dwp_engine::store::StoreClient;

async fn setup() -> StoreClient {
    let host = std::env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let username = std::env::var("DB_USERNAME").unwrap_or_else(|_| "dwp".to_string());
    let password = std::env::var("DB_PASSWORD").unwrap_or_else(|_| "dwp_dev".to_string());
    let database = std::env::var("DB_DATABASE").unwrap_or_else(|_| "dwp".to_string());

    let url = format!("postgres://{username}:{password}@{host}:{port}/{database}");
    let client = StoreClient::connect(&url, 5)
        .await
        .expect("Failed to connect to PostgreSQL");
    client.migrate().await.expect("Failed to run migrations");
    client
}

fn sample_record(line: &str) -> CycleRecord {
    CycleRecord {
        line: line.to_string(),
        machine_id: 1,
        position: Side::L,
        th_waveform: vec![30, 35, 38, 35, 30],
        side_waveform: vec![31, 36, 39, 36, 31],
        timestamps_ms: vec![0, 100, 200, 300, 400],
        duration_s: 0.4,
        max_th: 38,
        max_side: 39,
        sample_count: 5,
        cycle_type: CycleType::Complete,
        quality_grade: QualityGrade::Excellent,
        sensor_validity: SensorValidity {
            th_ok: true,
            side_ok: true,
        },
    }
}

#[tokio::test]
#[ignore]
async fn health_check_succeeds_against_live_database() {
    let client = setup().await;
    client.health_check().await.expect("health check failed");
}

#[tokio::test]
#[ignore]
async fn save_cycle_increments_running_count_per_line() {
    let client = setup().await;
    let line = format!("TEST-{}", std::process::id());

    client
        .save_cycle(&sample_record(&line))
        .await
        .expect("first save should succeed");
    client
        .save_cycle(&sample_record(&line))
        .await
        .expect("second save should succeed");
}

#[tokio::test]
#[ignore]
async fn load_devices_skips_nothing_when_catalog_is_well_formed() {
    let client = setup().await;
    let devices = client.load_devices().await.expect("load_devices failed");
    // Just exercises the query end to end; exact contents depend on
    // whatever fixtures are present in the target database.
    let _ = devices.len();
}
