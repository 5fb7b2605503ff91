///! Integration tests for the Modbus/TCP transport adapter.
///! All tests are `#[ignore]` — run with `cargo test -- --ignored` against a live device
///! or a Modbus/TCP simulator (e.g. `diagslave`).
///!
///! Requirements: MODBUS_HOST, MODBUS_PORT, MODBUS_UNIT_ID.
use dwp_engine::transport::{Transport, TransportAdapter};

async fn setup() -> TransportAdapter {
    let host = std::env::var("MODBUS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("MODBUS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(503);
    let unit_id: u8 = std::env::var("MODBUS_UNIT_ID")
        .ok()
        .and_then(|u| u.parse().ok())
        .unwrap_or(1);

    TransportAdapter::connect(&host, port, unit_id, 1_000)
        .await
        .expect("Failed to connect to Modbus device")
}

#[tokio::test]
#[ignore]
async fn read_block_returns_one_value_per_requested_address() {
    let mut adapter = setup().await;
    let addresses = [0u16, 1, 2, 3];
    let values = adapter.read_block(&addresses).await.expect("read failed");
    assert_eq!(values.len(), addresses.len());
}

#[tokio::test]
#[ignore]
async fn read_block_handles_out_of_order_addresses() {
    let mut adapter = setup().await;
    let addresses = [3u16, 0, 2, 1];
    let values = adapter.read_block(&addresses).await.expect("read failed");
    assert_eq!(values.len(), addresses.len());
}
