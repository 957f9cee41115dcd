#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! Tests against the real EPD feed. Run with `cargo test -- --ignored`.

use hk_environment_mcp_server::aqhi::{AQHI_FEED_URL, get_current_aqhi};
use hk_environment_mcp_server::feed::FeedClient;

#[tokio::test]
#[ignore = "hits the live EPD AQHI feed"]
async fn live_current_aqhi() {
    let readings = get_current_aqhi(&FeedClient::default(), AQHI_FEED_URL)
        .await
        .expect("live AQHI feed should load");

    assert!(!readings.is_empty());
    for reading in &readings {
        assert!(!reading.station.is_empty());
        assert!(!reading.aqhi_value.is_empty());
        assert!(!reading.risk_level.is_empty());
    }
    assert!(
        readings
            .iter()
            .any(|reading| reading.station_type == "Roadside Stations")
    );
}
