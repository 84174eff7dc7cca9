//! Configuration loading and validation tests.
//!
//! Tests TOML parsing, partial configs, and validation as seen from the
//! daemon's perspective.

use packetmap_core::config::PacketmapConfig;

#[test]
fn test_parse_full_config() {
    let toml_str = r#"
[general]
log_level = "debug"
log_format = "json"
pid_file = "/var/run/packetmap.pid"

[geo]
countries_csv = "/data/countries.csv"
blocks_csv = "/data/blocks.csv"

[capture]
enabled = true
interface = "eth0"
promiscuous = true
read_timeout_ms = 50
stop_timeout_ms = 1000

[decay]
enabled = true
interval_secs = 10
floor = 1

[reporter]
enabled = true
interval_secs = 2
top = 5

[metrics]
enabled = true
listen_addr = "127.0.0.1"
port = 9469
endpoint = "/metrics"
"#;

    let config = PacketmapConfig::parse(toml_str).expect("full config should parse");

    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.pid_file, "/var/run/packetmap.pid");
    assert_eq!(config.geo.blocks_csv, "/data/blocks.csv");
    assert_eq!(config.capture.interface, "eth0");
    assert!(config.capture.promiscuous);
    assert_eq!(config.capture.read_timeout_ms, 50);
    assert_eq!(config.decay.interval_secs, 10);
    assert_eq!(config.decay.floor, 1);
    assert_eq!(config.reporter.top, 5);
    assert!(config.metrics.enabled);

    config.validate().expect("full config should validate");
}

#[test]
fn test_parse_minimal_config_uses_defaults() {
    let config = PacketmapConfig::parse("[general]\nlog_level = \"warn\"\n")
        .expect("minimal config should parse");

    assert_eq!(config.general.log_level, "warn");
    // Everything else falls back to defaults
    assert_eq!(config.general.log_format, "json");
    assert!(config.capture.enabled);
    assert_eq!(config.capture.read_timeout_ms, 100);
    assert_eq!(config.decay.interval_secs, 5);
    assert_eq!(config.reporter.interval_secs, 1);
    assert!(!config.metrics.enabled);
}

#[test]
fn test_invalid_log_level_fails_validation() {
    let mut config = PacketmapConfig::default();
    config.general.log_level = "verbose".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_read_timeout_fails_validation_when_capture_enabled() {
    let mut config = PacketmapConfig::default();
    config.capture.read_timeout_ms = 0;
    assert!(
        config.validate().is_err(),
        "a blocking read without a timeout can never observe the stop flag"
    );

    // With capture disabled the timeout is irrelevant
    config.capture.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_reporter_top_fails_validation_when_reporter_enabled() {
    let mut config = PacketmapConfig::default();
    config.reporter.top = 0;
    assert!(
        config.validate().is_err(),
        "a top of zero would log empty summaries every tick"
    );

    // With the reporter disabled the value is irrelevant
    config.reporter.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let result = PacketmapConfig::parse("[general\nlog_level = ");
    assert!(result.is_err());
}

#[tokio::test]
async fn test_load_from_file() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("packetmap.toml");
    std::fs::write(&path, "[decay]\ninterval_secs = 30\n").expect("should write config");

    let config = PacketmapConfig::from_file(&path)
        .await
        .expect("should load config file");
    assert_eq!(config.decay.interval_secs, 30);
}

#[tokio::test]
async fn test_load_missing_file_is_not_found() {
    let result = PacketmapConfig::from_file("/nonexistent/packetmap.toml").await;
    let err = result.expect_err("missing file should fail");
    assert!(err.to_string().contains("not found"), "got: {}", err);
}
