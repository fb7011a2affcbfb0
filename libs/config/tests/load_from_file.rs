//! Loading gateway configuration from disk with environment overrides

use config::GatewayConfig;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_file() {
    let file = write_config(
        r#"
[scoring]
endpoint = "127.0.0.1:6000"
cache_ttl_seconds = 60

[thresholds]
Forex = 0.08
Other = 0.1
"#,
    );

    let gateway = GatewayConfig::load(file.path()).unwrap();
    assert_eq!(gateway.scoring.endpoint, "127.0.0.1:6000");
    assert_eq!(gateway.scoring.cache_ttl_seconds, 60);
    assert_eq!(gateway.scoring.pool_size, 4);
    assert_eq!(gateway.thresholds.threshold_for("FOREX"), 0.08);
    assert_eq!(gateway.thresholds.threshold_for("unlisted"), 0.1);
}

#[test]
fn test_environment_overrides_file() {
    let file = write_config(
        r#"
[scoring]
endpoint = "127.0.0.1:6000"

[thresholds]
Other = 0.1
"#,
    );

    // Only this test touches this variable
    std::env::set_var("GATEWAY_SCORING__RECV_TIMEOUT_MS", "1250");
    let loaded = GatewayConfig::load(file.path());
    std::env::remove_var("GATEWAY_SCORING__RECV_TIMEOUT_MS");

    let gateway = loaded.unwrap();
    assert_eq!(gateway.scoring.recv_timeout_ms, 1250);
    assert_eq!(gateway.scoring.endpoint, "127.0.0.1:6000");
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = GatewayConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to build configuration"));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let file = write_config(
        r#"
[scoring]
pool_size = 0

[thresholds]
Other = 0.1
"#,
    );
    assert!(GatewayConfig::load(file.path()).is_err());
}
