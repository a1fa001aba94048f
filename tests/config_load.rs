// tests/config_load.rs
// Path resolution for the config loader. Env-mutating tests are serial
// so they cannot observe each other's RELAY_CONFIG_PATH.

use serial_test::serial;
use std::io::Write;
use timeline_relay::config::{RelayConfig, ENV_CONFIG_PATH};

const ALT_TOML: &str = r#"
[relay]
check_interval_secs = 7

[source]
accounts = ["someone_else"]
keywords = ["token"]

[sink]
chat_name = "Alt Chat"
"#;

#[test]
#[serial]
fn env_var_overrides_default_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alt.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(ALT_TOML.as_bytes()).unwrap();

    std::env::set_var(ENV_CONFIG_PATH, &path);
    let cfg = RelayConfig::load_default().unwrap();
    std::env::remove_var(ENV_CONFIG_PATH);

    assert_eq!(cfg.relay.check_interval_secs, 7);
    assert_eq!(cfg.source.accounts, vec!["someone_else"]);
    assert_eq!(cfg.sink.chat_name, "Alt Chat");
}

#[test]
#[serial]
fn env_var_pointing_nowhere_is_an_error() {
    std::env::set_var(ENV_CONFIG_PATH, "/nonexistent/relay-nowhere.toml");
    let result = RelayConfig::load_default();
    std::env::remove_var(ENV_CONFIG_PATH);

    assert!(result.is_err());
}

#[test]
#[serial]
fn shipped_default_config_parses() {
    // Integration tests run from the package root, where the deployable
    // config lives.
    std::env::remove_var(ENV_CONFIG_PATH);
    let cfg = RelayConfig::load_default().unwrap();

    assert!(!cfg.source.accounts.is_empty());
    assert!(!cfg.sink.chat_name.is_empty());
    assert!(cfg.source.base_url.starts_with("https://"));
}

#[test]
fn load_from_missing_file_errors() {
    let err = RelayConfig::load_from(std::path::Path::new("/nonexistent/missing.toml"))
        .unwrap_err();
    assert!(err.to_string().contains("reading config"));
}
