//! Tests for config module

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use masothue::config::Config;
use serial_test::serial;

#[test]
fn test_example_config_matches_defaults() {
    let config = Config::from_file(Path::new("config.example.toml"))
        .expect("config.example.toml should parse");
    let defaults = Config::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.rate_limit.max_requests, defaults.rate_limit.max_requests);
    assert_eq!(config.cache.dir, defaults.cache.dir);
    assert_eq!(config.http.base_url, defaults.http.base_url);
    assert_eq!(config.http.max_retries, defaults.http.max_retries);
    assert_eq!(config.batch.channel_capacity, defaults.batch.channel_capacity);
    assert_eq!(config.logging.format, defaults.logging.format);
}

#[test]
fn test_invalid_toml_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[rate_limit]\nmax_requests = \"ten\"").unwrap();

    let err = Config::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse TOML"));
}

#[test]
fn test_missing_file_is_rejected() {
    assert!(Config::from_file(Path::new("does-not-exist.toml")).is_err());
}

#[test]
#[serial]
fn test_load_applies_env_over_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[http]\ntimeout_secs = 20\nmax_retries = 5").unwrap();

    std::env::set_var("MASOTHUE_MAX_RETRIES", "1");
    let config = Config::load(Some(file.path()));
    std::env::remove_var("MASOTHUE_MAX_RETRIES");

    let config = config.unwrap();
    assert_eq!(config.request_timeout(), Duration::from_secs(20));
    assert_eq!(config.http.max_retries, 1);
}

#[test]
#[serial]
fn test_load_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[rate_limit]\nmax_requests = 0").unwrap();

    assert!(Config::load(Some(file.path())).is_err());
}
