use std::io::Write;
use taskmirror::config::Config;
use taskmirror::constants::GOOGLE_TASKS_SCOPE;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(config.sync.enabled);
    assert!(config.sync.status_sync_enabled);
    assert!(config.sync.import_enabled);
    assert_eq!(config.sync.status_sync_interval_minutes, 5);
    assert_eq!(config.sync.import_interval_minutes, 1);
    assert_eq!(config.sync.request_timeout_secs, 30);
    assert_eq!(config.sync.default_list_id, "@default");
    assert_eq!(config.google.required_scope, GOOGLE_TASKS_SCOPE);
    assert_eq!(config.logging.level, "info");
    assert!(!config.logging.file_enabled);
    assert!(config.storage.database_url.is_none());
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.sync.import_interval_minutes = 0;
    assert!(config.validate().is_err());

    config.sync.import_interval_minutes = 1;
    config.sync.status_sync_interval_minutes = 2000;
    assert!(config.validate().is_err());

    config.sync.status_sync_interval_minutes = 5;
    config.sync.request_timeout_secs = 0;
    assert!(config.validate().is_err());

    config.sync.request_timeout_secs = 30;
    config.sync.initial_lookback_days = -1;
    assert!(config.validate().is_err());

    config.sync.initial_lookback_days = 30;
    config.logging.level = "loud".to_string();
    assert!(config.validate().is_err());

    config.logging.level = "debug".to_string();
    config.google.required_scope = " ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_partial_config_deserialization() {
    let partial_toml = r#"
[sync]
import_interval_minutes = 10
status_sync_enabled = false

[storage]
database_url = "sqlite::memory:"
"#;

    let config: Config = toml::from_str(partial_toml).unwrap();

    assert_eq!(config.sync.import_interval_minutes, 10);
    assert!(!config.sync.status_sync_enabled);
    assert_eq!(config.database_url().unwrap(), "sqlite::memory:");

    // Unspecified values fall back to defaults
    assert_eq!(config.sync.status_sync_interval_minutes, 5);
    assert!(config.sync.enabled);
    assert_eq!(config.google.client_id_env, "GOOGLE_CLIENT_ID");
}

#[test]
fn test_load_from_file_validates() {
    let mut valid = tempfile::NamedTempFile::new().unwrap();
    writeln!(valid, "[logging]\nlevel = \"warn\"").unwrap();
    let config = Config::load_from_file(valid.path()).unwrap();
    assert_eq!(config.logging.level, "warn");

    let mut invalid = tempfile::NamedTempFile::new().unwrap();
    writeln!(invalid, "[sync]\nimport_interval_minutes = 0").unwrap();
    assert!(Config::load_from_file(invalid.path()).is_err());

    let mut malformed = tempfile::NamedTempFile::new().unwrap();
    writeln!(malformed, "[sync\nenabled = ").unwrap();
    assert!(Config::load_from_file(malformed.path()).is_err());
}

#[test]
fn test_generate_config_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("nested").join("config.toml");

    Config::generate_default_config(&config_path).unwrap();

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("# taskmirror Configuration File"));
    assert!(content.contains("import_interval_minutes = 1"));

    // The generated file loads back as the defaults
    let config = Config::load_from_file(&config_path).unwrap();
    assert_eq!(config.sync.status_sync_interval_minutes, 5);
}

#[test]
fn test_client_credentials_from_env() {
    let mut config = Config::default();
    config.google.client_id_env = "TASKMIRROR_TEST_CLIENT_ID".to_string();
    config.google.client_secret_env = "TASKMIRROR_TEST_CLIENT_SECRET".to_string();
    assert!(config.google.client_credentials().is_err());

    std::env::set_var("TASKMIRROR_TEST_CLIENT_ID", "id-123");
    std::env::set_var("TASKMIRROR_TEST_CLIENT_SECRET", "secret-456");
    let (id, secret) = config.google.client_credentials().unwrap();
    assert_eq!(id, "id-123");
    assert_eq!(secret, "secret-456");
}
