use taskmirror::config::LoggingConfig;
use taskmirror::logger;

#[test]
fn test_dispatch_with_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("taskmirror.log");
    let config = LoggingConfig {
        level: "debug".to_string(),
        file_enabled: true,
    };

    assert!(logger::build_dispatch(&config, Some(&log_path)).is_ok());
    assert!(log_path.exists());
}

#[test]
fn test_dispatch_rejects_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("missing").join("taskmirror.log");

    assert!(logger::build_dispatch(&LoggingConfig::default(), Some(&log_path)).is_err());
}

#[test]
fn test_log_file_lives_in_data_dir() {
    if let Ok(path) = logger::get_log_file_path() {
        assert!(path.ends_with("taskmirror/taskmirror.log"));
    }
}
