//! Tests for subscriber installation

use stacklens_utils::{init_logging_with, LogConfig, LogFormat, LogLevel, LoggingError};

#[test]
fn test_second_initialization_fails()
{
    let directory = std::env::temp_dir().join(format!("stacklens-logging-{}", std::process::id()));
    let config = LogConfig {
        format: LogFormat::Json,
        level: Some(LogLevel::Debug),
        file: Some(directory.join("test.log")),
    };

    let guard = init_logging_with(&config).expect("first initialization succeeds");
    assert!(guard.is_some());
    assert!(directory.is_dir());

    tracing::warn!("written to the test log");

    let second = init_logging_with(&LogConfig::default());
    assert!(matches!(second, Err(LoggingError::InitializationFailed(_))));

    drop(guard);
    let _ = std::fs::remove_dir_all(&directory);
}
