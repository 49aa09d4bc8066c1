/*!
 * Integration tests for error handling and error logging
 *
 * These tests simulate upstream failures to verify:
 * - Error categorization and exit codes
 * - Non-fatal cache write failures
 * - Daily error log entries mirrored to the operation log
 */

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use starfinder::{
    config::StarfinderConfig,
    core::{
        api::EdsmEndpoints,
        http::{HttpResponse, RetryPolicy, RetryingClient},
        mock::MockTransport,
        observer::RecordingObserver,
        resolver::SystemResolver,
        search::SearchOrchestrator,
    },
    error::{ErrorCategory, StarfinderError, EXIT_FATAL, EXIT_PARTIAL},
    oplog::{ErrorLog, OperationEvent, OperationLogger, OPERATION_LOG_FILE},
};

fn resolver_for(mock: &Arc<MockTransport>) -> SystemResolver {
    SystemResolver::new(
        RetryingClient::new(mock.clone(), RetryPolicy::immediate(1)),
        EdsmEndpoints::default(),
        Duration::from_secs(10),
    )
}

#[test]
fn test_upstream_errors_are_partial_failures() {
    let mock = Arc::new(MockTransport::new());
    mock.push("/api-v1/system?", Ok(HttpResponse::new(502, "")));

    let err = resolver_for(&mock).resolve("Sol").unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Upstream);
    assert_eq!(err.exit_code(), EXIT_PARTIAL);
    assert!(!err.is_transient());
    // initial + 1 retry
    assert_eq!(mock.request_count(), 2);
}

#[test]
fn test_network_failure_becomes_resolution_error() {
    let mock = Arc::new(MockTransport::new());
    mock.push("/api-v1/system?", Err("operation timed out".to_string()));

    let err = resolver_for(&mock).resolve("Sol").unwrap_err();
    match err {
        StarfinderError::Resolution(message) => {
            assert!(message.contains("All 2 request attempts failed"));
            assert!(message.contains("operation timed out"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_invalid_radius_is_fatal() {
    let config = StarfinderConfig::default();
    let err = config.validate_radius(100.0).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(err.exit_code(), EXIT_FATAL);
    assert_eq!(
        err.to_string(),
        "Invalid radius 100: must be between 4 and 40 ly"
    );
}

#[test]
fn test_broken_config_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "retry_attempts = \"lots\"").unwrap();

    let err = StarfinderConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, StarfinderError::Config(_)));
    assert_eq!(err.exit_code(), EXIT_FATAL);
}

#[test]
fn test_unwritable_cache_does_not_fail_search() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    // a regular file where the cache directory should be
    fs::write(data_dir.join("cache"), b"in the way").unwrap();

    let config = StarfinderConfig {
        data_dir,
        backoff_factor_secs: 0.0,
        ..Default::default()
    };
    let mock = MockTransport::new();
    mock.push_json(
        "/api-v1/system?",
        json!({"name": "Sol", "coords": {"x": 0, "y": 0, "z": 0}}),
    );
    mock.push_json("/api-v1/sphere-systems", json!([{"name": "Sol", "distance": 0}]));

    let recorder = Arc::new(RecordingObserver::new());
    let search = SearchOrchestrator::from_config(&config, Arc::new(mock), recorder.clone()).unwrap();
    let outcome = search.search("Sol", 10.0);

    assert_eq!(outcome.systems.len(), 1);
    assert!(outcome.error.is_none());
    assert_eq!(recorder.count("cache_write_error"), 1);
}

#[test]
fn test_search_error_goes_to_error_log() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    let oplog = OperationLogger::new(&logs).unwrap();
    let errors = ErrorLog::new(&logs).with_operation_log(oplog);

    let mock = Arc::new(MockTransport::new());
    mock.push_json("/api-v1/system?", json!({}));
    let err = resolver_for(&mock).resolve("Nowhere").unwrap_err();

    let path = errors.record(&err.to_string()).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains(" - EDSM system API error: EDSM system endpoint returned unexpected result.\n\n"));

    let line = fs::read_to_string(logs.join(OPERATION_LOG_FILE)).unwrap();
    let event: OperationEvent = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(event.operation, "error_logged");
}
