/*!
 * Operation log and daily error log
 *
 * The operation log is JSON Lines, one object per event:
 *
 * ```text
 * {"timestamp":"2026-10-16T12:00:00+00:00","operation":"search_started","details":{"star":"Sol","radius":10.0}}
 * ```
 *
 * [`OperationLogger`] implements [`SearchObserver`], so handing it to the
 * search pipeline records every request and search event without the
 * pipeline knowing about files. The error log is plain text, one file per
 * day (`MM-DD-YYYY.txt`), for messages shown to the user.
 *
 * # Example
 *
 * ```no_run
 * use starfinder::oplog::OperationLogger;
 * use serde_json::json;
 * use std::path::Path;
 *
 * let logger = OperationLogger::new(Path::new("EDStarFinderData/logs")).unwrap();
 * logger.log("cache_clear", json!({"star": "Sol", "removed": 2}));
 * ```
 */

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::observer::SearchObserver;
use crate::error::{Result, StarfinderError};

pub const OPERATION_LOG_FILE: &str = "operations.log";

/// One line of the operation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEvent {
    /// RFC 3339 timestamp
    pub timestamp: String,
    pub operation: String,
    pub details: Value,
}

impl OperationEvent {
    pub fn new(operation: &str, details: Value) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            operation: operation.to_string(),
            details,
        }
    }
}

fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StarfinderError::OperationLog(format!("Failed to create log directory: {}", e))
            })?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StarfinderError::OperationLog(format!("Failed to open {}: {}", path.display(), e)))
}

/// Thread-safe JSON Lines writer for `<logs>/operations.log`
#[derive(Clone)]
pub struct OperationLogger {
    path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl OperationLogger {
    /// Open (or create) `operations.log` inside `logs_dir`
    pub fn new(logs_dir: &Path) -> Result<Self> {
        Self::at_path(&logs_dir.join(OPERATION_LOG_FILE))
    }

    pub fn at_path(path: &Path) -> Result<Self> {
        let file = open_append(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn emit(&self, event: &OperationEvent) -> Result<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| StarfinderError::OperationLog(format!("Failed to serialize event: {}", e)))?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| StarfinderError::OperationLog("log writer poisoned".to_string()))?;
        writeln!(writer, "{}", line)
            .map_err(|e| StarfinderError::OperationLog(format!("Failed to write log: {}", e)))?;
        writer
            .flush()
            .map_err(|e| StarfinderError::OperationLog(format!("Failed to flush log: {}", e)))?;
        Ok(())
    }

    /// Record an event; write failures are reported through tracing only
    pub fn log(&self, operation: &str, details: Value) {
        if let Err(e) = self.emit(&OperationEvent::new(operation, details)) {
            tracing::warn!(operation, error = %e, "operation log write failed");
        }
    }
}

impl SearchObserver for OperationLogger {
    fn on_request_start(&self, url: &str, timeout: Duration, retries: u32) {
        self.log(
            "request_start",
            json!({"url": url, "timeout": timeout.as_secs_f64(), "retries": retries}),
        );
    }

    fn on_request_end(&self, url: &str, status: u16, attempt: u32) {
        self.log(
            "request_end",
            json!({"url": url, "status_code": status, "attempt": attempt}),
        );
    }

    fn on_request_error(&self, url: &str, error: &str, attempt: u32) {
        self.log(
            "request_error",
            json!({"url": url, "error": error, "attempt": attempt}),
        );
    }

    fn on_system_request_start(&self, url: &str) {
        self.log("system_request_start", json!({"url": url}));
    }

    fn on_system_request_error(&self, error: &str) {
        self.log("system_request_error", json!({"error": error}));
    }

    fn on_sphere_request_start(&self, url: &str) {
        self.log("sphere_request_start", json!({"url": url}));
    }

    fn on_sphere_request_success(&self, status: u16, result_count: usize) {
        self.log(
            "sphere_request_success",
            json!({"status_code": status, "result_count": result_count}),
        );
    }

    fn on_sphere_request_error(&self, error: &str) {
        self.log("sphere_request_error", json!({"error": error}));
    }

    fn on_cache_write_error(&self, key: &str, error: &str) {
        self.log("cache_write_error", json!({"key": key, "error": error}));
    }

    fn on_search_started(&self, star: &str, radius: f64) {
        self.log("search_started", json!({"star": star, "radius": radius}));
    }

    fn on_search_fallback(&self, star: &str, from_radius: f64, to_radius: f64) {
        self.log(
            "search_fallback",
            json!({"star": star, "from_radius": from_radius, "to_radius": to_radius}),
        );
    }

    fn on_search_completed(&self, star: &str, radius: f64, results: usize) {
        self.log(
            "search_completed",
            json!({"star": star, "radius": radius, "results": results}),
        );
    }

    fn on_search_failed(&self, star: &str, error: Option<&str>) {
        self.log("search_failed", json!({"star": star, "error": error}));
    }

    fn on_radius_updated(&self, from_radius: f64, to_radius: f64) {
        self.log(
            "update_radius",
            json!({"old_radius": from_radius, "new_radius": to_radius}),
        );
    }

    fn on_results_exported(&self, path: &Path, count: usize) {
        self.log(
            "export_results",
            json!({"filename": path.display().to_string(), "result_count": count}),
        );
    }

    fn on_results_imported(&self, path: &Path, count: usize) {
        self.log(
            "import_results",
            json!({"file_path": path.display().to_string(), "result_count": count}),
        );
    }
}

/// Human-readable error log, one file per local day
pub struct ErrorLog {
    dir: PathBuf,
    oplog: Option<OperationLogger>,
}

impl ErrorLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            dir: logs_dir.to_path_buf(),
            oplog: None,
        }
    }

    /// Mirror every entry as an `error_logged` operation event
    pub fn with_operation_log(mut self, oplog: OperationLogger) -> Self {
        self.oplog = Some(oplog);
        self
    }

    /// Today's file, e.g. `10-16-2026.txt`
    pub fn current_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.txt", Local::now().format("%m-%d-%Y")))
    }

    /// Append `YYYY-MM-DD HH:MM:SS - message` and a blank line
    pub fn record(&self, message: &str) -> Result<PathBuf> {
        let path = self.current_path();
        let mut file = open_append(&path)?;
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        write!(file, "{} - {}\n\n", stamp, message)
            .map_err(|e| StarfinderError::OperationLog(format!("Failed to write error log: {}", e)))?;

        if let Some(ref oplog) = self.oplog {
            oplog.log(
                "error_logged",
                json!({"message": message, "file": path.display().to_string()}),
            );
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use tempfile::tempdir;

    fn read_events(path: &Path) -> Vec<OperationEvent> {
        let file = File::open(path).unwrap();
        BufReader::new(file)
            .lines()
            .map(|l| serde_json::from_str(&l.unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_log_writes_json_lines() {
        let dir = tempdir().unwrap();
        let logger = OperationLogger::new(dir.path()).unwrap();
        logger.log("cache_clear", json!({"star": "Sol", "removed": 2}));
        logger.log("update_radius", json!({"old_radius": 4.0, "new_radius": 10.0}));

        let events = read_events(&dir.path().join(OPERATION_LOG_FILE));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].operation, "cache_clear");
        assert_eq!(events[0].details["removed"], 2);
        assert!(chrono::DateTime::parse_from_rfc3339(&events[1].timestamp).is_ok());
    }

    #[test]
    fn test_appends_across_instances() {
        let dir = tempdir().unwrap();
        OperationLogger::new(dir.path()).unwrap().log("a", json!({}));
        OperationLogger::new(dir.path()).unwrap().log("b", json!({}));
        let events = read_events(&dir.path().join(OPERATION_LOG_FILE));
        let ops: Vec<&str> = events.iter().map(|e| e.operation.as_str()).collect();
        assert_eq!(ops, vec!["a", "b"]);
    }

    #[test]
    fn test_observer_events() {
        let dir = tempdir().unwrap();
        let logger = OperationLogger::new(dir.path()).unwrap();
        logger.on_search_started("Sol", 4.0);
        logger.on_search_fallback("Sol", 4.0, 16.0);
        logger.on_search_failed("Sol", None);

        let events = read_events(logger.path());
        assert_eq!(events[1].operation, "search_fallback");
        assert_eq!(events[1].details["to_radius"], 16.0);
        assert_eq!(events[2].details["error"], Value::Null);
    }

    #[test]
    fn test_error_log_entry_format() {
        let dir = tempdir().unwrap();
        let oplog = OperationLogger::new(dir.path()).unwrap();
        let errors = ErrorLog::new(dir.path()).with_operation_log(oplog.clone());

        let path = errors.record("EDSM system API error: boom").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name.len(), "10-16-2026.txt".len());
        assert!(name.ends_with(".txt"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with(" - EDSM system API error: boom\n\n"));
        assert_eq!(text.find(" - "), Some("2026-10-16 12:00:00".len()));

        let events = read_events(oplog.path());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, "error_logged");
    }
}
