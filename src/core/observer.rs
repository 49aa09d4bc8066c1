//! Observer hooks invoked by the search pipeline.
//!
//! The HTTP client, resolver, sphere query and orchestrator never write logs
//! themselves. They call a [`SearchObserver`], and the application decides
//! where those events go (operation log, tracing, nowhere).

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Callbacks for request and search lifecycle events. All methods default to no-ops.
pub trait SearchObserver: Send + Sync {
    fn on_request_start(&self, _url: &str, _timeout: Duration, _retries: u32) {}

    fn on_request_end(&self, _url: &str, _status: u16, _attempt: u32) {}

    fn on_request_error(&self, _url: &str, _error: &str, _attempt: u32) {}

    fn on_system_request_start(&self, _url: &str) {}

    fn on_system_request_error(&self, _error: &str) {}

    fn on_sphere_request_start(&self, _url: &str) {}

    fn on_sphere_request_success(&self, _status: u16, _result_count: usize) {}

    fn on_sphere_request_error(&self, _error: &str) {}

    fn on_cache_write_error(&self, _key: &str, _error: &str) {}

    fn on_search_started(&self, _star: &str, _radius: f64) {}

    fn on_search_fallback(&self, _star: &str, _from_radius: f64, _to_radius: f64) {}

    fn on_search_completed(&self, _star: &str, _radius: f64, _results: usize) {}

    fn on_search_failed(&self, _star: &str, _error: Option<&str>) {}

    fn on_radius_updated(&self, _from_radius: f64, _to_radius: f64) {}

    fn on_results_exported(&self, _path: &Path, _count: usize) {}

    fn on_results_imported(&self, _path: &Path, _count: usize) {}
}

/// Observer that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SearchObserver for NoopObserver {}

/// Observer that forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SearchObserver for TracingObserver {
    fn on_request_start(&self, url: &str, timeout: Duration, retries: u32) {
        tracing::debug!(url, timeout_secs = timeout.as_secs_f64(), retries, "request start");
    }

    fn on_request_end(&self, url: &str, status: u16, attempt: u32) {
        tracing::debug!(url, status, attempt, "request end");
    }

    fn on_request_error(&self, url: &str, error: &str, attempt: u32) {
        tracing::warn!(url, error, attempt, "request failed");
    }

    fn on_system_request_error(&self, error: &str) {
        tracing::warn!(error, "system lookup failed");
    }

    fn on_sphere_request_success(&self, status: u16, result_count: usize) {
        tracing::debug!(status, result_count, "sphere query succeeded");
    }

    fn on_sphere_request_error(&self, error: &str) {
        tracing::warn!(error, "sphere query failed");
    }

    fn on_cache_write_error(&self, key: &str, error: &str) {
        tracing::warn!(key, error, "cache write failed");
    }

    fn on_search_started(&self, star: &str, radius: f64) {
        tracing::info!(star, radius, "search started");
    }

    fn on_search_fallback(&self, star: &str, from_radius: f64, to_radius: f64) {
        tracing::info!(star, from_radius, to_radius, "no systems in range, falling back");
    }

    fn on_search_completed(&self, star: &str, radius: f64, results: usize) {
        tracing::info!(star, radius, results, "search completed");
    }

    fn on_search_failed(&self, star: &str, error: Option<&str>) {
        tracing::warn!(star, error = error.unwrap_or(""), "search found nothing");
    }

    fn on_radius_updated(&self, from_radius: f64, to_radius: f64) {
        tracing::debug!(from_radius, to_radius, "search radius updated");
    }
}

/// Fans every event out to several observers
#[derive(Clone, Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn SearchObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

macro_rules! fan_out {
    ($self:ident . $method:ident ( $($arg:expr),* )) => {
        for observer in &$self.observers {
            observer.$method($($arg),*);
        }
    };
}

impl SearchObserver for CompositeObserver {
    fn on_request_start(&self, url: &str, timeout: Duration, retries: u32) {
        fan_out!(self.on_request_start(url, timeout, retries));
    }

    fn on_request_end(&self, url: &str, status: u16, attempt: u32) {
        fan_out!(self.on_request_end(url, status, attempt));
    }

    fn on_request_error(&self, url: &str, error: &str, attempt: u32) {
        fan_out!(self.on_request_error(url, error, attempt));
    }

    fn on_system_request_start(&self, url: &str) {
        fan_out!(self.on_system_request_start(url));
    }

    fn on_system_request_error(&self, error: &str) {
        fan_out!(self.on_system_request_error(error));
    }

    fn on_sphere_request_start(&self, url: &str) {
        fan_out!(self.on_sphere_request_start(url));
    }

    fn on_sphere_request_success(&self, status: u16, result_count: usize) {
        fan_out!(self.on_sphere_request_success(status, result_count));
    }

    fn on_sphere_request_error(&self, error: &str) {
        fan_out!(self.on_sphere_request_error(error));
    }

    fn on_cache_write_error(&self, key: &str, error: &str) {
        fan_out!(self.on_cache_write_error(key, error));
    }

    fn on_search_started(&self, star: &str, radius: f64) {
        fan_out!(self.on_search_started(star, radius));
    }

    fn on_search_fallback(&self, star: &str, from_radius: f64, to_radius: f64) {
        fan_out!(self.on_search_fallback(star, from_radius, to_radius));
    }

    fn on_search_completed(&self, star: &str, radius: f64, results: usize) {
        fan_out!(self.on_search_completed(star, radius, results));
    }

    fn on_search_failed(&self, star: &str, error: Option<&str>) {
        fan_out!(self.on_search_failed(star, error));
    }

    fn on_radius_updated(&self, from_radius: f64, to_radius: f64) {
        fan_out!(self.on_radius_updated(from_radius, to_radius));
    }

    fn on_results_exported(&self, path: &Path, count: usize) {
        fan_out!(self.on_results_exported(path, count));
    }

    fn on_results_imported(&self, path: &Path, count: usize) {
        fan_out!(self.on_results_imported(path, count));
    }
}

/// Observer that records event names in memory, for tests and diagnostics
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events, oldest first
    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of recorded events whose name starts with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    fn push(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl SearchObserver for RecordingObserver {
    fn on_request_start(&self, url: &str, _timeout: Duration, _retries: u32) {
        self.push(format!("request_start {}", url));
    }

    fn on_request_end(&self, url: &str, status: u16, _attempt: u32) {
        self.push(format!("request_end {} {}", url, status));
    }

    fn on_request_error(&self, url: &str, error: &str, _attempt: u32) {
        self.push(format!("request_error {} {}", url, error));
    }

    fn on_system_request_start(&self, url: &str) {
        self.push(format!("system_request_start {}", url));
    }

    fn on_system_request_error(&self, error: &str) {
        self.push(format!("system_request_error {}", error));
    }

    fn on_sphere_request_start(&self, url: &str) {
        self.push(format!("sphere_request_start {}", url));
    }

    fn on_sphere_request_success(&self, status: u16, result_count: usize) {
        self.push(format!("sphere_request_success {} {}", status, result_count));
    }

    fn on_sphere_request_error(&self, error: &str) {
        self.push(format!("sphere_request_error {}", error));
    }

    fn on_cache_write_error(&self, key: &str, error: &str) {
        self.push(format!("cache_write_error {} {}", key, error));
    }

    fn on_search_started(&self, star: &str, radius: f64) {
        self.push(format!("search_started {} {}", star, radius));
    }

    fn on_search_fallback(&self, star: &str, from_radius: f64, to_radius: f64) {
        self.push(format!("search_fallback {} {} {}", star, from_radius, to_radius));
    }

    fn on_search_completed(&self, star: &str, radius: f64, results: usize) {
        self.push(format!("search_completed {} {} {}", star, radius, results));
    }

    fn on_search_failed(&self, star: &str, _error: Option<&str>) {
        self.push(format!("search_failed {}", star));
    }

    fn on_radius_updated(&self, from_radius: f64, to_radius: f64) {
        self.push(format!("update_radius {} {}", from_radius, to_radius));
    }

    fn on_results_exported(&self, path: &Path, count: usize) {
        self.push(format!("export_results {} {}", path.display(), count));
    }

    fn on_results_imported(&self, path: &Path, count: usize) {
        self.push(format!("import_results {} {}", path.display(), count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_fans_out() {
        let a = Arc::new(RecordingObserver::new());
        let b = Arc::new(RecordingObserver::new());
        let composite = CompositeObserver::new().with(a.clone()).with(b.clone());
        assert_eq!(composite.len(), 2);

        composite.on_search_started("Sol", 10.0);
        composite.on_search_completed("Sol", 10.0, 2);

        assert_eq!(a.events(), vec!["search_started Sol 10", "search_completed Sol 10 2"]);
        assert_eq!(a.events(), b.events());
    }

    #[test]
    fn test_recording_count() {
        let rec = RecordingObserver::new();
        rec.on_request_start("http://a", Duration::from_secs(10), 3);
        rec.on_request_end("http://a", 503, 1);
        rec.on_request_start("http://a", Duration::from_secs(10), 3);
        assert_eq!(rec.count("request_start"), 2);
        assert_eq!(rec.count("request_end"), 1);
    }

    #[test]
    fn test_noop_is_silent() {
        let noop = NoopObserver;
        noop.on_search_failed("Sol", Some("boom"));
        assert!(CompositeObserver::new().is_empty());
    }
}
