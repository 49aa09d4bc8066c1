//! HTTP GET with bounded retries and exponential backoff.
//!
//! The client retries on throttling and gateway status codes
//! (429, 500, 502, 503, 504) and on transport failures. It never turns a
//! non-2xx status into an error: once the retry budget is spent the last
//! response is returned and the caller decides what the status means.
//!
//! Delay before retry `n` is `backoff_factor * 2^(n-1)`, so the default
//! factor of 0.5 s gives 0.5 s, 1 s, 2 s.
//!
//! ```no_run
//! use starfinder::core::http::{ReqwestTransport, RetryPolicy, RetryingClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let transport = Arc::new(ReqwestTransport::new().unwrap());
//! let client = RetryingClient::new(transport, RetryPolicy::default());
//! let response = client
//!     .get("https://www.edsm.net/api-v1/system?systemName=Sol", Duration::from_secs(10))
//!     .unwrap();
//! assert!(response.is_success());
//! ```

use rand::Rng;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::StarfinderConfig;
use crate::core::observer::{NoopObserver, SearchObserver};
use crate::error::{Result, StarfinderError};

/// Status codes that are retried by default
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// A fully-read HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Parsed `Retry-After` header (seconds form only)
    pub retry_after: Option<Duration>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fail with an `Http` error unless the status is 2xx
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(StarfinderError::Http(format!(
                "{} {} returned by server",
                self.status,
                status_reason(self.status)
            )))
        }
    }

    /// Decode the body as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

fn status_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Error",
    }
}

/// Performs a single GET without any retry logic
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse>;
}

/// Blocking `reqwest` transport
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("starfinder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StarfinderError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| {
                if e.is_builder() {
                    StarfinderError::Config(format!("Invalid request: {}", e))
                } else {
                    StarfinderError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response
            .text()
            .map_err(|e| StarfinderError::Http(format!("Failed to read body: {}", e)))?;

        Ok(HttpResponse {
            status,
            body,
            retry_after,
        })
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Base of the exponential backoff
    pub backoff_factor: Duration,

    /// Cap on a single backoff delay
    pub max_backoff: Duration,

    /// Jitter factor (0.0-1.0), 0 disables jitter
    pub jitter_factor: f64,

    /// Status codes that trigger a retry
    pub retry_statuses: Vec<u16>,

    /// Honour `Retry-After` on 429/503 when it asks for a longer wait
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_millis(500),
            max_backoff: Duration::from_secs(120),
            jitter_factor: 0.0,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_factor: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Retry count and backoff base from configuration
    pub fn from_config(config: &StarfinderConfig) -> Result<Self> {
        let backoff_factor = Duration::try_from_secs_f64(config.backoff_factor_secs).map_err(|e| {
            StarfinderError::Config(format!(
                "Invalid backoff_factor_secs {}: {}",
                config.backoff_factor_secs, e
            ))
        })?;
        Ok(Self {
            max_retries: config.retry_attempts,
            backoff_factor,
            ..Default::default()
        })
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        let base = self
            .backoff_factor
            .checked_mul(2_u32.pow(exponent))
            .unwrap_or(self.max_backoff);
        let capped = base.min(self.max_backoff);

        if self.jitter_factor > 0.0 && !capped.is_zero() {
            let jitter = rand::rng().random_range(0.0..self.jitter_factor);
            capped + Duration::from_secs_f64(capped.as_secs_f64() * jitter)
        } else {
            capped
        }
    }

    fn delay_for(&self, retry: u32, response: Option<&HttpResponse>) -> Duration {
        let computed = self.calculate_delay(retry);
        match response {
            Some(r) if self.respect_retry_after && matches!(r.status, 429 | 503) => r
                .retry_after
                .map(|ra| ra.min(self.max_backoff).max(computed))
                .unwrap_or(computed),
            _ => computed,
        }
    }
}

/// GET client that applies a [`RetryPolicy`] on top of an [`HttpTransport`]
#[derive(Clone)]
pub struct RetryingClient {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    observer: Arc<dyn SearchObserver>,
}

impl RetryingClient {
    pub fn new(transport: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issue a GET, retrying transient failures per the policy
    pub fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        let max_attempts = self.policy.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.observer
                .on_request_start(url, timeout, self.policy.max_retries);

            match self.transport.get(url, timeout) {
                Ok(response) => {
                    self.observer.on_request_end(url, response.status, attempt);

                    if attempt < max_attempts && self.policy.should_retry_status(response.status) {
                        let delay = self.policy.delay_for(attempt, Some(&response));
                        tracing::debug!(
                            url,
                            status = response.status,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying after retryable status"
                        );
                        pause(delay);
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let message = e.to_string();
                    self.observer.on_request_error(url, &message, attempt);

                    if !e.is_transient() {
                        return Err(e);
                    }
                    if attempt < max_attempts {
                        let delay = self.policy.delay_for(attempt, None);
                        tracing::debug!(
                            url,
                            error = %message,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying after transport error"
                        );
                        pause(delay);
                        continue;
                    }
                    return Err(StarfinderError::RetriesExhausted {
                        attempts: attempt,
                        last_error: message,
                    });
                }
            }
        }
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::MockTransport;
    use crate::core::observer::RecordingObserver;

    const URL: &str = "https://example.test/api";

    fn client(mock: &Arc<MockTransport>, retries: u32) -> RetryingClient {
        RetryingClient::new(mock.clone(), RetryPolicy::immediate(retries))
    }

    #[test]
    fn test_retries_until_success() {
        let mock = Arc::new(MockTransport::new());
        mock.push("/api", Ok(HttpResponse::new(503, "")));
        mock.push("/api", Ok(HttpResponse::new(503, "")));
        mock.push("/api", Ok(HttpResponse::new(200, "[]")));

        let response = client(&mock, 3).get(URL, Duration::from_secs(10)).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(mock.request_count(), 3);
    }

    #[test]
    fn test_non_retryable_status_returned_immediately() {
        let mock = Arc::new(MockTransport::new());
        mock.push("/api", Ok(HttpResponse::new(404, "")));
        mock.push("/api", Ok(HttpResponse::new(200, "")));

        let response = client(&mock, 3).get(URL, Duration::from_secs(10)).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_exhausted_status_returns_last_response() {
        let mock = Arc::new(MockTransport::new());
        mock.push("/api", Ok(HttpResponse::new(500, "oops")));

        let response = client(&mock, 2).get(URL, Duration::from_secs(10)).unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(mock.request_count(), 3);
    }

    #[test]
    fn test_transport_errors_exhaust_budget() {
        let mock = Arc::new(MockTransport::new());
        mock.push("/api", Err("connection refused".to_string()));

        let err = client(&mock, 3).get(URL, Duration::from_secs(10)).unwrap_err();
        match err {
            StarfinderError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 4);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mock.request_count(), 4);
    }

    struct RejectingTransport(std::sync::atomic::AtomicUsize);

    impl HttpTransport for RejectingTransport {
        fn get(&self, _url: &str, _timeout: Duration) -> Result<HttpResponse> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(StarfinderError::Config("Invalid request: relative URL".to_string()))
        }
    }

    #[test]
    fn test_permanent_transport_error_not_retried() {
        let transport = Arc::new(RejectingTransport(Default::default()));
        let client = RetryingClient::new(transport.clone(), RetryPolicy::immediate(3));

        let err = client.get(URL, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, StarfinderError::Config(_)));
        assert_eq!(transport.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transport_error_then_success() {
        let mock = Arc::new(MockTransport::new());
        mock.push("/api", Err("timed out".to_string()));
        mock.push("/api", Ok(HttpResponse::new(200, "{}")));

        let response = client(&mock, 1).get(URL, Duration::from_secs(1)).unwrap();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_zero_retries_single_attempt() {
        let mock = Arc::new(MockTransport::new());
        mock.push("/api", Ok(HttpResponse::new(429, "")));

        let response = client(&mock, 0).get(URL, Duration::from_secs(1)).unwrap();
        assert_eq!(response.status, 429);
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_every_attempt_is_observed() {
        let mock = Arc::new(MockTransport::new());
        mock.push("/api", Ok(HttpResponse::new(502, "")));
        mock.push("/api", Ok(HttpResponse::new(200, "")));
        let recorder = Arc::new(RecordingObserver::new());

        client(&mock, 3)
            .with_observer(recorder.clone())
            .get(URL, Duration::from_secs(10))
            .unwrap();

        assert_eq!(recorder.count("request_start"), 2);
        assert_eq!(
            recorder.events()[1],
            format!("request_end {} 502", URL)
        );
        assert_eq!(recorder.events()[3], format!("request_end {} 200", URL));
    }

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(500));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(1));
        assert_eq!(policy.calculate_delay(3), Duration::from_secs(2));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_backoff: Duration::from_secs(3),
            ..Default::default()
        };
        assert_eq!(policy.calculate_delay(10), Duration::from_secs(3));
        assert_eq!(policy.calculate_delay(64), Duration::from_secs(3));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy {
            jitter_factor: 0.5,
            ..Default::default()
        };
        for _ in 0..20 {
            let delay = policy.calculate_delay(2);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay < Duration::from_millis(1500));
        }
    }

    #[test]
    fn test_retry_after_extends_delay() {
        let policy = RetryPolicy::default();
        let throttled = HttpResponse::new(429, "").with_retry_after(Duration::from_secs(5));
        assert_eq!(policy.delay_for(1, Some(&throttled)), Duration::from_secs(5));

        let short = HttpResponse::new(503, "").with_retry_after(Duration::from_millis(10));
        assert_eq!(policy.delay_for(1, Some(&short)), Duration::from_millis(500));

        let ignored = RetryPolicy {
            respect_retry_after: false,
            ..Default::default()
        };
        assert_eq!(
            ignored.delay_for(1, Some(&throttled)),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_error_for_status() {
        assert!(HttpResponse::new(204, "").error_for_status().is_ok());
        let err = HttpResponse::new(404, "").error_for_status().unwrap_err();
        assert_eq!(err.to_string(), "HTTP error: 404 Not Found returned by server");
    }
}
