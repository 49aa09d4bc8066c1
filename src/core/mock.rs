//! Scripted HTTP transport for testing
//!
//! Responses are queued per URL fragment. Each request pops the next queued
//! response for the first route whose fragment occurs in the URL; the final
//! response of a route repeats once its queue is down to one entry. Unrouted
//! requests get a 404.
//!
//! # Example
//!
//! ```rust
//! use starfinder::core::http::{HttpResponse, HttpTransport};
//! use starfinder::core::mock::MockTransport;
//! use std::time::Duration;
//!
//! let mock = MockTransport::new();
//! mock.push("/api-v1/system", Ok(HttpResponse::new(200, r#"{"name":"Sol"}"#)));
//!
//! let response = mock
//!     .get("https://www.edsm.net/api-v1/system?systemName=Sol", Duration::from_secs(1))
//!     .unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(mock.request_count(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::http::{HttpResponse, HttpTransport};
use crate::error::{Result, StarfinderError};

type Scripted = std::result::Result<HttpResponse, String>;

#[derive(Debug, Default)]
struct Route {
    fragment: String,
    queue: VecDeque<Scripted>,
}

/// In-memory [`HttpTransport`] returning scripted responses
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    /// Create a transport with no routes
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response (or transport error message) for URLs containing `fragment`
    pub fn push(&self, fragment: &str, response: Scripted) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|r| r.fragment == fragment) {
            Some(route) => route.queue.push_back(response),
            None => routes.push(Route {
                fragment: fragment.to_string(),
                queue: VecDeque::from([response]),
            }),
        }
    }

    /// Queue a 200 response with a JSON body
    pub fn push_json(&self, fragment: &str, body: serde_json::Value) {
        self.push(fragment, Ok(HttpResponse::new(200, body.to_string())));
    }

    /// URLs requested so far, oldest first
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Number of requests whose URL contains `fragment`
    pub fn count_matching(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.contains(fragment))
            .count()
    }
}

impl HttpTransport for MockTransport {
    fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());

        let mut routes = self.routes.lock().unwrap();
        let scripted = routes
            .iter_mut()
            .find(|r| url.contains(&r.fragment))
            .and_then(|route| {
                if route.queue.len() > 1 {
                    route.queue.pop_front()
                } else {
                    route.queue.front().cloned()
                }
            });

        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(StarfinderError::Http(message)),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}
