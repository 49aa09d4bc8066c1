//! Star name -> coordinates via the EDSM system endpoint.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::core::api::EdsmEndpoints;
use crate::core::http::RetryingClient;
use crate::core::model::Coordinates;
use crate::core::observer::{NoopObserver, SearchObserver};
use crate::error::{Result, StarfinderError};

/// A system found by name
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSystem {
    /// Canonical name as spelled by EDSM
    pub name: String,
    pub coords: Coordinates,
}

pub struct SystemResolver {
    client: RetryingClient,
    endpoints: EdsmEndpoints,
    timeout: Duration,
    observer: Arc<dyn SearchObserver>,
}

impl SystemResolver {
    pub fn new(client: RetryingClient, endpoints: EdsmEndpoints, timeout: Duration) -> Self {
        Self {
            client,
            endpoints,
            timeout,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Look up `star`. Every failure comes back as [`StarfinderError::Resolution`].
    pub fn resolve(&self, star: &str) -> Result<ResolvedSystem> {
        self.try_resolve(star).map_err(|e| {
            let message = match e {
                StarfinderError::Resolution(m) => m,
                other => other.to_string(),
            };
            self.observer.on_system_request_error(&message);
            StarfinderError::Resolution(message)
        })
    }

    fn try_resolve(&self, star: &str) -> Result<ResolvedSystem> {
        let url = self.endpoints.system_url(star)?;
        self.observer.on_system_request_start(&url);

        let response = self.client.get(&url, self.timeout)?.error_for_status()?;
        let body = response.json()?;
        parse_system(star, body)
    }
}

/// Interpret a system endpoint body. EDSM answers with either an object or a
/// one-element list, and with `[]` or `{}` for unknown names.
pub fn parse_system(star: &str, body: Value) -> Result<ResolvedSystem> {
    let info = match body {
        Value::Array(mut items) => {
            if items.is_empty() {
                return Err(StarfinderError::Resolution(format!(
                    "EDSM system endpoint returned empty result for '{}'",
                    star
                )));
            }
            items.swap_remove(0)
        }
        other => other,
    };

    let object = match info {
        Value::Object(map) if map.contains_key("name") => map,
        _ => {
            return Err(StarfinderError::Resolution(
                "EDSM system endpoint returned unexpected result.".to_string(),
            ))
        }
    };

    let coords = match object.get("coords") {
        Some(v) if is_present(v) => serde_json::from_value::<Coordinates>(v.clone())
            .map_err(|e| StarfinderError::Resolution(format!("Malformed coordinates: {}", e)))?,
        _ => {
            return Err(StarfinderError::Resolution(
                "Coordinates not available for system.".to_string(),
            ))
        }
    };

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(star)
        .to_string();

    Ok(ResolvedSystem { name, coords })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(m) => !m.is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}
