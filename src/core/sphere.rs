//! Nearby-systems query via the EDSM sphere endpoint.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::core::api::EdsmEndpoints;
use crate::core::cache::{cache_key, SphereCache};
use crate::core::http::RetryingClient;
use crate::core::model::{Coordinates, StarSystem};
use crate::core::observer::{NoopObserver, SearchObserver};
use crate::error::{Result, StarfinderError};

pub struct SphereQuery {
    client: RetryingClient,
    endpoints: EdsmEndpoints,
    timeout: Duration,
    cache: Option<SphereCache>,
    observer: Arc<dyn SearchObserver>,
}

impl SphereQuery {
    pub fn new(client: RetryingClient, endpoints: EdsmEndpoints, timeout: Duration) -> Self {
        Self {
            client,
            endpoints,
            timeout,
            cache: None,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Persist every successful response to `cache`
    pub fn with_cache(mut self, cache: SphereCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Fetch every system within `radius` of `coords`, unfiltered and in
    /// provider order. `star` names the cache entry.
    pub fn query(&self, star: &str, coords: &Coordinates, radius: f64) -> Result<Vec<StarSystem>> {
        match self.try_query(star, coords, radius) {
            Ok(systems) => Ok(systems),
            Err(e) => {
                let message = match e {
                    StarfinderError::Query(m) => m,
                    other => other.to_string(),
                };
                self.observer.on_sphere_request_error(&message);
                Err(StarfinderError::Query(message))
            }
        }
    }

    fn try_query(&self, star: &str, coords: &Coordinates, radius: f64) -> Result<Vec<StarSystem>> {
        let url = self.endpoints.sphere_url(coords, radius)?;
        self.observer.on_sphere_request_start(&url);

        let response = self.client.get(&url, self.timeout)?.error_for_status()?;
        let raw = normalize_sphere_body(response.json()?)?;
        let systems = decode_systems(&raw);

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(star, radius, &raw) {
                // best-effort: the query result stands
                tracing::warn!(error = %e, "could not cache sphere result");
                self.observer
                    .on_cache_write_error(&cache_key(star, radius), &e.to_string());
            }
        }

        self.observer
            .on_sphere_request_success(response.status, systems.len());
        Ok(systems)
    }
}

/// `{}` means "nothing found"; anything other than an array is malformed
pub fn normalize_sphere_body(body: Value) -> Result<Value> {
    match body {
        Value::Array(_) => Ok(body),
        Value::Object(ref map) if map.is_empty() => Ok(Value::Array(Vec::new())),
        _ => Err(StarfinderError::Query(
            "EDSM sphere-systems API returned unexpected result.".to_string(),
        )),
    }
}

/// Decode each record on its own; a record that is not an object is skipped
pub fn decode_systems(raw: &Value) -> Vec<StarSystem> {
    let Value::Array(items) = raw else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match StarSystem::deserialize(item) {
            Ok(system) => Some(system),
            Err(e) => {
                tracing::warn!(index, error = %e, "skipping undecodable sphere record");
                None
            }
        })
        .collect()
}
