/*!
 * Search orchestration
 *
 * resolve -> sphere query -> radius filter -> (fallback) -> sort
 *
 * `search` never fails. Resolver and query errors become error text on the
 * returned [`SearchOutcome`], so a caller always has something to render.
 * When the requested radius finds nothing, the pipeline is rerun once at the
 * fallback radius (16 ly by default) and an informational notice is added.
 */

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::StarfinderConfig;
use crate::core::api::{format_radius, EdsmEndpoints};
use crate::core::cache::SphereCache;
use crate::core::http::{HttpTransport, RetryPolicy, RetryingClient};
use crate::core::model::StarSystem;
use crate::core::observer::{NoopObserver, SearchObserver};
use crate::core::resolver::SystemResolver;
use crate::core::sphere::SphereQuery;
use crate::error::{Result, StarfinderError};

/// Radius used when the requested radius comes back empty
pub const DEFAULT_FALLBACK_RADIUS: f64 = 16.0;

/// How an empty result is retried
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackPolicy {
    pub fallback_radius: f64,
    /// Number of reruns allowed per search
    pub max_fallback_depth: u32,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            fallback_radius: DEFAULT_FALLBACK_RADIUS,
            max_fallback_depth: 1,
        }
    }
}

impl FallbackPolicy {
    /// No fallback at all
    pub fn disabled() -> Self {
        Self {
            max_fallback_depth: 0,
            ..Default::default()
        }
    }

    fn applies_to(&self, radius: f64, depth: u32) -> bool {
        depth < self.max_fallback_depth && (radius - self.fallback_radius).abs() > f64::EPSILON
    }
}

/// A user-facing message attached to a search outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub category: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self.level {
            NoticeLevel::Info => "ℹ️ ",
            NoticeLevel::Warning => "⚠️ ",
        };
        write!(f, "{} {}: {}", icon, self.category, self.message)
    }
}

pub const FALLBACK_CATEGORY: &str = "No Stars Found";
pub const SEARCH_ISSUE_CATEGORY: &str = "Search Issue";

/// Everything a caller needs to render one search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub star: String,
    pub requested_radius: f64,
    /// Radius of the final pipeline run (the fallback radius if it kicked in)
    pub radius_used: f64,
    /// In range and sorted by ascending distance
    pub systems: Vec<StarSystem>,
    /// Newline-joined resolver/query errors
    pub error: Option<String>,
    pub notices: Vec<Notice>,
    pub fallback_used: bool,
    pub elapsed: Duration,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn fallback_notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices
            .iter()
            .filter(|n| n.category == FALLBACK_CATEGORY)
    }
}

pub struct SearchOrchestrator {
    resolver: SystemResolver,
    sphere: SphereQuery,
    policy: FallbackPolicy,
    deadline: Option<Duration>,
    observer: Arc<dyn SearchObserver>,
}

impl SearchOrchestrator {
    pub fn new(resolver: SystemResolver, sphere: SphereQuery) -> Self {
        Self {
            resolver,
            sphere,
            policy: FallbackPolicy::default(),
            deadline: None,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Wire a complete pipeline from configuration.
    ///
    /// The observer is shared by the HTTP client, resolver, sphere query and
    /// orchestrator; the sphere query writes to `config.cache_dir()`.
    pub fn from_config(
        config: &StarfinderConfig,
        transport: Arc<dyn HttpTransport>,
        observer: Arc<dyn SearchObserver>,
    ) -> Result<Self> {
        let endpoints = EdsmEndpoints::new(&config.api_base_url)?;
        let client = RetryingClient::new(transport, RetryPolicy::from_config(config)?)
            .with_observer(observer.clone());
        let timeout = config.request_timeout();

        let resolver = SystemResolver::new(client.clone(), endpoints.clone(), timeout)
            .with_observer(observer.clone());
        let sphere = SphereQuery::new(client, endpoints, timeout)
            .with_cache(SphereCache::new(config.cache_dir()))
            .with_observer(observer.clone());

        Ok(Self::new(resolver, sphere)
            .with_policy(FallbackPolicy {
                fallback_radius: config.fallback_radius,
                max_fallback_depth: 1,
            })
            .with_deadline(config.search_deadline())
            .with_observer(observer))
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    /// Run a full search for `star` within `requested_radius` light-years
    pub fn search(&self, star: &str, requested_radius: f64) -> SearchOutcome {
        let star = star.trim();
        let started = Instant::now();
        self.observer.on_search_started(star, requested_radius);

        let mut radius = requested_radius;
        let mut depth = 0;
        let mut notices = Vec::new();
        let mut errors = Vec::new();
        let mut systems = Vec::new();

        loop {
            match self.run_once(star, radius, started) {
                Err(e) => {
                    errors.push(e.to_string());
                    break;
                }
                Ok(in_range) if in_range.is_empty() && self.policy.applies_to(radius, depth) => {
                    let fallback = self.policy.fallback_radius;
                    tracing::info!(star, radius, fallback, "no systems in range, using fallback radius");
                    self.observer.on_search_fallback(star, radius, fallback);
                    notices.push(Notice {
                        level: NoticeLevel::Info,
                        category: FALLBACK_CATEGORY,
                        message: format!(
                            "No stars found within given radius, try searching a larger area?\n\
                             Now showing default {} ly radius.",
                            format_radius(fallback)
                        ),
                    });
                    radius = fallback;
                    depth += 1;
                }
                Ok(in_range) => {
                    systems = in_range;
                    break;
                }
            }
        }

        sort_by_distance(&mut systems);

        let error = if errors.is_empty() {
            None
        } else {
            Some(errors.join("\n"))
        };

        if let Some(ref text) = error {
            notices.push(Notice {
                level: NoticeLevel::Warning,
                category: SEARCH_ISSUE_CATEGORY,
                message: format!(
                    "An issue occurred during search:\n{}\n\n\
                     Please check the spelling or try increasing the search radius.",
                    text
                ),
            });
        }

        if systems.is_empty() {
            self.observer.on_search_failed(star, error.as_deref());
        } else {
            self.observer
                .on_search_completed(star, radius, systems.len());
        }

        SearchOutcome {
            star: star.to_string(),
            requested_radius,
            radius_used: radius,
            systems,
            error,
            notices,
            fallback_used: depth > 0,
            elapsed: started.elapsed(),
        }
    }

    /// Resolve, query and filter at a single radius
    fn run_once(&self, star: &str, radius: f64, started: Instant) -> Result<Vec<StarSystem>> {
        if star.is_empty() {
            return Err(StarfinderError::Resolution("No star name given.".to_string()));
        }

        self.check_deadline(started)?;
        let resolved = self.resolver.resolve(star)?;

        self.check_deadline(started)?;
        let systems = self.sphere.query(star, &resolved.coords, radius)?;

        Ok(filter_within(systems, radius))
    }

    fn check_deadline(&self, started: Instant) -> Result<()> {
        match self.deadline {
            Some(limit) if started.elapsed() >= limit => Err(StarfinderError::DeadlineExceeded(limit)),
            _ => Ok(()),
        }
    }
}

/// Keep systems whose distance does not exceed `radius`
pub fn filter_within(systems: Vec<StarSystem>, radius: f64) -> Vec<StarSystem> {
    systems
        .into_iter()
        .filter(|s| s.distance <= radius)
        .collect()
}

/// Stable ascending sort by distance
pub fn sort_by_distance(systems: &mut [StarSystem]) {
    systems.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mock::MockTransport;
    use crate::core::model::Coordinates;
    use crate::core::observer::RecordingObserver;
    use serde_json::json;

    const SYSTEM: &str = "/api-v1/system?";
    const SPHERE: &str = "/api-v1/sphere-systems";

    fn orchestrator(mock: &Arc<MockTransport>) -> SearchOrchestrator {
        let client = RetryingClient::new(mock.clone(), RetryPolicy::immediate(0));
        let endpoints = EdsmEndpoints::default();
        let timeout = Duration::from_secs(10);
        SearchOrchestrator::new(
            SystemResolver::new(client.clone(), endpoints.clone(), timeout),
            SphereQuery::new(client, endpoints, timeout),
        )
    }

    fn sol(mock: &MockTransport) {
        mock.push_json(SYSTEM, json!({"name": "Sol", "coords": {"x": 0, "y": 0, "z": 0}}));
    }

    #[test]
    fn test_filter_within() {
        let systems = vec![
            StarSystem::new("A", 3.0),
            StarSystem::new("B", 10.0),
            StarSystem::new("C", 10.01),
        ];
        let names: Vec<String> = filter_within(systems, 10.0)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut systems = vec![
            StarSystem::new("late", 2.0),
            StarSystem::new("zero-a", 0.0),
            StarSystem::new("zero-b", 0.0),
            StarSystem::new("mid", 1.0),
        ];
        sort_by_distance(&mut systems);
        let names: Vec<&str> = systems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zero-a", "zero-b", "mid", "late"]);
    }

    #[test]
    fn test_sol_scenario() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(
            SPHERE,
            json!([
                {"name": "Alpha Centauri", "distance": 4.38, "coords": {"x": 3.03, "y": -0.09, "z": 3.16}},
                {"name": "Sol", "distance": 0, "coords": {"x": 0, "y": 0, "z": 0}}
            ]),
        );

        let outcome = orchestrator(&mock).search("Sol", 10.0);
        assert!(outcome.error.is_none());
        assert!(!outcome.fallback_used);
        let names: Vec<&str> = outcome.systems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Sol", "Alpha Centauri"]);
        assert_eq!(outcome.systems[0].coords, Some(Coordinates::new(0.0, 0.0, 0.0)));
        assert!(outcome.notices.is_empty());
    }

    #[test]
    fn test_out_of_range_records_dropped() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(
            SPHERE,
            json!([{"name": "Edge", "distance": 10.4}, {"name": "In", "distance": 9.9}]),
        );
        let outcome = orchestrator(&mock).search("Sol", 10.0);
        assert_eq!(outcome.systems.len(), 1);
        assert!(outcome.systems.iter().all(|s| s.distance <= 10.0));
    }

    #[test]
    fn test_unparseable_distance_sorts_first() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(
            SPHERE,
            json!([
                {"name": "Wolf 359", "distance": 7.78},
                {"name": "Mystery", "distance": "far"},
                {"name": "Alpha Centauri", "distance": "4.38"}
            ]),
        );
        let outcome = orchestrator(&mock).search("Sol", 10.0);
        assert!(outcome.error.is_none());
        let names: Vec<&str> = outcome.systems.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Mystery", "Alpha Centauri", "Wolf 359"]);
        assert_eq!(outcome.systems[0].distance, 0.0);
    }

    #[test]
    fn test_single_fallback_with_single_notice() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(SPHERE, json!({}));
        mock.push_json(SPHERE, json!([{"name": "Barnard's Star", "distance": 5.95}]));
        let recorder = Arc::new(RecordingObserver::new());

        let outcome = orchestrator(&mock)
            .with_observer(recorder.clone())
            .search("Sol", 4.0);

        assert!(outcome.fallback_used);
        assert_eq!(outcome.radius_used, 16.0);
        assert_eq!(outcome.requested_radius, 4.0);
        assert_eq!(outcome.systems.len(), 1);
        assert_eq!(outcome.fallback_notices().count(), 1);
        assert_eq!(outcome.notices[0].level, NoticeLevel::Info);
        assert!(outcome.notices[0].message.contains("16 ly"));

        let sphere_urls: Vec<String> = mock
            .requests()
            .into_iter()
            .filter(|u| u.contains(SPHERE))
            .collect();
        assert_eq!(sphere_urls.len(), 2);
        assert!(sphere_urls[0].contains("radius=4&"));
        assert!(sphere_urls[1].contains("radius=16&"));
        assert_eq!(recorder.count("search_fallback"), 1);
    }

    #[test]
    fn test_fallback_happens_at_most_once() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(SPHERE, json!([]));

        let outcome = orchestrator(&mock).search("Sol", 8.0);
        assert!(outcome.systems.is_empty());
        assert!(outcome.error.is_none());
        assert_eq!(outcome.fallback_notices().count(), 1);
        assert_eq!(mock.count_matching(SPHERE), 2);
    }

    #[test]
    fn test_no_fallback_at_fallback_radius() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(SPHERE, json!([]));
        let recorder = Arc::new(RecordingObserver::new());

        let outcome = orchestrator(&mock)
            .with_observer(recorder.clone())
            .search("Sol", 16.0);
        assert!(outcome.systems.is_empty());
        assert!(outcome.notices.is_empty());
        assert!(!outcome.fallback_used);
        assert_eq!(mock.count_matching(SPHERE), 1);
        assert_eq!(recorder.count("search_failed"), 1);
    }

    #[test]
    fn test_fallback_disabled() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(SPHERE, json!([]));
        let outcome = orchestrator(&mock)
            .with_policy(FallbackPolicy::disabled())
            .search("Sol", 4.0);
        assert!(!outcome.fallback_used);
        assert_eq!(mock.count_matching(SPHERE), 1);
    }

    #[test]
    fn test_resolution_error_is_terminal() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(SYSTEM, json!([]));

        let outcome = orchestrator(&mock).search("Nowhere", 4.0);
        assert!(outcome.systems.is_empty());
        assert!(!outcome.fallback_used);
        let error = outcome.error.unwrap();
        assert!(error.starts_with("EDSM system API error:"));
        assert_eq!(mock.count_matching(SPHERE), 0);
        assert_eq!(outcome.notices.len(), 1);
        assert_eq!(outcome.notices[0].category, SEARCH_ISSUE_CATEGORY);
    }

    #[test]
    fn test_query_error_is_terminal() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(SPHERE, json!("nope"));

        let outcome = orchestrator(&mock).search("Sol", 4.0);
        assert!(outcome.systems.is_empty());
        assert!(outcome
            .error
            .unwrap()
            .starts_with("EDSM sphere-systems API error:"));
        assert_eq!(mock.count_matching(SPHERE), 1);
    }

    #[test]
    fn test_error_during_fallback_is_reported() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(SPHERE, json!([]));
        mock.push_json(SPHERE, json!(42));

        let outcome = orchestrator(&mock).search("Sol", 4.0);
        assert!(outcome.fallback_used);
        assert!(outcome.error.is_some());
        assert_eq!(outcome.notices.len(), 2);
    }

    #[test]
    fn test_empty_name_skips_network() {
        let mock = Arc::new(MockTransport::new());
        let outcome = orchestrator(&mock).search("   ", 10.0);
        assert!(outcome.error.is_some());
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_deadline_exceeded() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        let outcome = orchestrator(&mock)
            .with_deadline(Some(Duration::ZERO))
            .search("Sol", 10.0);
        let error = outcome.error.unwrap();
        assert!(error.contains("deadline"));
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_search_trims_name() {
        let mock = Arc::new(MockTransport::new());
        sol(&mock);
        mock.push_json(SPHERE, json!([{"name": "Sol", "distance": 0}]));
        let outcome = orchestrator(&mock).search("  Sol ", 10.0);
        assert_eq!(outcome.star, "Sol");
        assert!(mock.requests()[0].contains("systemName=Sol&"));
    }
}
