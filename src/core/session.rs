/*!
 * Interactive search session
 *
 * Holds what the user is currently looking at (star, radius, results) and
 * runs searches on a worker thread. Only one search may be in flight at a
 * time. Every start bumps a generation counter and [`SearchSession::accept`]
 * drops outcomes from an older generation, so a result arriving after an
 * import or a newer search never clobbers the visible state.
 */

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::config::StarfinderConfig;
use crate::core::export::{default_export_path, export_results, import_results};
use crate::core::model::StarSystem;
use crate::core::observer::{NoopObserver, SearchObserver};
use crate::core::search::{SearchOrchestrator, SearchOutcome};
use crate::error::{Result, StarfinderError};

/// What the session currently shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub star: String,
    pub radius: f64,
    pub results: Vec<StarSystem>,
    pub last_outcome: Option<SearchOutcome>,
    pub show_details: bool,
}

/// A search running on a worker thread
pub struct SearchHandle {
    generation: u64,
    handle: JoinHandle<SearchOutcome>,
}

impl SearchHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the worker to finish
    pub fn join(self) -> Result<(u64, SearchOutcome)> {
        let generation = self.generation;
        self.handle
            .join()
            .map(|outcome| (generation, outcome))
            .map_err(|_| StarfinderError::Query("search worker stopped unexpectedly".to_string()))
    }
}

/// Clears the in-flight flag when the worker exits, panics included
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SearchSession {
    orchestrator: Arc<SearchOrchestrator>,
    config: StarfinderConfig,
    observer: Arc<dyn SearchObserver>,
    state: Mutex<SessionState>,
    in_flight: Arc<AtomicBool>,
    generation: AtomicU64,
}

impl SearchSession {
    pub fn new(orchestrator: SearchOrchestrator, config: StarfinderConfig) -> Self {
        let state = SessionState {
            radius: config.default_radius,
            ..Default::default()
        };
        Self {
            orchestrator: Arc::new(orchestrator),
            config,
            observer: Arc::new(NoopObserver),
            state: Mutex::new(state),
            in_flight: Arc::new(AtomicBool::new(false)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = observer;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // a poisoned lock still holds consistent data: every write is a plain assignment
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn radius(&self) -> f64 {
        self.lock().radius
    }

    pub fn results(&self) -> Vec<StarSystem> {
        self.lock().results.clone()
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Change the search radius, rejecting values outside the configured bounds
    pub fn set_radius(&self, radius: f64) -> Result<f64> {
        let radius = self.config.validate_radius(radius)?;
        let previous = {
            let mut state = self.lock();
            std::mem::replace(&mut state.radius, radius)
        };
        self.observer.on_radius_updated(previous, radius);
        Ok(radius)
    }

    pub fn set_show_details(&self, show: bool) {
        self.lock().show_details = show;
    }

    /// Start a search for `star` at the session radius
    pub fn start_search(&self, star: &str) -> Result<SearchHandle> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StarfinderError::SearchInProgress);
        }
        let guard = InFlightGuard(self.in_flight.clone());

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let radius = {
            let mut state = self.lock();
            state.star = star.trim().to_string();
            state.radius
        };

        let orchestrator = self.orchestrator.clone();
        let star = star.to_string();
        let spawned = thread::Builder::new()
            .name("starfinder-search".to_string())
            .spawn(move || {
                let _guard = guard;
                orchestrator.search(&star, radius)
            });

        match spawned {
            Ok(handle) => Ok(SearchHandle { generation, handle }),
            Err(e) => Err(StarfinderError::Io(e)),
        }
    }

    /// Install `outcome` if it belongs to the latest generation. A fallback
    /// outcome also moves the session radius to the radius actually used.
    ///
    /// Returns false when the outcome is stale and was discarded.
    pub fn accept(&self, generation: u64, outcome: SearchOutcome) -> bool {
        if generation != self.current_generation() {
            tracing::debug!(
                generation,
                current = self.current_generation(),
                "discarding stale search result"
            );
            return false;
        }
        let radius_change = {
            let mut state = self.lock();
            let previous = state.radius;
            if outcome.fallback_used {
                state.radius = outcome.radius_used;
            }
            state.results = outcome.systems.clone();
            state.last_outcome = Some(outcome);
            (previous != state.radius).then_some((previous, state.radius))
        };
        if let Some((from, to)) = radius_change {
            self.observer.on_radius_updated(from, to);
        }
        true
    }

    /// Start a search, wait for it and install its outcome
    pub fn search(&self, star: &str) -> Result<SearchOutcome> {
        let (generation, outcome) = self.start_search(star)?.join()?;
        self.accept(generation, outcome.clone());
        Ok(outcome)
    }

    /// Export the current results; `path` defaults to `<results>/<star>.json`
    pub fn export(&self, path: Option<&Path>) -> Result<PathBuf> {
        let (star, results) = {
            let state = self.lock();
            (state.star.clone(), state.results.clone())
        };
        if results.is_empty() {
            return Err(StarfinderError::Export(
                "No system data available to export.".to_string(),
            ));
        }
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_export_path(&self.config.results_dir(), &star),
        };
        export_results(&path, &results)?;
        self.observer.on_results_exported(&path, results.len());
        Ok(path)
    }

    /// Replace the current results with the contents of `path`, verbatim.
    ///
    /// Any search still running becomes stale.
    pub fn import(&self, path: &Path) -> Result<usize> {
        let systems = import_results(path)?;
        let count = systems.len();
        self.generation.fetch_add(1, Ordering::AcqRel);
        {
            let mut state = self.lock();
            state.results = systems;
            state.last_outcome = None;
        }
        self.observer.on_results_imported(path, count);
        Ok(count)
    }
}
