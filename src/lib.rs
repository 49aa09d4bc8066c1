/*!
 * Starfinder - nearby star systems from EDSM
 *
 * Resolves a system name to galactic coordinates, queries the systems inside
 * a sphere around it and returns those within the requested radius, sorted
 * by distance:
 * - Bounded retries with exponential backoff on throttling/gateway errors
 * - One automatic retry at a 16 ly fallback radius when nothing is in range
 * - Raw sphere responses cached on disk, keyed by star and radius
 * - JSON export/import of results
 * - JSON Lines operation log and a daily error log
 *
 * # Example
 *
 * ```no_run
 * use starfinder::config::StarfinderConfig;
 * use starfinder::core::http::ReqwestTransport;
 * use starfinder::core::observer::TracingObserver;
 * use starfinder::core::search::SearchOrchestrator;
 * use std::sync::Arc;
 *
 * let config = StarfinderConfig::default();
 * let transport = Arc::new(ReqwestTransport::new().unwrap());
 * let search = SearchOrchestrator::from_config(&config, transport, Arc::new(TracingObserver)).unwrap();
 *
 * let outcome = search.search("Sol", 10.0);
 * for system in &outcome.systems {
 *     println!("{} {:.2} ly", system.name, system.distance);
 * }
 * ```
 */

pub mod cli_style;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod oplog;
pub mod output;

// Re-export commonly used types
pub use config::StarfinderConfig;
pub use core::{
    Coordinates, FallbackPolicy, SearchObserver, SearchOrchestrator, SearchOutcome,
    SearchSession, SphereCache, StarSystem,
};
pub use error::{Result, StarfinderError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
