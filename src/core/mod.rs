/*!
 * Core search pipeline
 *
 * Bottom-up: `http` (retrying GET) -> `resolver` and `sphere` (the two EDSM
 * endpoints) -> `search` (filter, fallback, sort) -> `session` (worker thread
 * and visible state). `cache` and `export` are the two on-disk formats.
 */

pub mod api;
pub mod cache;
pub mod export;
pub mod http;
pub mod mock;
pub mod model;
pub mod observer;
pub mod resolver;
pub mod search;
pub mod session;
pub mod sphere;

pub use cache::SphereCache;
pub use http::{HttpTransport, ReqwestTransport, RetryPolicy, RetryingClient};
pub use model::{Coordinates, StarSystem};
pub use observer::SearchObserver;
pub use search::{FallbackPolicy, SearchOrchestrator, SearchOutcome};
pub use session::SearchSession;
