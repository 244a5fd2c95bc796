//! Hearth Engine
//!
//! Connection lifecycle, graph queries and neighbor recommendations on top
//! of an [`EdgeStore`](hearth_domain::traits::EdgeStore) and a
//! [`ResidentDirectory`](hearth_domain::traits::ResidentDirectory).
//!
//! # Overview
//!
//! - **Lifecycle**: request, accept, reject, block and remove connections.
//!   Every change is a compare-and-set on the status that was read.
//! - **Graph**: neighbors, mutual connections and discovery candidates,
//!   re-read from the store on every call.
//! - **Scorer**: pure scoring of a candidate for a requester.
//! - **Recommend**: bulk-fetch the candidate pool, score it, return the top
//!   entries or a paginated discovery listing.
//!
//! # Scoring
//!
//! | Signal | Points |
//! |--------|--------|
//! | Base | 50 |
//! | Same neighborhood | +30 |
//! | Mutual connections | +5 each, at most +20 |
//! | Shared interests | +2 each, at most +10 |
//!
//! The sum is clamped to 100.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::{Arc, Mutex};
//! use hearth_domain::{ConnectionType, UserId};
//! use hearth_engine::{ConnectionEngine, EngineConfig};
//! use hearth_store::{ResidentRegistry, SqliteStore};
//!
//! let store = Arc::new(Mutex::new(SqliteStore::new(":memory:")?));
//! let registry = Arc::new(ResidentRegistry::new());
//! let engine = ConnectionEngine::new(store, registry, EngineConfig::default())?;
//!
//! let edge = engine.request_connection(&ada, &obi, ConnectionType::Connect)?;
//! engine.accept_connection(&obi, edge.id)?;
//! let suggestions = engine.recommend(&ada, None)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod engine;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod recommend;
pub mod scorer;

pub use config::EngineConfig;
pub use engine::{Clock, ConnectionEngine};
pub use error::{EngineError, ErrorKind};
pub use lifecycle::{ConnectionFilter, ConnectionStats, ConnectionView, PendingRequests};
pub use recommend::{
    DiscoverOrder, DiscoverQuery, DiscoveryItem, PendingDirection, Recommendation,
    Recommendations,
};
pub use scorer::{Reason, ReasonTag, Score};
