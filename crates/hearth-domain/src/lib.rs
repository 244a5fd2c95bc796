//! Hearth Domain Layer
//!
//! This crate contains the core model for Hearth's resident connection graph.
//! It depends on nothing but `uuid` and defines the value objects, lifecycle
//! rules, and trait interfaces that the storage, engine and server layers
//! depend upon.
//!
//! ## Key Concepts
//!
//! - **Connection**: a directed request row between two residents that
//!   behaves as an undirected edge once accepted
//! - **Status**: `pending → accepted | rejected`, `{pending, accepted} → blocked`
//! - **PairKey**: the normalized unordered pair a connection belongs to
//! - **Resident**: read-only profile supplied by the identity directory
//! - **Page**: offset pagination with `has_next`/`has_prev` flags
//!
//! ## Architecture
//!
//! - Pure business rules only, no I/O
//! - Infrastructure implementations live in other crates
//! - Trait definitions for the edge store and the resident directory

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod page;
pub mod pair;
pub mod resident;
pub mod status;
pub mod traits;

// Re-exports for convenience
pub use connection::{
    Connection, ConnectionId, ConnectionMetadata, ConnectionType, ProximityLevel,
};
pub use page::{Page, PageRequest};
pub use pair::PairKey;
pub use resident::{Location, LocationFilter, Resident, UserId};
pub use status::{ConnectionStatus, Transition, TransitionError};
