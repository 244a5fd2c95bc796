//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the graph logic and
//! infrastructure. Implementations live in other crates.

use crate::{Connection, ConnectionId, ConnectionStatus, LocationFilter, Resident, UserId};

/// Result of inserting a new request row
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The row was stored
    Inserted(ConnectionId),

    /// A pending or accepted edge already occupies the pair
    Duplicate {
        /// The edge that occupies the pair
        existing: ConnectionId,
    },

    /// One of the two residents has blocked the other
    Blocked,
}

/// Result of a compare-and-set status update
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The update applied; carries the edge as stored afterwards
    Applied(Connection),

    /// The expected status no longer matched
    Stale {
        /// Status found instead, `None` if the row is gone
        current: Option<ConnectionStatus>,
    },
}

/// Trait for storing and retrieving connection rows
///
/// Implemented by the infrastructure layer (hearth-store). The store is the
/// only writer of `status` and `accepted_at`.
pub trait EdgeStore {
    /// Error type for store operations
    type Error;

    /// Insert a pending request
    ///
    /// The active-pair and blocked-pair checks must be atomic with the
    /// insert itself.
    fn insert(&mut self, edge: Connection) -> Result<InsertOutcome, Self::Error>;

    /// Get a connection by ID
    fn get(&self, id: ConnectionId) -> Result<Option<Connection>, Self::Error>;

    /// Get the connection between an unordered pair, checking both directions
    ///
    /// When several rows exist the active one wins, then a block, then the
    /// most recently updated row.
    fn find_by_pair(&self, a: &UserId, b: &UserId) -> Result<Option<Connection>, Self::Error>;

    /// Accepted edges incident to `user`
    fn find_accepted(&self, user: &UserId) -> Result<Vec<Connection>, Self::Error>;

    /// Accepted edges incident to any of `users`, in one round trip
    fn find_accepted_for(&self, users: &[UserId]) -> Result<Vec<Connection>, Self::Error>;

    /// Pending edges incident to `user`, either direction
    fn find_pending(&self, user: &UserId) -> Result<Vec<Connection>, Self::Error>;

    /// Blocked edges incident to `user`, either direction
    fn find_blocked(&self, user: &UserId) -> Result<Vec<Connection>, Self::Error>;

    /// Every edge incident to `user`
    fn find_incident(&self, user: &UserId) -> Result<Vec<Connection>, Self::Error>;

    /// Move `id` from `expected` to `new` only if it is still `expected`
    ///
    /// `accepted_at` is written only when `new` is accepted and it was unset.
    fn update_status(
        &mut self,
        id: ConnectionId,
        new: ConnectionStatus,
        expected: ConnectionStatus,
        now: u64,
    ) -> Result<CasOutcome, Self::Error>;

    /// Hard delete `id` if it is still `expected`
    ///
    /// Returns `false` when no row with that id and status existed, so a
    /// removal can never erase a block applied after it was validated.
    fn delete(&mut self, id: ConnectionId, expected: ConnectionStatus) -> Result<bool, Self::Error>;
}

/// Read-only lookup of resident profiles
///
/// The graph never owns profile data.
pub trait ResidentDirectory {
    /// Error type for directory lookups
    type Error;

    /// Get a resident by ID
    fn get_resident(&self, id: &UserId) -> Result<Option<Resident>, Self::Error>;

    /// Get every known resident among `ids`; unknown ids are skipped
    fn get_residents(&self, ids: &[UserId]) -> Result<Vec<Resident>, Self::Error>;

    /// Residents whose location satisfies `filter`
    fn residents_matching(&self, filter: &LocationFilter) -> Result<Vec<Resident>, Self::Error>;
}
