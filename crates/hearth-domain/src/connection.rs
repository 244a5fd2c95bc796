//! Connection module - the edge between two residents

use std::fmt;

use crate::{ConnectionStatus, PairKey, Resident, Transition, TransitionError, UserId};

/// Unique identifier for a connection based on UUIDv7
///
/// UUIDv7 ids sort by creation time, which keeps "most recent row for a
/// pair" queries cheap without a separate sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u128);

impl ConnectionId {
    /// Generate a new UUIDv7-based ConnectionId
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_domain::ConnectionId;
    ///
    /// let id = ConnectionId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a ConnectionId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a ConnectionId from its UUID string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid connection id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl std::str::FromStr for ConnectionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

/// Nature of the relationship once accepted
///
/// Purely descriptive: the state machine treats every type the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ConnectionType {
    /// Plain neighborly connection
    #[default]
    Connect,

    /// Someone the resident vouches for
    Trusted,

    /// Works together
    Colleague,

    /// Relatives
    Family,
}

impl ConnectionType {
    /// Get the type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Connect => "connect",
            ConnectionType::Trusted => "trusted",
            ConnectionType::Colleague => "colleague",
            ConnectionType::Family => "family",
        }
    }

    /// Parse a type from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "connect" => Some(ConnectionType::Connect),
            "trusted" => Some(ConnectionType::Trusted),
            "colleague" => Some(ConnectionType::Colleague),
            "family" => Some(ConnectionType::Family),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid connection type: {}", s))
    }
}

/// How close two residents live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProximityLevel {
    /// Same neighborhood or estate
    SameNeighborhood,

    /// Different neighborhood, same district
    SameDistrict,

    /// Anywhere else
    Elsewhere,
}

impl ProximityLevel {
    /// Get the level name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProximityLevel::SameNeighborhood => "same_neighborhood",
            ProximityLevel::SameDistrict => "same_district",
            ProximityLevel::Elsewhere => "elsewhere",
        }
    }

    /// Parse a level from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "same_neighborhood" => Some(ProximityLevel::SameNeighborhood),
            "same_district" => Some(ProximityLevel::SameDistrict),
            "elsewhere" => Some(ProximityLevel::Elsewhere),
            _ => None,
        }
    }
}

/// Signals captured when a request is made
///
/// Write-once: the record describes the pair at request time and is never
/// recomputed, even after the graph around it changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    /// Record layout version
    pub version: u16,

    /// Proximity class, absent when either side has no location
    pub proximity: Option<ProximityLevel>,

    /// Interests both residents declared
    pub shared_interests: Vec<String>,

    /// Mutual connections at request time
    pub mutual_count_at_request: Option<u32>,
}

impl ConnectionMetadata {
    /// Current record layout version
    pub const CURRENT_VERSION: u16 = 1;

    /// Snapshot the signals between requester and target
    pub fn capture(requester: &Resident, target: &Resident, mutual_count: u32) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            proximity: requester.proximity_to(target),
            shared_interests: requester.shared_interests(target),
            mutual_count_at_request: Some(mutual_count),
        }
    }
}

impl Default for ConnectionMetadata {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            proximity: None,
            shared_interests: Vec::new(),
            mutual_count_at_request: None,
        }
    }
}

/// A connection between two residents
///
/// Stored as a directed request row. `from_user`/`initiated_by` are
/// provenance only: once accepted the edge is undirected for every query.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Unique identifier
    pub id: ConnectionId,

    /// Resident who sent the request
    pub from_user: UserId,

    /// Resident who received the request
    pub to_user: UserId,

    /// Nature of the relationship
    pub connection_type: ConnectionType,

    /// Lifecycle state
    pub status: ConnectionStatus,

    /// Who created the request; decides who may answer it
    pub initiated_by: UserId,

    /// When the request was created (seconds since Unix epoch)
    pub created_at: u64,

    /// When the last transition was applied
    pub updated_at: u64,

    /// Set exactly once, on `pending → accepted`
    pub accepted_at: Option<u64>,

    /// Signals captured at request time
    pub metadata: ConnectionMetadata,
}

impl Connection {
    /// Create a pending request from `from` to `to`
    ///
    /// # Errors
    /// Returns [`TransitionError::SelfConnection`] if both ids are equal
    pub fn request(
        from: UserId,
        to: UserId,
        connection_type: ConnectionType,
        metadata: ConnectionMetadata,
        now: u64,
    ) -> Result<Self, TransitionError> {
        if from == to {
            return Err(TransitionError::SelfConnection);
        }

        Ok(Self {
            id: ConnectionId::new(),
            initiated_by: from.clone(),
            from_user: from,
            to_user: to,
            connection_type,
            status: ConnectionStatus::Pending,
            created_at: now,
            updated_at: now,
            accepted_at: None,
            metadata,
        })
    }

    /// Normalized unordered pair
    pub fn pair_key(&self) -> PairKey {
        PairKey::ordered(&self.from_user, &self.to_user)
    }

    /// Whether `user` is one of the two parties
    pub fn involves(&self, user: &UserId) -> bool {
        &self.from_user == user || &self.to_user == user
    }

    /// The party on the other side from `user`
    pub fn partner_of(&self, user: &UserId) -> Option<&UserId> {
        if &self.from_user == user {
            Some(&self.to_user)
        } else if &self.to_user == user {
            Some(&self.from_user)
        } else {
            None
        }
    }

    /// Whether `user` received this request
    pub fn is_recipient(&self, user: &UserId) -> bool {
        self.involves(user) && &self.initiated_by != user
    }

    /// Validate that `actor` may apply `transition` to this connection now
    ///
    /// Checks, in order: the actor is a party, only the recipient answers a
    /// request, blocks are never removed here, and the current status
    /// allows the transition.
    pub fn check_transition(
        &self,
        actor: &UserId,
        transition: Transition,
    ) -> Result<(), TransitionError> {
        if !self.involves(actor) {
            return Err(TransitionError::NotParticipant);
        }

        if transition.requires_recipient() && &self.initiated_by == actor {
            return Err(TransitionError::InitiatorCannotRespond { transition });
        }

        if transition == Transition::Remove && self.status == ConnectionStatus::Blocked {
            return Err(TransitionError::BlockHeld);
        }

        if !self.status.allows(transition) {
            return Err(TransitionError::Invalid {
                from: self.status,
                transition,
            });
        }

        Ok(())
    }
}
