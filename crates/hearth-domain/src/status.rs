//! Status module - the connection lifecycle state machine

use std::fmt;

/// Lifecycle state of a connection
///
/// Every state except `Pending` is settled:
/// - Pending: requested, waiting for the other party
/// - Accepted: an undirected edge in the graph
/// - Rejected: declined; kept as a record, the pair may re-request
/// - Blocked: either party blocked the other; no new requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectionStatus {
    /// Waiting for the non-initiating party
    Pending,

    /// Both parties agreed
    Accepted,

    /// The non-initiating party declined
    Rejected,

    /// One party blocked the other
    Blocked,
}

impl ConnectionStatus {
    /// All states, in lifecycle order
    pub const ALL: [ConnectionStatus; 4] = [
        ConnectionStatus::Pending,
        ConnectionStatus::Accepted,
        ConnectionStatus::Rejected,
        ConnectionStatus::Blocked,
    ];

    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Rejected => "rejected",
            ConnectionStatus::Blocked => "blocked",
        }
    }

    /// Parse a status from a string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(ConnectionStatus::Pending),
            "accepted" => Some(ConnectionStatus::Accepted),
            "rejected" => Some(ConnectionStatus::Rejected),
            "blocked" => Some(ConnectionStatus::Blocked),
            _ => None,
        }
    }

    /// Pending and accepted edges occupy their pair
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionStatus::Pending | ConnectionStatus::Accepted)
    }

    /// Whether the state machine allows `transition` out of this state
    ///
    /// This checks the state only. Who may perform the transition is
    /// decided by [`crate::Connection::check_transition`].
    pub fn allows(&self, transition: Transition) -> bool {
        use ConnectionStatus::*;

        matches!(
            (self, transition),
            (Pending, Transition::Accept)
                | (Pending, Transition::Reject)
                | (Pending | Accepted, Transition::Block)
                | (Pending | Accepted | Rejected, Transition::Remove)
        )
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid connection status: {}", s))
    }
}

/// A requested lifecycle change on an existing connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// `pending → accepted`, by the non-initiating party
    Accept,

    /// `pending → rejected`, by the non-initiating party
    Reject,

    /// `{pending, accepted} → blocked`, by either party
    Block,

    /// Hard delete, by either party
    Remove,
}

impl Transition {
    /// Get the transition name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Accept => "accept",
            Transition::Reject => "reject",
            Transition::Block => "block",
            Transition::Remove => "remove",
        }
    }

    /// Status the edge ends up in, `None` when the row is deleted
    pub fn target(&self) -> Option<ConnectionStatus> {
        match self {
            Transition::Accept => Some(ConnectionStatus::Accepted),
            Transition::Reject => Some(ConnectionStatus::Rejected),
            Transition::Block => Some(ConnectionStatus::Blocked),
            Transition::Remove => None,
        }
    }

    /// Only the receiving side may answer a request
    pub fn requires_recipient(&self) -> bool {
        matches!(self, Transition::Accept | Transition::Reject)
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a lifecycle change was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// A resident tried to connect with themselves
    SelfConnection,

    /// The actor is not one of the two parties
    NotParticipant,

    /// The initiator tried to answer their own request
    InitiatorCannotRespond {
        /// Attempted transition
        transition: Transition,
    },

    /// Blocks are lifted administratively, never through removal
    BlockHeld,

    /// The current state does not allow the transition
    Invalid {
        /// Current status
        from: ConnectionStatus,
        /// Attempted transition
        transition: Transition,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::SelfConnection => write!(f, "cannot connect with yourself"),
            TransitionError::NotParticipant => write!(f, "not a party to this connection"),
            TransitionError::InitiatorCannotRespond { transition } => {
                write!(f, "the initiator cannot {} their own request", transition)
            }
            TransitionError::BlockHeld => {
                write!(f, "blocked connections can only be lifted by an administrator")
            }
            TransitionError::Invalid { from, transition } => {
                write!(f, "cannot {} a connection that is {}", transition, from)
            }
        }
    }
}

impl std::error::Error for TransitionError {}
