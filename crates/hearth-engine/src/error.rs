//! Error types for engine operations

use hearth_domain::{ConnectionId, ConnectionStatus, Transition, TransitionError, UserId};
use thiserror::Error;

/// Errors that can occur during engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A resident tried to connect with themselves
    #[error("Cannot connect with yourself")]
    SelfConnection,

    /// Malformed input (limits, page sizes, ids)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown resident
    #[error("Resident not found: {0}")]
    ResidentNotFound(UserId),

    /// Unknown connection
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// A pending or accepted connection already occupies the pair
    #[error("A pending or accepted connection already exists: {existing}")]
    DuplicateEdge {
        /// The occupying connection
        existing: ConnectionId,
    },

    /// One resident has blocked the other
    #[error("Connection requests between these residents are blocked")]
    BlockedPair,

    /// The connection changed between read and compare-and-set
    #[error(
        "Connection {id} changed concurrently: expected {expected}, found {}",
        .current.map_or("no row", |s| s.as_str())
    )]
    StaleState {
        /// Connection that changed
        id: ConnectionId,
        /// Status the update expected
        expected: ConnectionStatus,
        /// Status found instead
        current: Option<ConnectionStatus>,
    },

    /// The current state does not allow the transition
    #[error("Invalid transition: cannot {transition} a connection that is {from}")]
    InvalidTransition {
        /// Current status
        from: ConnectionStatus,
        /// Attempted transition
        transition: Transition,
    },

    /// The pair's last request was rejected too recently
    #[error("Request rejected recently; retry in {retry_after_secs} seconds")]
    RerequestCooldown {
        /// Seconds until a new request is accepted
        retry_after_secs: u64,
    },

    /// The actor may not perform this action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Resident directory error
    #[error("Directory error: {0}")]
    Directory(String),
}

/// Coarse classification callers map to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input, rejected before touching the store
    Validation,
    /// Edge or resident does not exist
    NotFound,
    /// Pair or state conflict
    Conflict,
    /// Wrong actor
    Forbidden,
    /// Infrastructure failure
    Internal,
}

impl ErrorKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal",
        }
    }
}

impl EngineError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::SelfConnection | EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::ResidentNotFound(_) | EngineError::ConnectionNotFound(_) => {
                ErrorKind::NotFound
            }
            EngineError::DuplicateEdge { .. }
            | EngineError::BlockedPair
            | EngineError::StaleState { .. }
            | EngineError::InvalidTransition { .. }
            | EngineError::RerequestCooldown { .. } => ErrorKind::Conflict,
            EngineError::Forbidden(_) => ErrorKind::Forbidden,
            EngineError::Config(_) | EngineError::Store(_) | EngineError::Directory(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Only a lost compare-and-set is safe to retry as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StaleState { .. })
    }
}

impl From<TransitionError> for EngineError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::SelfConnection => EngineError::SelfConnection,
            TransitionError::Invalid { from, transition } => {
                EngineError::InvalidTransition { from, transition }
            }
            TransitionError::NotParticipant
            | TransitionError::InitiatorCannotRespond { .. }
            | TransitionError::BlockHeld => EngineError::Forbidden(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(EngineError::SelfConnection.kind(), ErrorKind::Validation);
        assert_eq!(EngineError::BlockedPair.kind(), ErrorKind::Conflict);
        assert_eq!(EngineError::Forbidden("x".into()).kind(), ErrorKind::Forbidden);
        assert_eq!(EngineError::Store("x".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_only_stale_state_is_retryable() {
        let stale = EngineError::StaleState {
            id: ConnectionId::from_value(1),
            expected: ConnectionStatus::Pending,
            current: Some(ConnectionStatus::Accepted),
        };
        assert!(stale.is_retryable());
        assert!(!EngineError::BlockedPair.is_retryable());
        assert!(!EngineError::DuplicateEdge {
            existing: ConnectionId::from_value(1)
        }
        .is_retryable());
    }

    #[test]
    fn test_transition_error_mapping() {
        assert_eq!(
            EngineError::from(TransitionError::NotParticipant).kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            EngineError::from(TransitionError::InitiatorCannotRespond {
                transition: Transition::Accept
            })
            .kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            EngineError::from(TransitionError::Invalid {
                from: ConnectionStatus::Rejected,
                transition: Transition::Accept
            }),
            EngineError::InvalidTransition {
                from: ConnectionStatus::Rejected,
                transition: Transition::Accept
            }
        );
    }

    #[test]
    fn test_stale_state_message() {
        let err = EngineError::StaleState {
            id: ConnectionId::from_value(1),
            expected: ConnectionStatus::Pending,
            current: None,
        };
        assert!(err.to_string().ends_with("expected pending, found no row"));
    }
}
