//! JSON bodies exchanged over HTTP
//!
//! Conversions from engine and domain types live next to each body.

use std::collections::BTreeMap;

use hearth_domain::{Connection, ConnectionMetadata, Page, Resident};
use hearth_engine::{
    ConnectionStats, ConnectionView, DiscoveryItem, PendingRequests, Reason, Recommendation,
    Recommendations,
};
use serde::{Deserialize, Serialize};

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Error class, e.g. "conflict"
    pub kind: String,
}

/// Public profile of a resident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentDto {
    /// User id
    pub id: String,
    /// Display name
    pub display_name: String,
    /// Primary neighborhood
    pub neighborhood: Option<String>,
    /// District
    pub district: Option<String>,
    /// Declared interests
    pub interests: Vec<String>,
    /// Join timestamp
    pub joined_at: u64,
}

impl From<Resident> for ResidentDto {
    fn from(resident: Resident) -> Self {
        let (neighborhood, district) = match resident.location {
            Some(location) => (Some(location.neighborhood), location.district),
            None => (None, None),
        };
        Self {
            id: resident.id.to_string(),
            display_name: resident.display_name,
            neighborhood,
            district,
            interests: resident.interests,
            joined_at: resident.joined_at,
        }
    }
}

/// Signals captured when the request was sent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataDto {
    /// Proximity class
    pub proximity: Option<String>,
    /// Interests both residents declared
    pub shared_interests: Vec<String>,
    /// Mutual connections at request time
    pub mutual_count_at_request: Option<u32>,
}

impl From<ConnectionMetadata> for MetadataDto {
    fn from(metadata: ConnectionMetadata) -> Self {
        Self {
            proximity: metadata.proximity.map(|p| p.as_str().to_string()),
            shared_interests: metadata.shared_interests,
            mutual_count_at_request: metadata.mutual_count_at_request,
        }
    }
}

/// A stored connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDto {
    /// Connection id
    pub id: String,
    /// Sender of the request
    pub from_user: String,
    /// Recipient of the request
    pub to_user: String,
    /// Kind of connection
    pub connection_type: String,
    /// Lifecycle state
    pub status: String,
    /// Who created the request
    pub initiated_by: String,
    /// Creation timestamp
    pub created_at: u64,
    /// Last transition timestamp
    pub updated_at: u64,
    /// Acceptance timestamp
    pub accepted_at: Option<u64>,
    /// Signals at request time
    pub metadata: MetadataDto,
}

impl From<Connection> for ConnectionDto {
    fn from(edge: Connection) -> Self {
        Self {
            id: edge.id.to_string(),
            from_user: edge.from_user.to_string(),
            to_user: edge.to_user.to_string(),
            connection_type: edge.connection_type.as_str().to_string(),
            status: edge.status.as_str().to_string(),
            initiated_by: edge.initiated_by.to_string(),
            created_at: edge.created_at,
            updated_at: edge.updated_at,
            accepted_at: edge.accepted_at,
            metadata: edge.metadata.into(),
        }
    }
}

/// A connection with the other party's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionViewDto {
    /// The connection
    pub connection: ConnectionDto,
    /// The other party
    pub partner: ResidentDto,
}

impl From<ConnectionView> for ConnectionViewDto {
    fn from(view: ConnectionView) -> Self {
        Self {
            connection: view.connection.into(),
            partner: view.partner.into(),
        }
    }
}

/// Pending requests by direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRequestsDto {
    /// Waiting for the caller's answer
    pub incoming: Vec<ConnectionViewDto>,
    /// Sent by the caller
    pub outgoing: Vec<ConnectionViewDto>,
}

impl From<PendingRequests> for PendingRequestsDto {
    fn from(pending: PendingRequests) -> Self {
        Self {
            incoming: pending.incoming.into_iter().map(Into::into).collect(),
            outgoing: pending.outgoing.into_iter().map(Into::into).collect(),
        }
    }
}

/// Connection counts for the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsDto {
    /// Accepted connections
    pub accepted: usize,
    /// Requests awaiting the caller
    pub pending_incoming: usize,
    /// Requests the caller sent
    pub pending_outgoing: usize,
    /// Rejected requests
    pub rejected: usize,
    /// Blocks
    pub blocked: usize,
    /// Accepted connections per type
    pub by_type: BTreeMap<String, usize>,
}

impl From<ConnectionStats> for StatsDto {
    fn from(stats: ConnectionStats) -> Self {
        Self {
            accepted: stats.accepted,
            pending_incoming: stats.pending_incoming,
            pending_outgoing: stats.pending_outgoing,
            rejected: stats.rejected,
            blocked: stats.blocked,
            by_type: stats
                .by_type
                .into_iter()
                .map(|(t, n)| (t.as_str().to_string(), n))
                .collect(),
        }
    }
}

/// One contribution to a score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonDto {
    /// Signal name
    pub tag: String,
    /// Points added
    pub strength: u8,
    /// Explanation
    pub description: String,
}

impl From<Reason> for ReasonDto {
    fn from(reason: Reason) -> Self {
        Self {
            tag: reason.tag.as_str().to_string(),
            strength: reason.strength,
            description: reason.description,
        }
    }
}

/// A suggested resident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationDto {
    /// Suggested resident
    pub resident: ResidentDto,
    /// Score in 0..=100
    pub score: u8,
    /// Why
    pub reasons: Vec<ReasonDto>,
    /// Shared connections
    pub mutual_count: usize,
}

impl From<Recommendation> for RecommendationDto {
    fn from(r: Recommendation) -> Self {
        Self {
            resident: r.resident.into(),
            score: r.score,
            reasons: r.reasons.into_iter().map(Into::into).collect(),
            mutual_count: r.mutual_count,
        }
    }
}

/// Recommendation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsDto {
    /// Best candidates first
    pub items: Vec<RecommendationDto>,
    /// Candidates scored
    pub candidates_considered: usize,
    /// The pool was cut at the configured cap
    pub truncated: bool,
}

impl From<Recommendations> for RecommendationsDto {
    fn from(r: Recommendations) -> Self {
        Self {
            items: r.items.into_iter().map(Into::into).collect(),
            candidates_considered: r.candidates_considered,
            truncated: r.truncated,
        }
    }
}

/// One discovery entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryItemDto {
    /// The resident
    pub resident: ResidentDto,
    /// Shared connections
    pub mutual_count: usize,
    /// Score for the caller
    pub score: u8,
    /// "incoming" or "outgoing" when a request is waiting
    pub pending: Option<String>,
}

impl From<DiscoveryItem> for DiscoveryItemDto {
    fn from(item: DiscoveryItem) -> Self {
        Self {
            resident: item.resident.into(),
            mutual_count: item.mutual_count,
            score: item.score,
            pending: item.pending.map(|d| d.as_str().to_string()),
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDto<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Items across all pages
    pub total: usize,
    /// Page number, from 1
    pub page: usize,
    /// Items per page
    pub page_size: usize,
    /// Another page follows
    pub has_next: bool,
    /// A page precedes
    pub has_prev: bool,
}

impl<T> PageDto<T> {
    /// Convert every item of an engine page
    pub fn from_page<U: Into<T>>(page: Page<U>) -> Self {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            has_next: page.has_next,
            has_prev: page.has_prev,
        }
    }
}

/// Residents two people both know
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutualDto {
    /// The other resident
    pub user_id: String,
    /// Number of shared connections
    pub count: usize,
    /// Shared connections, ordered by id
    pub residents: Vec<ResidentDto>,
}
