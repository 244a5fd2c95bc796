//! Connection lifecycle: requests, answers, blocks and removals
//!
//! Every state change is validated against the edge as read, then applied
//! with a compare-and-set on the status that was read. A change that lost a
//! race is reported, never retried.

use std::collections::BTreeMap;
use std::fmt::Display;

use hearth_domain::traits::{CasOutcome, EdgeStore, InsertOutcome, ResidentDirectory};
use hearth_domain::{
    Connection, ConnectionId, ConnectionMetadata, ConnectionStatus, ConnectionType,
    LocationFilter, Page, PageRequest, Resident, Transition, UserId,
};
use tracing::{debug, info, warn};

use crate::{ConnectionEngine, EngineError};

/// Narrows the connections listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionFilter {
    /// Only this kind of connection
    pub connection_type: Option<ConnectionType>,

    /// Only partners living here
    pub location: LocationFilter,
}

/// A connection seen from one of its parties
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionView {
    /// The stored edge
    pub connection: Connection,

    /// Profile of the other party
    pub partner: Resident,
}

/// Pending requests split by direction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingRequests {
    /// Requests waiting for this resident's answer
    pub incoming: Vec<ConnectionView>,

    /// Requests this resident sent
    pub outgoing: Vec<ConnectionView>,
}

/// Edge counts around one resident
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Accepted connections
    pub accepted: usize,

    /// Requests waiting for this resident's answer
    pub pending_incoming: usize,

    /// Requests this resident sent that are unanswered
    pub pending_outgoing: usize,

    /// Rejected requests in either direction
    pub rejected: usize,

    /// Blocks in either direction
    pub blocked: usize,

    /// Accepted connections per type
    pub by_type: BTreeMap<ConnectionType, usize>,
}

impl<S, D> ConnectionEngine<S, D>
where
    S: EdgeStore,
    S::Error: Display,
    D: ResidentDirectory,
    D::Error: Display,
{
    /// Send a connection request from `from` to `to`
    ///
    /// # Errors
    /// - [`EngineError::SelfConnection`] when `from == to`
    /// - [`EngineError::ResidentNotFound`] for an unknown party
    /// - [`EngineError::RerequestCooldown`] when `from` was rejected too recently
    /// - [`EngineError::DuplicateEdge`] when a pending or accepted edge exists
    /// - [`EngineError::BlockedPair`] when either side blocked the other
    pub fn request_connection(
        &self,
        from: &UserId,
        to: &UserId,
        connection_type: ConnectionType,
    ) -> Result<Connection, EngineError> {
        if from == to {
            return Err(EngineError::SelfConnection);
        }

        let requester = self.resident(from)?;
        let target = self.resident(to)?;
        let now = self.now();

        self.check_cooldown(from, to, now)?;

        let mutual_count = self.mutual_count(from, to)?;
        let metadata = ConnectionMetadata::capture(
            &requester,
            &target,
            u32::try_from(mutual_count).unwrap_or(u32::MAX),
        );
        let edge = Connection::request(from.clone(), to.clone(), connection_type, metadata, now)?;

        match self.write(|store| store.insert(edge.clone()))? {
            InsertOutcome::Inserted(id) => {
                info!(
                    connection_id = %id,
                    from = %from,
                    to = %to,
                    connection_type = %connection_type,
                    "Connection requested"
                );
                Ok(edge)
            }
            InsertOutcome::Duplicate { existing } => {
                warn!(from = %from, to = %to, existing = %existing, "Duplicate connection request");
                Err(EngineError::DuplicateEdge { existing })
            }
            InsertOutcome::Blocked => {
                warn!(from = %from, to = %to, "Connection request to blocked pair");
                Err(EngineError::BlockedPair)
            }
        }
    }

    fn check_cooldown(&self, from: &UserId, to: &UserId, now: u64) -> Result<(), EngineError> {
        let cooldown = self.config.rerequest_cooldown_secs;
        if cooldown == 0 {
            return Ok(());
        }

        let latest = self.read(|store| store.find_by_pair(from, to))?;
        if let Some(edge) = latest {
            if edge.status == ConnectionStatus::Rejected && &edge.initiated_by == from {
                let until = edge.updated_at.saturating_add(cooldown);
                if now < until {
                    debug!(from = %from, to = %to, until, "Re-request inside cooldown");
                    return Err(EngineError::RerequestCooldown {
                        retry_after_secs: until - now,
                    });
                }
            }
        }
        Ok(())
    }

    /// Accept a pending request; only its recipient may
    pub fn accept_connection(
        &self,
        actor: &UserId,
        id: ConnectionId,
    ) -> Result<Connection, EngineError> {
        self.apply(actor, id, Transition::Accept)
    }

    /// Reject a pending request; only its recipient may
    pub fn reject_connection(
        &self,
        actor: &UserId,
        id: ConnectionId,
    ) -> Result<Connection, EngineError> {
        self.apply(actor, id, Transition::Reject)
    }

    /// Block the other party of a pending or accepted connection
    pub fn block_connection(
        &self,
        actor: &UserId,
        id: ConnectionId,
    ) -> Result<Connection, EngineError> {
        self.apply(actor, id, Transition::Block)
    }

    /// Delete a pending, accepted or rejected connection
    ///
    /// Removing an accepted connection ends it without any cooldown.
    /// Blocks are never removed here.
    pub fn remove_connection(&self, actor: &UserId, id: ConnectionId) -> Result<(), EngineError> {
        let edge = self.load_for(actor, id, Transition::Remove)?;

        if self.write(|store| store.delete(id, edge.status))? {
            info!(connection_id = %id, actor = %actor, from = %edge.status, "Connection removed");
            return Ok(());
        }

        // The row changed between read and delete
        match self.read(|store| store.get(id))? {
            None => Err(EngineError::ConnectionNotFound(id)),
            Some(current) => {
                warn!(connection_id = %id, expected = %edge.status, current = %current.status, "Lost race on removal");
                Err(EngineError::StaleState {
                    id,
                    expected: edge.status,
                    current: Some(current.status),
                })
            }
        }
    }

    fn load_for(
        &self,
        actor: &UserId,
        id: ConnectionId,
        transition: Transition,
    ) -> Result<Connection, EngineError> {
        let edge = self
            .read(|store| store.get(id))?
            .ok_or(EngineError::ConnectionNotFound(id))?;
        edge.check_transition(actor, transition)?;
        Ok(edge)
    }

    fn apply(
        &self,
        actor: &UserId,
        id: ConnectionId,
        transition: Transition,
    ) -> Result<Connection, EngineError> {
        let edge = self.load_for(actor, id, transition)?;
        let target = transition.target().ok_or(EngineError::InvalidTransition {
            from: edge.status,
            transition,
        })?;
        let now = self.now();

        match self.write(|store| store.update_status(id, target, edge.status, now))? {
            CasOutcome::Applied(updated) => {
                info!(
                    connection_id = %id,
                    actor = %actor,
                    from = %edge.status,
                    to = %updated.status,
                    "Connection transition applied"
                );
                Ok(updated)
            }
            CasOutcome::Stale { current: None } => Err(EngineError::ConnectionNotFound(id)),
            CasOutcome::Stale { current } => {
                warn!(connection_id = %id, transition = %transition, expected = %edge.status, "Lost race on transition");
                Err(EngineError::StaleState {
                    id,
                    expected: edge.status,
                    current,
                })
            }
        }
    }

    /// Accepted connections of `user`, newest first
    pub fn list_connections(
        &self,
        user: &UserId,
        filter: &ConnectionFilter,
        page: PageRequest,
    ) -> Result<Page<ConnectionView>, EngineError> {
        self.resident(user)?;

        let edges: Vec<Connection> = self
            .read(|store| store.find_accepted(user))?
            .into_iter()
            .filter(|edge| {
                filter
                    .connection_type
                    .is_none_or(|wanted| edge.connection_type == wanted)
            })
            .collect();

        let mut views: Vec<ConnectionView> = self
            .with_partners(user, edges)?
            .into_iter()
            .filter(|view| filter.location.matches(view.partner.location.as_ref()))
            .collect();

        views.sort_by(|a, b| {
            let at = |v: &ConnectionView| v.connection.accepted_at.unwrap_or(v.connection.updated_at);
            at(b).cmp(&at(a)).then_with(|| a.partner.id.cmp(&b.partner.id))
        });

        Ok(Page::slice(views, page))
    }

    /// Unanswered requests to and from `user`, newest first
    pub fn pending_requests(&self, user: &UserId) -> Result<PendingRequests, EngineError> {
        self.resident(user)?;

        let mut edges = self.read(|store| store.find_pending(user))?;
        edges.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        let (incoming, outgoing) = self
            .with_partners(user, edges)?
            .into_iter()
            .partition(|view| view.connection.is_recipient(user));

        Ok(PendingRequests { incoming, outgoing })
    }

    /// Counts of every edge touching `user`
    pub fn connection_stats(&self, user: &UserId) -> Result<ConnectionStats, EngineError> {
        self.resident(user)?;

        let edges = self.read(|store| store.find_incident(user))?;
        let mut stats = ConnectionStats::default();

        for edge in &edges {
            match edge.status {
                ConnectionStatus::Accepted => {
                    stats.accepted += 1;
                    *stats.by_type.entry(edge.connection_type).or_insert(0) += 1;
                }
                ConnectionStatus::Pending if edge.is_recipient(user) => stats.pending_incoming += 1,
                ConnectionStatus::Pending => stats.pending_outgoing += 1,
                ConnectionStatus::Rejected => stats.rejected += 1,
                ConnectionStatus::Blocked => stats.blocked += 1,
            }
        }

        Ok(stats)
    }

    /// Pair each edge with the other party's profile
    ///
    /// Edges whose partner is no longer in the directory are skipped.
    fn with_partners(
        &self,
        user: &UserId,
        edges: Vec<Connection>,
    ) -> Result<Vec<ConnectionView>, EngineError> {
        let ids: Vec<UserId> = edges
            .iter()
            .filter_map(|edge| edge.partner_of(user).cloned())
            .collect();
        let profiles: BTreeMap<UserId, Resident> = self
            .residents(&ids)?
            .into_iter()
            .map(|resident| (resident.id.clone(), resident))
            .collect();

        Ok(edges
            .into_iter()
            .filter_map(|connection| {
                let partner_id = connection.partner_of(user)?.clone();
                match profiles.get(&partner_id) {
                    Some(partner) => Some(ConnectionView {
                        partner: partner.clone(),
                        connection,
                    }),
                    None => {
                        debug!(partner = %partner_id, "Skipping connection to unknown resident");
                        None
                    }
                }
            })
            .collect())
    }
}
