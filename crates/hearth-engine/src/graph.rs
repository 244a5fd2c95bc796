//! Graph queries over accepted edges
//!
//! Nothing is cached: every query re-reads the store, so results always
//! reflect the committed graph.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use hearth_domain::traits::{EdgeStore, ResidentDirectory};
use hearth_domain::{Connection, LocationFilter, Resident, UserId};

use crate::{ConnectionEngine, EngineError};

/// Partners of `user` among `edges`, direction collapsed
pub(crate) fn partners_of(user: &UserId, edges: &[Connection]) -> BTreeSet<UserId> {
    edges
        .iter()
        .filter_map(|edge| edge.partner_of(user).cloned())
        .collect()
}

/// Adjacency of every endpoint in `edges`
pub(crate) fn adjacency(edges: &[Connection]) -> BTreeMap<UserId, BTreeSet<UserId>> {
    let mut adjacency: BTreeMap<UserId, BTreeSet<UserId>> = BTreeMap::new();
    for edge in edges {
        adjacency
            .entry(edge.from_user.clone())
            .or_default()
            .insert(edge.to_user.clone());
        adjacency
            .entry(edge.to_user.clone())
            .or_default()
            .insert(edge.from_user.clone());
    }
    adjacency
}

/// Size of `a ∩ b` minus the two endpoints, probing the smaller set
pub(crate) fn count_common(
    a: &BTreeSet<UserId>,
    b: &BTreeSet<UserId>,
    exclude: [&UserId; 2],
) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter(|id| !exclude.contains(id) && large.contains(*id))
        .count()
}

/// Residents eligible for discovery, in user-id order
pub(crate) struct CandidatePool {
    pub(crate) neighbors: BTreeSet<UserId>,
    pub(crate) candidates: Vec<Resident>,
}

impl<S, D> ConnectionEngine<S, D>
where
    S: EdgeStore,
    S::Error: Display,
    D: ResidentDirectory,
    D::Error: Display,
{
    /// Residents connected to `user` through an accepted edge
    pub fn neighbors_of(&self, user: &UserId) -> Result<BTreeSet<UserId>, EngineError> {
        let edges = self.read(|store| store.find_accepted(user))?;
        Ok(partners_of(user, &edges))
    }

    /// Residents connected to both `a` and `b`, in user-id order
    pub fn mutual_connections(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<BTreeSet<UserId>, EngineError> {
        let ours = self.neighbors_of(a)?;
        let theirs = self.neighbors_of(b)?;
        Ok(ours
            .intersection(&theirs)
            .filter(|id| *id != a && *id != b)
            .cloned()
            .collect())
    }

    /// Number of residents connected to both `a` and `b`
    pub fn mutual_count(&self, a: &UserId, b: &UserId) -> Result<usize, EngineError> {
        let ours = self.neighbors_of(a)?;
        let theirs = self.neighbors_of(b)?;
        Ok(count_common(&ours, &theirs, [a, b]))
    }

    /// Residents on the other side of a block involving `user`, either direction
    pub fn blocked_partners(&self, user: &UserId) -> Result<BTreeSet<UserId>, EngineError> {
        let edges = self.read(|store| store.find_blocked(user))?;
        Ok(partners_of(user, &edges))
    }

    /// Residents matching `filter` that `user` is neither connected to nor
    /// separated from by a block
    pub fn discovery_candidates(
        &self,
        user: &UserId,
        filter: &LocationFilter,
    ) -> Result<BTreeSet<UserId>, EngineError> {
        let pool = self.candidate_pool(user, filter)?;
        Ok(pool.candidates.into_iter().map(|r| r.id).collect())
    }

    /// Profiles of the residents `caller` and `other` both know
    ///
    /// # Errors
    /// Returns [`EngineError::SelfConnection`] when `other` is the caller and
    /// [`EngineError::ResidentNotFound`] for an unknown `other`
    pub fn mutual_residents(
        &self,
        caller: &UserId,
        other: &UserId,
    ) -> Result<Vec<Resident>, EngineError> {
        if caller == other {
            return Err(EngineError::SelfConnection);
        }
        self.resident(other)?;
        let ids: Vec<UserId> = self.mutual_connections(caller, other)?.into_iter().collect();
        self.residents(&ids)
    }

    pub(crate) fn candidate_pool(
        &self,
        user: &UserId,
        filter: &LocationFilter,
    ) -> Result<CandidatePool, EngineError> {
        let neighbors = self.neighbors_of(user)?;
        let blocked = self.blocked_partners(user)?;
        let candidates = self
            .directory
            .residents_matching(filter)
            .map_err(|e| EngineError::Directory(e.to_string()))?;

        let mut candidates: Vec<Resident> = candidates
            .into_iter()
            .filter(|r| &r.id != user && !neighbors.contains(&r.id) && !blocked.contains(&r.id))
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(CandidatePool {
            neighbors,
            candidates,
        })
    }
}
