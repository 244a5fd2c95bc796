//! Recommendations and discovery
//!
//! Both run the same two phases: fetch the candidate pool and every
//! candidate's neighbor set in bulk, then score in memory.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use hearth_domain::traits::{EdgeStore, ResidentDirectory};
use hearth_domain::{LocationFilter, Page, PageRequest, Resident, UserId};
use tracing::{debug, warn};

use crate::graph::{adjacency, count_common};
use crate::scorer::{score, Reason, Score, ScoringContext};
use crate::{ConnectionEngine, EngineError};

/// A suggested resident
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    /// Suggested resident
    pub resident: Resident,

    /// Score in `0..=100`
    pub score: u8,

    /// What produced the score, strongest first
    pub reasons: Vec<Reason>,

    /// Connections shared with the requester
    pub mutual_count: usize,
}

/// Result of one recommendation call
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendations {
    /// Best candidates, highest score first
    pub items: Vec<Recommendation>,

    /// Candidates actually scored
    pub candidates_considered: usize,

    /// The pool was larger than the configured cap
    pub truncated: bool,
}

/// Ordering for discovery listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoverOrder {
    /// Newest residents first
    #[default]
    JoinDate,
    /// Display name, case-insensitive
    Name,
    /// Recommendation score, highest first
    Score,
}

impl DiscoverOrder {
    /// Get the order name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoverOrder::JoinDate => "join_date",
            DiscoverOrder::Name => "name",
            DiscoverOrder::Score => "score",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "join_date" | "joined" => Some(DiscoverOrder::JoinDate),
            "name" => Some(DiscoverOrder::Name),
            "score" => Some(DiscoverOrder::Score),
            _ => None,
        }
    }
}

impl std::str::FromStr for DiscoverOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid discover order: {}", s))
    }
}

/// Filters and paging for a discovery listing
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverQuery {
    /// Where to look; `None` means around the caller
    pub location: Option<LocationFilter>,

    /// Case-insensitive substring of the display name
    pub name_contains: Option<String>,

    /// Listing order
    pub order: DiscoverOrder,

    /// Requested page
    pub page: PageRequest,
}

impl DiscoverQuery {
    /// Query around the caller, newest residents first
    pub fn new(page: PageRequest) -> Self {
        Self {
            location: None,
            name_contains: None,
            order: DiscoverOrder::default(),
            page,
        }
    }

    /// Look in `filter` instead of around the caller
    pub fn with_location(mut self, filter: LocationFilter) -> Self {
        self.location = Some(filter);
        self
    }

    /// Keep only names containing `needle`
    pub fn with_name(mut self, needle: impl Into<String>) -> Self {
        self.name_contains = Some(needle.into());
        self
    }

    /// Change the ordering
    pub fn with_order(mut self, order: DiscoverOrder) -> Self {
        self.order = order;
        self
    }
}

/// Which way an unanswered request between caller and candidate points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDirection {
    /// The caller asked
    Outgoing,
    /// The candidate asked
    Incoming,
}

impl PendingDirection {
    /// Get the direction name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingDirection::Outgoing => "outgoing",
            PendingDirection::Incoming => "incoming",
        }
    }
}

/// One entry of a discovery listing
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryItem {
    /// The resident
    pub resident: Resident,

    /// Connections shared with the caller
    pub mutual_count: usize,

    /// Recommendation score for the caller
    pub score: u8,

    /// An unanswered request already links the two
    pub pending: Option<PendingDirection>,
}

struct Scored {
    resident: Resident,
    score: Score,
    mutual_count: usize,
}

impl<S, D> ConnectionEngine<S, D>
where
    S: EdgeStore,
    S::Error: Display,
    D: ResidentDirectory,
    D::Error: Display,
{
    /// Suggest residents for `user` to connect with
    ///
    /// Candidates come from the caller's neighborhood, or from everyone when
    /// the caller has no location. Ties in score go to the lower user id.
    ///
    /// # Errors
    /// Returns [`EngineError::Validation`] when `limit` is outside
    /// `1..=max_limit`
    pub fn recommend(
        &self,
        user: &UserId,
        limit: Option<usize>,
    ) -> Result<Recommendations, EngineError> {
        let limit = self.limit(limit)?;
        let requester = self.resident(user)?;
        let filter = LocationFilter::around(requester.location.as_ref());

        let pool = self.candidate_pool(user, &filter)?;
        let mut candidates = pool.candidates;

        let cap = self.config.candidate_pool_cap;
        let truncated = candidates.len() > cap;
        if truncated {
            warn!(user = %user, pool = candidates.len(), cap, "Candidate pool truncated");
            candidates.truncate(cap);
        }
        let candidates_considered = candidates.len();

        let mut scored = self.score_all(&requester, &pool.neighbors, candidates)?;
        scored.sort_by(|a, b| {
            b.score
                .value
                .cmp(&a.score.value)
                .then_with(|| a.resident.id.cmp(&b.resident.id))
        });

        let items: Vec<Recommendation> = scored
            .into_iter()
            .take(limit)
            .map(|s| Recommendation {
                resident: s.resident,
                score: s.score.value,
                reasons: s.score.reasons,
                mutual_count: s.mutual_count,
            })
            .collect();

        debug!(user = %user, considered = candidates_considered, returned = items.len(), "Recommendations computed");

        Ok(Recommendations {
            items,
            candidates_considered,
            truncated,
        })
    }

    /// Browse residents `user` is not yet connected to
    pub fn discover(
        &self,
        user: &UserId,
        query: &DiscoverQuery,
    ) -> Result<Page<DiscoveryItem>, EngineError> {
        let requester = self.resident(user)?;
        let filter = query
            .location
            .clone()
            .unwrap_or_else(|| LocationFilter::around(requester.location.as_ref()));

        let pool = self.candidate_pool(user, &filter)?;
        let needle = query
            .name_contains
            .as_deref()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty());

        let mut candidates: Vec<Resident> = match &needle {
            Some(needle) => pool
                .candidates
                .into_iter()
                .filter(|r| r.display_name.to_lowercase().contains(needle.as_str()))
                .collect(),
            None => pool.candidates,
        };

        let pending = self.pending_directions(user)?;

        let page = match query.order {
            DiscoverOrder::Score => {
                let cap = self.config.candidate_pool_cap;
                if candidates.len() > cap {
                    warn!(user = %user, pool = candidates.len(), cap, "Candidate pool truncated");
                    candidates.truncate(cap);
                }
                let mut scored = self.score_all(&requester, &pool.neighbors, candidates)?;
                scored.sort_by(|a, b| {
                    b.score
                        .value
                        .cmp(&a.score.value)
                        .then_with(|| a.resident.id.cmp(&b.resident.id))
                });
                Page::slice(scored, query.page)
            }
            order => {
                match order {
                    DiscoverOrder::Name => candidates.sort_by(|a, b| {
                        a.display_name
                            .to_lowercase()
                            .cmp(&b.display_name.to_lowercase())
                            .then_with(|| a.id.cmp(&b.id))
                    }),
                    _ => candidates.sort_by(|a, b| {
                        b.joined_at.cmp(&a.joined_at).then_with(|| a.id.cmp(&b.id))
                    }),
                }
                // Only the visible page needs neighbor sets
                let page = Page::slice(candidates, query.page);
                let items = self.score_all(&requester, &pool.neighbors, page.items)?;
                Page::from_parts(items, page.total, query.page)
            }
        };

        Ok(page.map(|s| DiscoveryItem {
            pending: pending.get(&s.resident.id).copied(),
            mutual_count: s.mutual_count,
            score: s.score.value,
            resident: s.resident,
        }))
    }

    /// Bulk-fetch neighbor sets for `candidates`, then score each one
    fn score_all(
        &self,
        requester: &Resident,
        requester_neighbors: &BTreeSet<UserId>,
        candidates: Vec<Resident>,
    ) -> Result<Vec<Scored>, EngineError> {
        let ids: Vec<UserId> = candidates.iter().map(|r| r.id.clone()).collect();
        let edges = self.read(|store| store.find_accepted_for(&ids))?;
        let adjacency = adjacency(&edges);
        let empty = BTreeSet::new();

        Ok(candidates
            .into_iter()
            .map(|resident| {
                let theirs = adjacency.get(&resident.id).unwrap_or(&empty);
                let mutual_count =
                    count_common(requester_neighbors, theirs, [&requester.id, &resident.id]);
                let score = score(
                    &resident,
                    &ScoringContext {
                        requester,
                        mutual_count,
                    },
                );
                Scored {
                    resident,
                    score,
                    mutual_count,
                }
            })
            .collect())
    }

    fn pending_directions(
        &self,
        user: &UserId,
    ) -> Result<BTreeMap<UserId, PendingDirection>, EngineError> {
        let edges = self.read(|store| store.find_pending(user))?;
        Ok(edges
            .iter()
            .filter_map(|edge| {
                let direction = if &edge.initiated_by == user {
                    PendingDirection::Outgoing
                } else {
                    PendingDirection::Incoming
                };
                edge.partner_of(user).map(|p| (p.clone(), direction))
            })
            .collect())
    }
}
