//! Recommendation scoring
//!
//! Pure functions: a score depends only on the candidate and the scoring
//! context, never on I/O or call order.

use hearth_domain::Resident;

/// Score every candidate starts from
pub const BASE_SCORE: u32 = 50;

/// Bonus for living in the requester's neighborhood
pub const SAME_NEIGHBORHOOD_BONUS: u32 = 30;

/// Points per mutual connection
pub const MUTUAL_WEIGHT: u32 = 5;

/// Cap on the mutual connection bonus
pub const MUTUAL_CAP: u32 = 20;

/// Points per shared interest
pub const INTEREST_WEIGHT: u32 = 2;

/// Cap on the shared interest bonus
pub const INTEREST_CAP: u32 = 10;

/// Highest possible score
pub const MAX_SCORE: u32 = 100;

/// Why a candidate was suggested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReasonTag {
    /// Lives nearby
    Proximity,
    /// Shares connections with the requester
    MutualConnections,
    /// Declares the same interests
    SharedInterests,
}

impl ReasonTag {
    /// Get the tag name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonTag::Proximity => "proximity",
            ReasonTag::MutualConnections => "mutual_connections",
            ReasonTag::SharedInterests => "shared_interests",
        }
    }
}

impl std::fmt::Display for ReasonTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contribution to a score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reason {
    /// Signal that contributed
    pub tag: ReasonTag,

    /// Points it added
    pub strength: u8,

    /// Human readable explanation
    pub description: String,
}

/// Requester-side inputs for scoring one candidate
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    /// Resident receiving the recommendation
    pub requester: &'a Resident,

    /// Connections the requester and the candidate share
    pub mutual_count: usize,
}

/// Score in `0..=100` with the reasons that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    /// Final clamped value
    pub value: u8,

    /// Contributions, strongest first
    pub reasons: Vec<Reason>,
}

/// Score `candidate` for the requester in `context`
///
/// # Examples
///
/// ```
/// use hearth_domain::{Location, Resident, UserId};
/// use hearth_engine::scorer::{score, ScoringContext};
///
/// let home = Location::new("Yaba");
/// let me = Resident::new(UserId::new("ada").unwrap(), "Ada", 0).with_location(home.clone());
/// let them = Resident::new(UserId::new("obi").unwrap(), "Obi", 0).with_location(home);
///
/// let result = score(&them, &ScoringContext { requester: &me, mutual_count: 2 });
/// assert_eq!(result.value, 50 + 30 + 10);
/// ```
pub fn score(candidate: &Resident, context: &ScoringContext<'_>) -> Score {
    let mut reasons = Vec::new();

    if let (Some(mine), Some(theirs)) = (&context.requester.location, &candidate.location) {
        if mine.same_neighborhood(theirs) {
            reasons.push(Reason {
                tag: ReasonTag::Proximity,
                strength: SAME_NEIGHBORHOOD_BONUS as u8,
                description: format!("Lives in {}", theirs.neighborhood),
            });
        }
    }

    if context.mutual_count > 0 {
        let bonus = capped(context.mutual_count, MUTUAL_WEIGHT, MUTUAL_CAP);
        let noun = if context.mutual_count == 1 { "connection" } else { "connections" };
        reasons.push(Reason {
            tag: ReasonTag::MutualConnections,
            strength: bonus as u8,
            description: format!("{} mutual {}", context.mutual_count, noun),
        });
    }

    let shared = context.requester.shared_interests(candidate);
    if !shared.is_empty() {
        reasons.push(Reason {
            tag: ReasonTag::SharedInterests,
            strength: capped(shared.len(), INTEREST_WEIGHT, INTEREST_CAP) as u8,
            description: format!("Also into {}", shared.join(", ")),
        });
    }

    let total = reasons
        .iter()
        .fold(BASE_SCORE, |acc, r| acc + u32::from(r.strength))
        .min(MAX_SCORE);

    reasons.sort_by(|a, b| b.strength.cmp(&a.strength).then(a.tag.cmp(&b.tag)));

    Score {
        value: total as u8,
        reasons,
    }
}

fn capped(count: usize, weight: u32, cap: u32) -> u32 {
    u32::try_from(count)
        .unwrap_or(u32::MAX)
        .saturating_mul(weight)
        .min(cap)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use hearth_domain::{Location, UserId};
    use proptest::prelude::*;

    fn arb_resident(id: &'static str) -> impl Strategy<Value = Resident> {
        (
            proptest::option::of(prop::sample::select(vec!["Yaba", "Ikoyi", "Surulere"])),
            proptest::collection::vec("[a-e]{1,3}", 0..12),
            any::<u64>(),
        )
            .prop_map(move |(neighborhood, interests, joined_at)| {
                let r = Resident::new(UserId::new(id).unwrap(), id, joined_at)
                    .with_interests(interests);
                match neighborhood {
                    Some(n) => r.with_location(Location::new(n)),
                    None => r,
                }
            })
    }

    proptest! {
        #[test]
        fn score_stays_in_bounds(
            me in arb_resident("ada"),
            them in arb_resident("obi"),
            mutual_count in any::<usize>(),
        ) {
            let s = score(&them, &ScoringContext { requester: &me, mutual_count });
            prop_assert!(s.value >= BASE_SCORE as u8);
            prop_assert!(u32::from(s.value) <= MAX_SCORE);
        }

        #[test]
        fn score_is_deterministic(
            me in arb_resident("ada"),
            them in arb_resident("obi"),
            mutual_count in 0usize..50,
        ) {
            let context = ScoringContext { requester: &me, mutual_count };
            prop_assert_eq!(score(&them, &context), score(&them, &context));
        }

        #[test]
        fn reasons_are_ordered_by_strength(
            me in arb_resident("ada"),
            them in arb_resident("obi"),
            mutual_count in 0usize..10,
        ) {
            let s = score(&them, &ScoringContext { requester: &me, mutual_count });
            for pair in s.reasons.windows(2) {
                prop_assert!(pair[0].strength >= pair[1].strength);
            }
        }
    }
}
