//! Pair module - normalized unordered user pairs
//!
//! A connection row is directed (`from_user → to_user`) but uniqueness,
//! blocking and neighbor queries all reason about the unordered pair.
//! `PairKey` makes that explicit: the lower id always comes first.

use crate::UserId;

/// The unordered pair `{a, b}` stored as `(min(a, b), max(a, b))`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    low: UserId,
    high: UserId,
}

impl PairKey {
    /// Normalize two distinct users into a pair key
    ///
    /// # Errors
    /// Returns error if both ids are the same user
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_domain::{PairKey, UserId};
    ///
    /// let a = UserId::new("amara").unwrap();
    /// let b = UserId::new("bayo").unwrap();
    /// assert_eq!(PairKey::new(&a, &b).unwrap(), PairKey::new(&b, &a).unwrap());
    /// ```
    pub fn new(a: &UserId, b: &UserId) -> Result<Self, String> {
        if a == b {
            return Err(format!("A pair needs two distinct users, got {} twice", a));
        }
        Ok(Self::ordered(a, b))
    }

    /// Normalize without the distinctness check
    pub(crate) fn ordered(a: &UserId, b: &UserId) -> Self {
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Self {
            low: low.clone(),
            high: high.clone(),
        }
    }

    /// The lexicographically smaller id
    pub fn low(&self) -> &UserId {
        &self.low
    }

    /// The lexicographically larger id
    pub fn high(&self) -> &UserId {
        &self.high
    }

    /// Whether `user` is one of the pair
    pub fn contains(&self, user: &UserId) -> bool {
        &self.low == user || &self.high == user
    }

    /// The member of the pair that is not `user`
    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if &self.low == user {
            Some(&self.high)
        } else if &self.high == user {
            Some(&self.low)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[test]
    fn test_self_pair_rejected() {
        assert!(PairKey::new(&user("a"), &user("a")).is_err());
    }

    #[test]
    fn test_other_member() {
        let key = PairKey::new(&user("zed"), &user("amy")).unwrap();
        assert_eq!(key.low(), &user("amy"));
        assert_eq!(key.other(&user("amy")), Some(&user("zed")));
        assert_eq!(key.other(&user("zed")), Some(&user("amy")));
        assert_eq!(key.other(&user("bob")), None);
        assert!(!key.contains(&user("bob")));
    }
}
