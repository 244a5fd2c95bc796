//! Resident module - the people on either end of a connection
//!
//! Residents are owned by the identity directory. The graph never mutates
//! them; it only reads their location and interests as ranking signals.

use std::fmt;

use crate::ProximityLevel;

/// Identifier of a resident as issued by the identity directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(String);

impl UserId {
    /// Create a user id
    ///
    /// # Errors
    /// Returns error if the id is empty or carries surrounding whitespace
    ///
    /// # Examples
    ///
    /// ```
    /// use hearth_domain::UserId;
    ///
    /// let id = UserId::new("ada").unwrap();
    /// assert_eq!(id.as_str(), "ada");
    /// assert!(UserId::new("  ").is_err());
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err("User id cannot be empty".to_string());
        }
        if value.trim().len() != value.len() {
            return Err(format!("User id has surrounding whitespace: {:?}", value));
        }
        Ok(Self(value))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A resident's declared primary location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Neighborhood or estate name
    pub neighborhood: String,

    /// Wider district the neighborhood belongs to
    pub district: Option<String>,
}

impl Location {
    /// Create a location without a district
    pub fn new(neighborhood: impl Into<String>) -> Self {
        Self {
            neighborhood: neighborhood.into(),
            district: None,
        }
    }

    /// Attach a district
    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    /// Whether both locations name the same neighborhood (case-insensitive)
    pub fn same_neighborhood(&self, other: &Location) -> bool {
        same_place(&self.neighborhood, &other.neighborhood)
    }

    /// Whether both locations declare the same district
    pub fn same_district(&self, other: &Location) -> bool {
        match (&self.district, &other.district) {
            (Some(a), Some(b)) => same_place(a, b),
            _ => false,
        }
    }

    /// Classify how close another location is to this one
    pub fn proximity_to(&self, other: &Location) -> ProximityLevel {
        if self.same_neighborhood(other) {
            ProximityLevel::SameNeighborhood
        } else if self.same_district(other) {
            ProximityLevel::SameDistrict
        } else {
            ProximityLevel::Elsewhere
        }
    }
}

fn same_place(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Location criteria for discovery
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocationFilter {
    /// No location restriction
    #[default]
    Any,

    /// Residents of the named neighborhood
    Neighborhood(String),

    /// Residents of the named district
    District(String),
}

impl LocationFilter {
    /// The filter matching a resident's own primary neighborhood
    ///
    /// Residents without a location on record get [`LocationFilter::Any`],
    /// so discovery degrades to the whole directory instead of failing.
    pub fn around(location: Option<&Location>) -> Self {
        match location {
            Some(location) => LocationFilter::Neighborhood(location.neighborhood.clone()),
            None => LocationFilter::Any,
        }
    }

    /// Check whether a (possibly missing) location satisfies the filter
    pub fn matches(&self, location: Option<&Location>) -> bool {
        match (self, location) {
            (LocationFilter::Any, _) => true,
            (LocationFilter::Neighborhood(name), Some(location)) => {
                same_place(name, &location.neighborhood)
            }
            (LocationFilter::District(name), Some(location)) => location
                .district
                .as_deref()
                .is_some_and(|district| same_place(name, district)),
            (_, None) => false,
        }
    }
}

/// Profile of a resident as supplied by the identity directory
#[derive(Debug, Clone, PartialEq)]
pub struct Resident {
    /// Directory identifier
    pub id: UserId,

    /// Name shown to other residents
    pub display_name: String,

    /// Primary location, if declared
    pub location: Option<Location>,

    /// Free-form interest tags
    pub interests: Vec<String>,

    /// When the resident joined (seconds since Unix epoch)
    pub joined_at: u64,
}

impl Resident {
    /// Create a resident with no location or interests
    pub fn new(id: UserId, display_name: impl Into<String>, joined_at: u64) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            location: None,
            interests: Vec::new(),
            joined_at,
        }
    }

    /// Attach a primary location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach interest tags
    pub fn with_interests<I, S>(mut self, interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interests = interests.into_iter().map(Into::into).collect();
        self
    }

    /// Interests both residents declare, lowercased, sorted and deduplicated
    pub fn shared_interests(&self, other: &Resident) -> Vec<String> {
        let theirs: std::collections::BTreeSet<String> = other
            .interests
            .iter()
            .map(|i| i.trim().to_lowercase())
            .collect();

        let shared: std::collections::BTreeSet<String> = self
            .interests
            .iter()
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty() && theirs.contains(i))
            .collect();

        shared.into_iter().collect()
    }

    /// How close another resident lives, if both declared a location
    pub fn proximity_to(&self, other: &Resident) -> Option<ProximityLevel> {
        match (&self.location, &other.location) {
            (Some(mine), Some(theirs)) => Some(mine.proximity_to(theirs)),
            _ => None,
        }
    }
}
