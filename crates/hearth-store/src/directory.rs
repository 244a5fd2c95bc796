//! In-process resident directory.
//!
//! Stands in for the external identity service: profiles are seeded at
//! startup (from configuration or tests) and only read afterwards by the
//! graph engine.

use hearth_domain::traits::ResidentDirectory;
use hearth_domain::{LocationFilter, Resident, UserId};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Directory error
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A writer panicked while holding the lock
    #[error("Resident directory lock poisoned")]
    Poisoned,
}

/// Resident registry keyed by user id
///
/// Iteration follows user-id order, so every listing it returns is
/// deterministic.
#[derive(Clone, Default)]
pub struct ResidentRegistry {
    residents: Arc<RwLock<BTreeMap<UserId, Resident>>>,
}

impl ResidentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding `residents`
    pub fn from_residents(residents: impl IntoIterator<Item = Resident>) -> Self {
        let residents = residents
            .into_iter()
            .map(|resident| (resident.id.clone(), resident))
            .collect();

        Self {
            residents: Arc::new(RwLock::new(residents)),
        }
    }

    /// Add or replace a resident, returning the previous profile
    pub fn register(&self, resident: Resident) -> Result<Option<Resident>, DirectoryError> {
        let mut residents = self.residents.write().map_err(|_| DirectoryError::Poisoned)?;
        Ok(residents.insert(resident.id.clone(), resident))
    }

    /// Number of known residents
    pub fn len(&self) -> Result<usize, DirectoryError> {
        let residents = self.residents.read().map_err(|_| DirectoryError::Poisoned)?;
        Ok(residents.len())
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> Result<bool, DirectoryError> {
        Ok(self.len()? == 0)
    }
}

impl ResidentDirectory for ResidentRegistry {
    type Error = DirectoryError;

    fn get_resident(&self, id: &UserId) -> Result<Option<Resident>, Self::Error> {
        let residents = self.residents.read().map_err(|_| DirectoryError::Poisoned)?;
        Ok(residents.get(id).cloned())
    }

    fn get_residents(&self, ids: &[UserId]) -> Result<Vec<Resident>, Self::Error> {
        let residents = self.residents.read().map_err(|_| DirectoryError::Poisoned)?;
        Ok(ids.iter().filter_map(|id| residents.get(id).cloned()).collect())
    }

    fn residents_matching(&self, filter: &LocationFilter) -> Result<Vec<Resident>, Self::Error> {
        let residents = self.residents.read().map_err(|_| DirectoryError::Poisoned)?;
        Ok(residents
            .values()
            .filter(|resident| filter.matches(resident.location.as_ref()))
            .cloned()
            .collect())
    }
}
