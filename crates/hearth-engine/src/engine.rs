//! The connection engine and its shared plumbing

use std::fmt::Display;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use hearth_domain::traits::{EdgeStore, ResidentDirectory};
use hearth_domain::{PageRequest, Resident, UserId};

use crate::{EngineConfig, EngineError};

/// Source of "now", in seconds since the Unix epoch
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

fn system_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Connection lifecycle, graph queries and recommendations over one edge
/// store and one resident directory
///
/// The store is locked for a single call at a time. Reads and the
/// compare-and-set that follows them are separate round trips, so a
/// transition that lost a race surfaces as [`EngineError::StaleState`]
/// instead of being serialized behind the lock.
pub struct ConnectionEngine<S, D> {
    pub(crate) store: Arc<Mutex<S>>,
    pub(crate) directory: Arc<D>,
    pub(crate) config: EngineConfig,
    clock: Clock,
}

impl<S, D> Clone for ConnectionEngine<S, D> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            directory: Arc::clone(&self.directory),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, D> ConnectionEngine<S, D>
where
    S: EdgeStore,
    S::Error: Display,
    D: ResidentDirectory,
    D::Error: Display,
{
    /// Create an engine over a shared store and directory
    ///
    /// # Errors
    /// Returns [`EngineError::Config`] if `config` fails validation
    pub fn new(
        store: Arc<Mutex<S>>,
        directory: Arc<D>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            store,
            directory,
            config,
            clock: Arc::new(system_now),
        })
    }

    /// Replace the wall clock
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared handle to the edge store
    pub fn store(&self) -> &Arc<Mutex<S>> {
        &self.store
    }

    /// Shared handle to the resident directory
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    pub(crate) fn now(&self) -> u64 {
        (self.clock)()
    }

    /// Run a read against the store under the lock
    pub(crate) fn read<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&S) -> Result<T, S::Error>,
    {
        let store = self
            .store
            .lock()
            .map_err(|_| EngineError::Store("Edge store lock poisoned".to_string()))?;
        f(&store).map_err(|e| EngineError::Store(e.to_string()))
    }

    /// Run a write against the store under the lock
    pub(crate) fn write<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut S) -> Result<T, S::Error>,
    {
        let mut store = self
            .store
            .lock()
            .map_err(|_| EngineError::Store("Edge store lock poisoned".to_string()))?;
        f(&mut store).map_err(|e| EngineError::Store(e.to_string()))
    }

    /// Profile of `id`, or [`EngineError::ResidentNotFound`]
    pub fn resident(&self, id: &UserId) -> Result<Resident, EngineError> {
        self.directory
            .get_resident(id)
            .map_err(|e| EngineError::Directory(e.to_string()))?
            .ok_or_else(|| EngineError::ResidentNotFound(id.clone()))
    }

    pub(crate) fn residents(&self, ids: &[UserId]) -> Result<Vec<Resident>, EngineError> {
        self.directory
            .get_residents(ids)
            .map_err(|e| EngineError::Directory(e.to_string()))
    }

    /// Build a page request, applying the configured default and bound
    ///
    /// # Errors
    /// Returns [`EngineError::Validation`] for page 0 or a page size outside
    /// `1..=max_page_size`
    pub fn page_request(
        &self,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> Result<PageRequest, EngineError> {
        let page_size = page_size.unwrap_or(self.config.default_page_size);
        if page_size > self.config.max_page_size {
            return Err(EngineError::Validation(format!(
                "page_size must be between 1 and {}",
                self.config.max_page_size
            )));
        }
        PageRequest::new(page.unwrap_or(1), page_size).map_err(EngineError::Validation)
    }

    /// Resolve a recommendation limit against the configured default and bound
    pub(crate) fn limit(&self, limit: Option<usize>) -> Result<usize, EngineError> {
        match limit {
            None => Ok(self.config.default_limit),
            Some(n) if (1..=self.config.max_limit).contains(&n) => Ok(n),
            Some(n) => Err(EngineError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                self.config.max_limit, n
            ))),
        }
    }
}
