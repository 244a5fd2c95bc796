//! Configuration for engine operations
//!
//! Bounds on response sizes, the recommendation candidate pool, and the
//! re-request cooldown.

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Configuration for the connection engine
///
/// # Examples
///
/// ```
/// use hearth_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.default_limit, 10);
/// assert_eq!(config.max_limit, 100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Recommendations returned when the caller gives no limit
    pub default_limit: usize,

    /// Hard upper bound on a caller-supplied limit
    pub max_limit: usize,

    /// Candidates scored per recommendation call; the rest are skipped
    pub candidate_pool_cap: usize,

    /// Page size when the caller gives none
    pub default_page_size: usize,

    /// Hard upper bound on a caller-supplied page size
    pub max_page_size: usize,

    /// Seconds after a rejection before the same initiator may ask again.
    /// 0 means no cooldown
    pub rerequest_cooldown_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            candidate_pool_cap: 500,
            default_page_size: 20,
            max_page_size: 100,
            rerequest_cooldown_secs: 0,
        }
    }
}

impl EngineConfig {
    /// Check the bounds are usable
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(EngineError::Config(format!(
                "default_limit must be in 1..={}, got {}",
                self.max_limit, self.default_limit
            )));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(EngineError::Config(format!(
                "default_page_size must be in 1..={}, got {}",
                self.max_page_size, self.default_page_size
            )));
        }
        if self.candidate_pool_cap == 0 {
            return Err(EngineError::Config(
                "candidate_pool_cap must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
