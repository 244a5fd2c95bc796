//! Configuration file parsing for the server.
//!
//! Loads settings from TOML files including bind address, JWT secret,
//! token expiry, the database location, engine bounds and the residents the
//! directory is seeded with.

use hearth_domain::{Location, Resident, UserId};
use hearth_engine::EngineConfig;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// A value is present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// JWT secret for signing tokens
    pub jwt_secret: String,

    /// Token expiry in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,

    /// SQLite database file, or ":memory:"
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Engine bounds
    #[serde(default)]
    pub engine: EngineConfig,

    /// Residents known to the directory
    #[serde(default)]
    pub residents: Vec<ResidentConfig>,
}

/// Resident seed entry
#[derive(Debug, Clone, Deserialize)]
pub struct ResidentConfig {
    /// User identifier
    pub id: String,

    /// Name shown to other residents
    pub display_name: String,

    /// Primary neighborhood
    #[serde(default)]
    pub neighborhood: Option<String>,

    /// District containing the neighborhood
    #[serde(default)]
    pub district: Option<String>,

    /// Declared interests
    #[serde(default)]
    pub interests: Vec<String>,

    /// Join timestamp (seconds since Unix epoch)
    #[serde(default)]
    pub joined_at: u64,
}

/// Default token expiry: 1 hour
fn default_token_expiry() -> u64 {
    3600
}

fn default_database_path() -> String {
    ":memory:".to_string()
}

impl ResidentConfig {
    /// Build the directory profile
    pub fn to_resident(&self) -> Result<Resident, ConfigError> {
        let id = UserId::new(self.id.as_str())
            .map_err(|e| ConfigError::Invalid(format!("resident id {:?}: {}", self.id, e)))?;
        let resident = Resident::new(id, self.display_name.as_str(), self.joined_at)
            .with_interests(self.interests.iter().cloned());

        match (&self.neighborhood, &self.district) {
            (Some(neighborhood), district) => {
                let location = Location::new(neighborhood.as_str());
                let location = match district {
                    Some(d) => location.with_district(d.as_str()),
                    None => location,
                };
                Ok(resident.with_location(location))
            }
            (None, Some(_)) => Err(ConfigError::Invalid(format!(
                "resident {} has a district but no neighborhood",
                self.id
            ))),
            (None, None) => Ok(resident),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields and engine bounds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingField("jwt_secret".to_string()));
        }
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.seed_residents()?;
        Ok(())
    }

    /// Profiles to seed the resident directory with
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for a malformed entry or a repeated id
    pub fn seed_residents(&self) -> Result<Vec<Resident>, ConfigError> {
        let mut seen = BTreeSet::new();
        self.residents
            .iter()
            .map(|entry| {
                if !seen.insert(entry.id.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "resident {} is listed twice",
                        entry.id
                    )));
                }
                entry.to_resident()
            })
            .collect()
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        let resident = |id: &str, name: &str, neighborhood: &str, joined_at: u64| ResidentConfig {
            id: id.to_string(),
            display_name: name.to_string(),
            neighborhood: Some(neighborhood.to_string()),
            district: Some("Mainland".to_string()),
            interests: Vec::new(),
            joined_at,
        };

        ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            jwt_secret: "test-secret-key-do-not-use-in-production".to_string(),
            token_expiry_secs: 3600,
            database_path: default_database_path(),
            engine: EngineConfig::default(),
            residents: vec![
                resident("amara", "Amara", "Yaba", 1_700_000_000),
                resident("bayo", "Bayo", "Yaba", 1_700_100_000),
                resident("chidi", "Chidi", "Surulere", 1_700_200_000),
            ],
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}
