//! Hearth Storage Layer
//!
//! Implements the `EdgeStore` trait on SQLite and provides an in-process
//! `ResidentDirectory`.
//!
//! # Architecture
//!
//! - One `connections` table of directed request rows
//! - Normalized `(user_low, user_high)` columns with unique partial indexes:
//!   one active (pending/accepted) edge and one block per unordered pair
//! - Status changes are compare-and-set `UPDATE ... WHERE status = ?`
//! - Write-once `accepted_at`, guarded by a trigger
//!
//! # Examples
//!
//! ```no_run
//! use hearth_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for connection operations
//! ```

#![warn(missing_docs)]

mod directory;

pub use directory::{DirectoryError, ResidentRegistry};

use hearth_domain::traits::{CasOutcome, EdgeStore, InsertOutcome};
use hearth_domain::{
    Connection, ConnectionId, ConnectionMetadata, ConnectionStatus, ConnectionType, PairKey,
    ProximityLevel, UserId,
};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Metadata (de)serialization error
    #[error("Metadata encoding error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Column list shared by every connection query
const CONNECTION_COLUMNS: &str = "id, from_user, to_user, connection_type, status, initiated_by, \
     created_at, updated_at, accepted_at, metadata";

/// Users per `IN (...)` list when batching; keeps well under SQLite's
/// bound-parameter limit since each user is bound twice
const BATCH_SIZE: usize = 400;

/// Stored form of [`ConnectionMetadata`]
#[derive(Debug, Serialize, Deserialize)]
struct MetadataRecord {
    version: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proximity: Option<String>,
    #[serde(default)]
    shared_interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mutual_count_at_request: Option<u32>,
}

/// SQLite-based implementation of EdgeStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share one store behind a
/// `Mutex`, or give each thread its own `SqliteStore` on the same file.
/// Either way the compare-and-set contract holds, because it is enforced
/// by the `UPDATE ... WHERE status = ?` statement rather than by locks.
pub struct SqliteStore {
    conn: rusqlite::Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hearth_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("hearth.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = rusqlite::Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Check the database answers queries
    pub fn ping(&self) -> Result<(), StoreError> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Convert ConnectionId to bytes for storage
    fn id_to_bytes(id: ConnectionId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    /// Convert bytes to ConnectionId
    fn bytes_to_id(bytes: &[u8]) -> Result<ConnectionId, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for ConnectionId, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(ConnectionId::from_value(u128::from_be_bytes(arr)))
    }

    fn encode_metadata(metadata: &ConnectionMetadata) -> Result<String, StoreError> {
        let record = MetadataRecord {
            version: metadata.version,
            proximity: metadata.proximity.map(|p| p.as_str().to_string()),
            shared_interests: metadata.shared_interests.clone(),
            mutual_count_at_request: metadata.mutual_count_at_request,
        };
        Ok(serde_json::to_string(&record)?)
    }

    fn decode_metadata(raw: &str) -> Result<ConnectionMetadata, StoreError> {
        let record: MetadataRecord = serde_json::from_str(raw)?;
        let proximity = match record.proximity {
            Some(level) => Some(ProximityLevel::parse(&level).ok_or_else(|| {
                StoreError::InvalidData(format!("Unknown proximity level: {}", level))
            })?),
            None => None,
        };

        Ok(ConnectionMetadata {
            version: record.version,
            proximity,
            shared_interests: record.shared_interests,
            mutual_count_at_request: record.mutual_count_at_request,
        })
    }

    /// Map a row selected with [`CONNECTION_COLUMNS`]
    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Connection> {
        fn invalid(col: usize, ty: Type, e: StoreError) -> rusqlite::Error {
            rusqlite::Error::FromSqlConversionFailure(col, ty, Box::new(e))
        }

        fn user(row: &rusqlite::Row<'_>, col: usize) -> rusqlite::Result<UserId> {
            let raw: String = row.get(col)?;
            UserId::new(raw).map_err(|e| invalid(col, Type::Text, StoreError::InvalidData(e)))
        }

        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_id(&id_bytes).map_err(|e| invalid(0, Type::Blob, e))?;

        let type_str: String = row.get(3)?;
        let connection_type = ConnectionType::parse(&type_str).ok_or_else(|| {
            invalid(
                3,
                Type::Text,
                StoreError::InvalidData(format!("Unknown connection type: {}", type_str)),
            )
        })?;

        let status_str: String = row.get(4)?;
        let status = ConnectionStatus::parse(&status_str).ok_or_else(|| {
            invalid(
                4,
                Type::Text,
                StoreError::InvalidData(format!("Unknown status: {}", status_str)),
            )
        })?;

        let metadata_raw: String = row.get(9)?;
        let metadata = Self::decode_metadata(&metadata_raw).map_err(|e| invalid(9, Type::Text, e))?;

        let accepted_at: Option<i64> = row.get(8)?;

        Ok(Connection {
            id,
            from_user: user(row, 1)?,
            to_user: user(row, 2)?,
            connection_type,
            status,
            initiated_by: user(row, 5)?,
            created_at: row.get::<_, i64>(6)? as u64,
            updated_at: row.get::<_, i64>(7)? as u64,
            accepted_at: accepted_at.map(|t| t as u64),
            metadata,
        })
    }

    /// Edges incident to `user`, optionally restricted to one status
    fn incident(
        &self,
        user: &UserId,
        status: Option<ConnectionStatus>,
    ) -> Result<Vec<Connection>, StoreError> {
        let mut sql = format!(
            "SELECT {} FROM connections WHERE (from_user = ?1 OR to_user = ?1)",
            CONNECTION_COLUMNS
        );
        if status.is_some() {
            sql.push_str(" AND status = ?2");
        }
        sql.push_str(" ORDER BY created_at, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match status {
            Some(status) => stmt
                .query_map(params![user.as_str(), status.as_str()], Self::map_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map(params![user.as_str()], Self::map_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(rows)
    }

    fn active_in_pair(
        conn: &rusqlite::Connection,
        key: &PairKey,
    ) -> Result<Option<ConnectionId>, StoreError> {
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT id FROM connections
                 WHERE user_low = ?1 AND user_high = ?2 AND status IN ('pending', 'accepted')",
                params![key.low().as_str(), key.high().as_str()],
                |row| row.get(0),
            )
            .optional()?;

        bytes.map(|b| Self::bytes_to_id(&b)).transpose()
    }

    fn is_unique_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

impl EdgeStore for SqliteStore {
    type Error = StoreError;

    fn insert(&mut self, edge: Connection) -> Result<InsertOutcome, Self::Error> {
        let key = edge.pair_key();
        let metadata = Self::encode_metadata(&edge.metadata)?;

        // IMMEDIATE takes the write lock up front, so the checks below and
        // the insert see the same snapshot.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let blocked: bool = tx
            .query_row(
                "SELECT 1 FROM connections
                 WHERE user_low = ?1 AND user_high = ?2 AND status = 'blocked'",
                params![key.low().as_str(), key.high().as_str()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        if blocked {
            debug!(low = %key.low(), high = %key.high(), "insert refused: blocked pair");
            return Ok(InsertOutcome::Blocked);
        }

        if let Some(existing) = Self::active_in_pair(&tx, &key)? {
            return Ok(InsertOutcome::Duplicate { existing });
        }

        let inserted = tx.execute(
            "INSERT INTO connections (id, from_user, to_user, user_low, user_high, connection_type,
                                      status, initiated_by, created_at, updated_at, accepted_at, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                Self::id_to_bytes(edge.id),
                edge.from_user.as_str(),
                edge.to_user.as_str(),
                key.low().as_str(),
                key.high().as_str(),
                edge.connection_type.as_str(),
                edge.status.as_str(),
                edge.initiated_by.as_str(),
                edge.created_at as i64,
                edge.updated_at as i64,
                edge.accepted_at.map(|t| t as i64),
                metadata,
            ],
        );

        match inserted {
            Ok(_) => {
                tx.commit()?;
                Ok(InsertOutcome::Inserted(edge.id))
            }
            // Another writer won the pair between our check and insert
            Err(e) if Self::is_unique_violation(&e) => match Self::active_in_pair(&tx, &key)? {
                Some(existing) => Ok(InsertOutcome::Duplicate { existing }),
                None => Err(StoreError::Database(e)),
            },
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: ConnectionId) -> Result<Option<Connection>, Self::Error> {
        let sql = format!("SELECT {} FROM connections WHERE id = ?1", CONNECTION_COLUMNS);
        let connection = self
            .conn
            .query_row(&sql, params![Self::id_to_bytes(id)], Self::map_row)
            .optional()?;

        Ok(connection)
    }

    fn find_by_pair(&self, a: &UserId, b: &UserId) -> Result<Option<Connection>, Self::Error> {
        let key = match PairKey::new(a, b) {
            Ok(key) => key,
            Err(_) => return Ok(None),
        };

        let sql = format!(
            "SELECT {} FROM connections
             WHERE user_low = ?1 AND user_high = ?2
             ORDER BY CASE status
                          WHEN 'pending' THEN 0
                          WHEN 'accepted' THEN 0
                          WHEN 'blocked' THEN 1
                          ELSE 2
                      END,
                      updated_at DESC,
                      id DESC
             LIMIT 1",
            CONNECTION_COLUMNS
        );

        let connection = self
            .conn
            .query_row(
                &sql,
                params![key.low().as_str(), key.high().as_str()],
                Self::map_row,
            )
            .optional()?;

        Ok(connection)
    }

    fn find_accepted(&self, user: &UserId) -> Result<Vec<Connection>, Self::Error> {
        self.incident(user, Some(ConnectionStatus::Accepted))
    }

    fn find_accepted_for(&self, users: &[UserId]) -> Result<Vec<Connection>, Self::Error> {
        let mut edges = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for chunk in users.chunks(BATCH_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT {} FROM connections
                 WHERE status = 'accepted'
                   AND (from_user IN ({p}) OR to_user IN ({p}))",
                CONNECTION_COLUMNS,
                p = placeholders
            );

            let bound = chunk.iter().chain(chunk.iter()).map(|u| u.as_str());
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(bound), Self::map_row)?
                .collect::<Result<Vec<_>, _>>()?;

            // An edge between two batched users shows up once per chunk it touches
            edges.extend(rows.into_iter().filter(|edge| seen.insert(edge.id)));
        }

        Ok(edges)
    }

    fn find_pending(&self, user: &UserId) -> Result<Vec<Connection>, Self::Error> {
        self.incident(user, Some(ConnectionStatus::Pending))
    }

    fn find_blocked(&self, user: &UserId) -> Result<Vec<Connection>, Self::Error> {
        self.incident(user, Some(ConnectionStatus::Blocked))
    }

    fn find_incident(&self, user: &UserId) -> Result<Vec<Connection>, Self::Error> {
        self.incident(user, None)
    }

    fn update_status(
        &mut self,
        id: ConnectionId,
        new: ConnectionStatus,
        expected: ConnectionStatus,
        now: u64,
    ) -> Result<CasOutcome, Self::Error> {
        let id_bytes = Self::id_to_bytes(id);
        let accepted_at = (new == ConnectionStatus::Accepted).then_some(now as i64);

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE connections
             SET status = ?1, updated_at = ?2, accepted_at = COALESCE(accepted_at, ?3)
             WHERE id = ?4 AND status = ?5",
            params![
                new.as_str(),
                now as i64,
                accepted_at,
                &id_bytes,
                expected.as_str()
            ],
        )?;

        if changed == 0 {
            let current: Option<String> = tx
                .query_row(
                    "SELECT status FROM connections WHERE id = ?1",
                    params![&id_bytes],
                    |row| row.get(0),
                )
                .optional()?;

            let current = current.as_deref().and_then(ConnectionStatus::parse);
            debug!(%id, expected = %expected, current = ?current, "compare-and-set lost");
            return Ok(CasOutcome::Stale { current });
        }

        let sql = format!("SELECT {} FROM connections WHERE id = ?1", CONNECTION_COLUMNS);
        let updated = tx.query_row(&sql, params![&id_bytes], Self::map_row)?;
        tx.commit()?;

        Ok(CasOutcome::Applied(updated))
    }

    fn delete(&mut self, id: ConnectionId, expected: ConnectionStatus) -> Result<bool, Self::Error> {
        let removed = self.conn.execute(
            "DELETE FROM connections WHERE id = ?1 AND status = ?2",
            params![Self::id_to_bytes(id), expected.as_str()],
        )?;
        Ok(removed > 0)
    }
}
