//! Storage module for persisting crawl data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - The crawl queue (`crawl_targets`)
//! - Content records and their paragraph chunks
//! - Statistics queries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::ContentType;
use crate::state::TargetStatus;
use crate::HarvestError;
use chrono::{DateTime, SecondsFormat, Utc};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Formats a timestamp for storage
///
/// Fixed microsecond precision keeps lexical order equal to chronological
/// order, which the queue's ordering and eligibility queries rely on.
pub fn db_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A queued crawl target as stored in the database
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    pub id: i64,
    pub url: String,
    pub platform: String,
    pub target_type: String,
    pub priority: i64,
    pub status: TargetStatus,
    pub retry_count: u32,
    pub first_seen: String,
    pub last_checked: Option<String>,
    pub error: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub next_attempt_at: Option<String>,

    /// Set when the last failure cannot succeed on retry
    pub permanent: bool,
}

/// A target about to be enqueued
#[derive(Debug, Clone)]
pub struct NewTarget {
    pub url: String,
    pub platform: String,
    pub target_type: String,
    pub priority: i64,
    pub first_seen: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

/// A persisted content record
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub platform: String,
    pub content_type: ContentType,
    pub source: String,
    pub author: Option<String>,
    pub votes: Option<i64>,
    pub is_verified: bool,
    pub language: String,
    pub content_hash: String,
    pub slug: String,
    pub duplicate_of: Option<String>,
    pub original_posts: u32,
    pub replies: u32,
    pub strategy: Option<String>,
    pub created_at: String,
    pub last_updated: String,
}

/// Content ready to be written
///
/// `slug` is only used when the URL is new; existing records keep theirs.
#[derive(Debug, Clone)]
pub struct ContentDraft {
    pub url: String,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub platform: String,
    pub content_type: ContentType,
    pub source: String,
    pub author: Option<String>,
    pub votes: Option<i64>,
    pub is_verified: bool,
    pub language: String,
    pub content_hash: String,
    pub slug: String,
    pub duplicate_of: Option<String>,
    pub original_posts: u32,
    pub replies: u32,
    pub strategy: Option<String>,
}

/// Result of an upsert by URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted { id: i64 },
    Updated { id: i64 },
}

impl UpsertOutcome {
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted { id } | Self::Updated { id } => *id,
        }
    }
}

/// A paragraph chunk of a content record
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: i64,
    pub content_id: i64,
    pub position: u32,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
}

/// Rows removed by a cleanup sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupCounts {
    pub completed: u64,
    pub failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_db_timestamp_fixed_precision() {
        let a = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(db_timestamp(a), "2024-03-01T12:00:00.000000Z");
    }

    #[test]
    fn test_db_timestamp_lexical_order() {
        let a = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        assert!(db_timestamp(a) < db_timestamp(b));
    }

    #[test]
    fn test_upsert_outcome_id() {
        assert_eq!(UpsertOutcome::Inserted { id: 3 }.id(), 3);
        assert_eq!(UpsertOutcome::Updated { id: 9 }.id(), 9);
    }
}
