//! Storage traits and error types
//!
//! This module defines the persistence port used by the crawl queue and the
//! content writer, and its error type.

use crate::state::TargetStatus;
use crate::storage::{
    ChunkRecord, CleanupCounts, ContentDraft, ContentRecord, CrawlTarget, NewTarget, UpsertOutcome,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TargetStatus, to: TargetStatus },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// All writes are keyed by a unique column (target URL, content URL, slug),
/// so repeated or overlapping runs converge instead of duplicating rows.
pub trait Storage {
    // ===== Crawl Queue =====

    /// Inserts a pending target unless the URL is already queued
    ///
    /// # Returns
    ///
    /// `true` if a new row was created
    fn enqueue_target(&mut self, target: &NewTarget) -> StorageResult<bool>;

    /// Gets a target by URL
    fn get_target(&self, url: &str) -> StorageResult<Option<CrawlTarget>>;

    /// Checks whether a URL is already queued, in any status
    fn target_exists(&self, url: &str) -> StorageResult<bool>;

    /// Selects targets eligible for processing
    ///
    /// Eligible targets are `pending`, or `failed` with `retry_count <
    /// max_retries`, and have no `next_attempt_at` in the future. Results are
    /// ordered by priority descending, then `first_seen` ascending.
    fn eligible_targets(
        &self,
        limit: u32,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<CrawlTarget>>;

    /// Moves a target to `processing`
    fn mark_processing(&mut self, url: &str, now: DateTime<Utc>) -> StorageResult<()>;

    /// Moves a target to `completed` and clears its error
    fn mark_completed(&mut self, url: &str, now: DateTime<Utc>) -> StorageResult<()>;

    /// Moves a target to `failed`
    ///
    /// # Arguments
    ///
    /// * `retry_count` - The new retry count
    /// * `next_attempt_at` - Earliest time the target may be dequeued again
    /// * `permanent` - The failure is terminal regardless of `retry_count`
    fn mark_failed(
        &mut self,
        url: &str,
        error: &str,
        retry_count: u32,
        next_attempt_at: Option<DateTime<Utc>>,
        permanent: bool,
        now: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Resets targets stranded in `processing` back to `pending`
    ///
    /// # Returns
    ///
    /// The number of recovered targets
    fn recover_processing(&mut self) -> StorageResult<u64>;

    /// Deletes completed targets and failed targets last checked before `failed_before`
    fn cleanup_targets(&mut self, failed_before: DateTime<Utc>) -> StorageResult<CleanupCounts>;

    /// Counts targets in a status
    fn count_targets_by_status(&self, status: TargetStatus) -> StorageResult<u64>;

    // ===== Content =====

    /// Checks whether content was already persisted for a URL
    fn content_url_exists(&self, url: &str) -> StorageResult<bool>;

    /// Gets a content record by URL
    fn get_content_by_url(&self, url: &str) -> StorageResult<Option<ContentRecord>>;

    /// Finds the oldest record with the given hash stored under another URL
    fn find_by_hash_excluding(
        &self,
        content_hash: &str,
        url: &str,
    ) -> StorageResult<Option<ContentRecord>>;

    /// Checks whether a slug is taken
    fn slug_exists(&self, slug: &str) -> StorageResult<bool>;

    /// Creates or updates the record keyed by `draft.url`
    ///
    /// Updates keep the existing slug and `created_at`. A slug collision on
    /// insert surfaces as `StorageError::ConstraintViolation`.
    fn upsert_content(
        &mut self,
        draft: &ContentDraft,
        now: DateTime<Utc>,
    ) -> StorageResult<UpsertOutcome>;

    /// Replaces all chunks of a record
    ///
    /// # Returns
    ///
    /// The new chunk IDs, in position order
    fn replace_chunks(&mut self, content_id: i64, chunks: &[String]) -> StorageResult<Vec<i64>>;

    /// Attaches an embedding vector to a chunk
    fn set_chunk_embedding(&mut self, chunk_id: i64, embedding: &[f32]) -> StorageResult<()>;

    /// Gets the chunks of a record in position order
    fn get_chunks(&self, content_id: i64) -> StorageResult<Vec<ChunkRecord>>;

    // ===== Statistics =====

    /// Gets total content record count
    fn count_content(&self) -> StorageResult<u64>;

    /// Counts records flagged as duplicates of another URL
    fn count_duplicates(&self) -> StorageResult<u64>;

    /// Counts verified records
    fn count_verified(&self) -> StorageResult<u64>;

    /// Gets content counts per platform, sorted by platform name
    fn content_per_platform(&self) -> StorageResult<Vec<(String, u64)>>;
}
