//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::config::ContentType;
use crate::state::TargetStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    db_timestamp, ChunkRecord, CleanupCounts, ContentDraft, ContentRecord, CrawlTarget, NewTarget,
    UpsertOutcome,
};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

const TARGET_COLUMNS: &str = "id, url, platform, target_type, priority, status, retry_count,
     first_seen, last_checked, error, metadata, next_attempt_at, permanent";

const CONTENT_COLUMNS: &str = "id, url, title, body, category, platform, content_type, source,
     author, votes, is_verified, language, content_hash, slug, duplicate_of, original_posts,
     replies, strategy, created_at, last_updated";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Reads the current status and checks the move to `to`
    fn check_transition(&self, url: &str, to: TargetStatus) -> StorageResult<()> {
        let current: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM crawl_targets WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        let current = current.ok_or_else(|| StorageError::TargetNotFound(url.to_string()))?;
        let from = TargetStatus::from_db_string(&current)
            .ok_or_else(|| StorageError::Serialization(format!("Unknown status '{}'", current)))?;

        if !from.can_transition_to(to) {
            return Err(StorageError::InvalidTransition { from, to });
        }
        Ok(())
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn target_from_row(row: &Row<'_>) -> rusqlite::Result<CrawlTarget> {
    let metadata: Option<String> = row.get(10)?;
    Ok(CrawlTarget {
        id: row.get(0)?,
        url: row.get(1)?,
        platform: row.get(2)?,
        target_type: row.get(3)?,
        priority: row.get(4)?,
        status: TargetStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(TargetStatus::Failed),
        retry_count: row.get(6)?,
        first_seen: row.get(7)?,
        last_checked: row.get(8)?,
        error: row.get(9)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        next_attempt_at: row.get(11)?,
        permanent: row.get(12)?,
    })
}

fn content_from_row(row: &Row<'_>) -> rusqlite::Result<ContentRecord> {
    Ok(ContentRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        category: row.get(4)?,
        platform: row.get(5)?,
        content_type: ContentType::from_db_string(&row.get::<_, String>(6)?).unwrap_or_default(),
        source: row.get(7)?,
        author: row.get(8)?,
        votes: row.get(9)?,
        is_verified: row.get::<_, i64>(10)? != 0,
        language: row.get(11)?,
        content_hash: row.get(12)?,
        slug: row.get(13)?,
        duplicate_of: row.get(14)?,
        original_posts: row.get(15)?,
        replies: row.get(16)?,
        strategy: row.get(17)?,
        created_at: row.get(18)?,
        last_updated: row.get(19)?,
    })
}

/// Maps UNIQUE/NOT NULL failures to `ConstraintViolation`
fn map_constraint(e: rusqlite::Error) -> StorageError {
    match &e {
        rusqlite::Error::SqliteFailure(err, msg) if err.code == ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation(msg.clone().unwrap_or_else(|| err.to_string()))
        }
        _ => StorageError::Sqlite(e),
    }
}

impl Storage for SqliteStorage {
    // ===== Crawl Queue =====

    fn enqueue_target(&mut self, target: &NewTarget) -> StorageResult<bool> {
        let metadata = target
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO crawl_targets
             (url, platform, target_type, priority, status, retry_count, first_seen, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
            params![
                target.url,
                target.platform,
                target.target_type,
                target.priority,
                TargetStatus::Pending.to_db_string(),
                db_timestamp(target.first_seen),
                metadata,
            ],
        )?;

        Ok(inserted > 0)
    }

    fn get_target(&self, url: &str) -> StorageResult<Option<CrawlTarget>> {
        let sql = format!("SELECT {} FROM crawl_targets WHERE url = ?1", TARGET_COLUMNS);
        let target = self
            .conn
            .query_row(&sql, params![url], target_from_row)
            .optional()?;
        Ok(target)
    }

    fn target_exists(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM crawl_targets WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn eligible_targets(
        &self,
        limit: u32,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<CrawlTarget>> {
        let sql = format!(
            "SELECT {} FROM crawl_targets
             WHERE (status = ?1 OR (status = ?2 AND retry_count < ?3 AND permanent = 0))
               AND (next_attempt_at IS NULL OR next_attempt_at <= ?4)
             ORDER BY priority DESC, first_seen ASC, id ASC
             LIMIT ?5",
            TARGET_COLUMNS
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let targets = stmt
            .query_map(
                params![
                    TargetStatus::Pending.to_db_string(),
                    TargetStatus::Failed.to_db_string(),
                    max_retries,
                    db_timestamp(now),
                    limit,
                ],
                target_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(targets)
    }

    fn mark_processing(&mut self, url: &str, now: DateTime<Utc>) -> StorageResult<()> {
        self.check_transition(url, TargetStatus::Processing)?;
        self.conn.execute(
            "UPDATE crawl_targets SET status = ?1, last_checked = ?2 WHERE url = ?3",
            params![TargetStatus::Processing.to_db_string(), db_timestamp(now), url],
        )?;
        Ok(())
    }

    fn mark_completed(&mut self, url: &str, now: DateTime<Utc>) -> StorageResult<()> {
        self.check_transition(url, TargetStatus::Completed)?;
        self.conn.execute(
            "UPDATE crawl_targets SET status = ?1, last_checked = ?2, error = NULL,
             next_attempt_at = NULL WHERE url = ?3",
            params![TargetStatus::Completed.to_db_string(), db_timestamp(now), url],
        )?;
        Ok(())
    }

    fn mark_failed(
        &mut self,
        url: &str,
        error: &str,
        retry_count: u32,
        next_attempt_at: Option<DateTime<Utc>>,
        permanent: bool,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.check_transition(url, TargetStatus::Failed)?;
        self.conn.execute(
            "UPDATE crawl_targets SET status = ?1, error = ?2, retry_count = ?3,
             next_attempt_at = ?4, permanent = ?5, last_checked = ?6 WHERE url = ?7",
            params![
                TargetStatus::Failed.to_db_string(),
                error,
                retry_count,
                next_attempt_at.map(db_timestamp),
                permanent,
                db_timestamp(now),
                url
            ],
        )?;
        Ok(())
    }

    fn recover_processing(&mut self) -> StorageResult<u64> {
        let recovered = self.conn.execute(
            "UPDATE crawl_targets SET status = ?1 WHERE status = ?2",
            params![
                TargetStatus::Pending.to_db_string(),
                TargetStatus::Processing.to_db_string()
            ],
        )?;
        Ok(recovered as u64)
    }

    fn cleanup_targets(&mut self, failed_before: DateTime<Utc>) -> StorageResult<CleanupCounts> {
        let tx = self.conn.transaction()?;

        let completed = tx.execute(
            "DELETE FROM crawl_targets WHERE status = ?1",
            params![TargetStatus::Completed.to_db_string()],
        )?;

        let failed = tx.execute(
            "DELETE FROM crawl_targets
             WHERE status = ?1 AND COALESCE(last_checked, first_seen) < ?2",
            params![
                TargetStatus::Failed.to_db_string(),
                db_timestamp(failed_before)
            ],
        )?;

        tx.commit()?;

        Ok(CleanupCounts {
            completed: completed as u64,
            failed: failed as u64,
        })
    }

    fn count_targets_by_status(&self, status: TargetStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawl_targets WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Content =====

    fn content_url_exists(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM content_records WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get_content_by_url(&self, url: &str) -> StorageResult<Option<ContentRecord>> {
        let sql = format!(
            "SELECT {} FROM content_records WHERE url = ?1",
            CONTENT_COLUMNS
        );
        let record = self
            .conn
            .query_row(&sql, params![url], content_from_row)
            .optional()?;
        Ok(record)
    }

    fn find_by_hash_excluding(
        &self,
        content_hash: &str,
        url: &str,
    ) -> StorageResult<Option<ContentRecord>> {
        let sql = format!(
            "SELECT {} FROM content_records
             WHERE content_hash = ?1 AND url != ?2
             ORDER BY id ASC LIMIT 1",
            CONTENT_COLUMNS
        );
        let record = self
            .conn
            .query_row(&sql, params![content_hash, url], content_from_row)
            .optional()?;
        Ok(record)
    }

    fn slug_exists(&self, slug: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM content_records WHERE slug = ?1",
                params![slug],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn upsert_content(
        &mut self,
        draft: &ContentDraft,
        now: DateTime<Utc>,
    ) -> StorageResult<UpsertOutcome> {
        let now = db_timestamp(now);
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM content_records WHERE url = ?1",
                params![draft.url],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                self.conn
                    .execute(
                        "UPDATE content_records SET title = ?1, body = ?2, category = ?3,
                         platform = ?4, content_type = ?5, source = ?6, author = ?7, votes = ?8,
                         is_verified = ?9, language = ?10, content_hash = ?11, duplicate_of = ?12,
                         original_posts = ?13, replies = ?14, strategy = ?15, last_updated = ?16
                         WHERE id = ?17",
                        params![
                            draft.title,
                            draft.body,
                            draft.category,
                            draft.platform,
                            draft.content_type.as_str(),
                            draft.source,
                            draft.author,
                            draft.votes,
                            draft.is_verified,
                            draft.language,
                            draft.content_hash,
                            draft.duplicate_of,
                            draft.original_posts,
                            draft.replies,
                            draft.strategy,
                            now,
                            id
                        ],
                    )
                    .map_err(map_constraint)?;
                Ok(UpsertOutcome::Updated { id })
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO content_records
                         (url, title, body, category, platform, content_type, source, author,
                          votes, is_verified, language, content_hash, slug, duplicate_of,
                          original_posts, replies, strategy, created_at, last_updated)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                                 ?15, ?16, ?17, ?18, ?18)",
                        params![
                            draft.url,
                            draft.title,
                            draft.body,
                            draft.category,
                            draft.platform,
                            draft.content_type.as_str(),
                            draft.source,
                            draft.author,
                            draft.votes,
                            draft.is_verified,
                            draft.language,
                            draft.content_hash,
                            draft.slug,
                            draft.duplicate_of,
                            draft.original_posts,
                            draft.replies,
                            draft.strategy,
                            now
                        ],
                    )
                    .map_err(map_constraint)?;
                Ok(UpsertOutcome::Inserted {
                    id: self.conn.last_insert_rowid(),
                })
            }
        }
    }

    fn replace_chunks(&mut self, content_id: i64, chunks: &[String]) -> StorageResult<Vec<i64>> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM content_chunks WHERE content_id = ?1",
            params![content_id],
        )?;

        let mut ids = Vec::with_capacity(chunks.len());
        for (position, text) in chunks.iter().enumerate() {
            tx.execute(
                "INSERT INTO content_chunks (content_id, position, text) VALUES (?1, ?2, ?3)",
                params![content_id, position as u32, text],
            )?;
            ids.push(tx.last_insert_rowid());
        }

        tx.commit()?;
        Ok(ids)
    }

    fn set_chunk_embedding(&mut self, chunk_id: i64, embedding: &[f32]) -> StorageResult<()> {
        let encoded = serde_json::to_string(embedding)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn.execute(
            "UPDATE content_chunks SET embedding = ?1 WHERE id = ?2",
            params![encoded, chunk_id],
        )?;
        Ok(())
    }

    fn get_chunks(&self, content_id: i64) -> StorageResult<Vec<ChunkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content_id, position, text, embedding FROM content_chunks
             WHERE content_id = ?1 ORDER BY position ASC",
        )?;

        let chunks = stmt
            .query_map(params![content_id], |row| {
                let embedding: Option<String> = row.get(4)?;
                Ok(ChunkRecord {
                    id: row.get(0)?,
                    content_id: row.get(1)?,
                    position: row.get(2)?,
                    text: row.get(3)?,
                    embedding: embedding.and_then(|e| serde_json::from_str(&e).ok()),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(chunks)
    }

    // ===== Statistics =====

    fn count_content(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM content_records")
    }

    fn count_duplicates(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM content_records WHERE duplicate_of IS NOT NULL")
    }

    fn count_verified(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM content_records WHERE is_verified = 1")
    }

    fn content_per_platform(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT platform, COUNT(*) FROM content_records GROUP BY platform ORDER BY platform",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn new_target(url: &str, priority: i64, first_seen: DateTime<Utc>) -> NewTarget {
        NewTarget {
            url: url.to_string(),
            platform: "forum".to_string(),
            target_type: "thread".to_string(),
            priority,
            first_seen,
            metadata: None,
        }
    }

    fn draft(url: &str, slug: &str, hash: &str) -> ContentDraft {
        ContentDraft {
            url: url.to_string(),
            title: "Late check-in with lockbox".to_string(),
            body: "Guests arriving after midnight can use the lockbox by the door.".to_string(),
            category: Some("hosting".to_string()),
            platform: "forum".to_string(),
            content_type: ContentType::Community,
            source: "Forum".to_string(),
            author: Some("host42".to_string()),
            votes: Some(3),
            is_verified: false,
            language: "en".to_string(),
            content_hash: hash.to_string(),
            slug: slug.to_string(),
            duplicate_of: None,
            original_posts: 1,
            replies: 2,
            strategy: Some("primary-selectors".to_string()),
        }
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let target = new_target("https://forum.example.com/t/a/1", 5, t0());

        assert!(storage.enqueue_target(&target).unwrap());
        assert!(!storage.enqueue_target(&target).unwrap());
        assert!(storage.target_exists(&target.url).unwrap());

        let stored = storage.get_target(&target.url).unwrap().unwrap();
        assert_eq!(stored.status, TargetStatus::Pending);
        assert_eq!(stored.retry_count, 0);
    }

    #[test]
    fn test_metadata_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut target = new_target("https://forum.example.com/t/a/1", 5, t0());
        target.metadata = Some(serde_json::json!({"listing": "https://forum.example.com/latest"}));
        storage.enqueue_target(&target).unwrap();

        let stored = storage.get_target(&target.url).unwrap().unwrap();
        assert_eq!(
            stored.metadata.unwrap()["listing"],
            "https://forum.example.com/latest"
        );
    }

    #[test]
    fn test_eligible_ordering() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .enqueue_target(&new_target("https://f.example/t/a/1", 1, t0()))
            .unwrap();
        storage
            .enqueue_target(&new_target("https://f.example/t/b/2", 9, t0() + Duration::seconds(5)))
            .unwrap();
        storage
            .enqueue_target(&new_target("https://f.example/t/c/3", 9, t0()))
            .unwrap();

        let batch = storage.eligible_targets(10, 3, t0() + Duration::hours(1)).unwrap();
        let urls: Vec<&str> = batch.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://f.example/t/c/3",
                "https://f.example/t/b/2",
                "https://f.example/t/a/1"
            ]
        );
    }

    #[test]
    fn test_eligible_respects_limit() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        for i in 0..5 {
            storage
                .enqueue_target(&new_target(&format!("https://f.example/t/x/{}", i), 0, t0()))
                .unwrap();
        }
        assert_eq!(storage.eligible_targets(2, 3, t0()).unwrap().len(), 2);
    }

    #[test]
    fn test_failed_target_eligibility() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url = "https://f.example/t/a/1";
        storage.enqueue_target(&new_target(url, 0, t0())).unwrap();
        storage.mark_processing(url, t0()).unwrap();
        storage
            .mark_failed(url, "timed_out", 1, Some(t0() + Duration::seconds(30)), false, t0())
            .unwrap();

        // Not before next_attempt_at
        assert!(storage.eligible_targets(10, 3, t0()).unwrap().is_empty());
        assert_eq!(
            storage
                .eligible_targets(10, 3, t0() + Duration::seconds(30))
                .unwrap()
                .len(),
            1
        );

        // Never once the ceiling is reached
        storage.mark_processing(url, t0()).unwrap();
        storage.mark_failed(url, "timed_out", 3, None, false, t0()).unwrap();
        assert!(storage
            .eligible_targets(10, 3, t0() + Duration::days(1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_permanent_failure_never_eligible() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url = "https://f.example/t/a/1";
        storage.enqueue_target(&new_target(url, 0, t0())).unwrap();
        storage.mark_processing(url, t0()).unwrap();
        storage.mark_failed(url, "not_found", 1, None, true, t0()).unwrap();

        let target = storage.get_target(url).unwrap().unwrap();
        assert_eq!(target.retry_count, 1);
        assert!(target.permanent);
        assert!(storage
            .eligible_targets(10, 3, t0() + Duration::days(1))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url = "https://f.example/t/a/1";
        storage.enqueue_target(&new_target(url, 0, t0())).unwrap();

        let result = storage.mark_completed(url, t0());
        assert!(matches!(
            result,
            Err(StorageError::InvalidTransition {
                from: TargetStatus::Pending,
                to: TargetStatus::Completed
            })
        ));
    }

    #[test]
    fn test_transition_on_missing_target() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.mark_processing("https://f.example/none", t0()),
            Err(StorageError::TargetNotFound(_))
        ));
    }

    #[test]
    fn test_recover_processing() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url = "https://f.example/t/a/1";
        storage.enqueue_target(&new_target(url, 0, t0())).unwrap();
        storage.mark_processing(url, t0()).unwrap();

        assert_eq!(storage.recover_processing().unwrap(), 1);
        assert_eq!(
            storage.get_target(url).unwrap().unwrap().status,
            TargetStatus::Pending
        );
        assert_eq!(storage.recover_processing().unwrap(), 0);
    }

    #[test]
    fn test_cleanup_targets() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let done = "https://f.example/t/a/1";
        let old_fail = "https://f.example/t/b/2";
        let new_fail = "https://f.example/t/c/3";
        let pending = "https://f.example/t/d/4";
        for url in [done, old_fail, new_fail, pending] {
            storage.enqueue_target(&new_target(url, 0, t0())).unwrap();
        }

        storage.mark_processing(done, t0()).unwrap();
        storage.mark_completed(done, t0()).unwrap();
        storage.mark_processing(old_fail, t0()).unwrap();
        storage.mark_failed(old_fail, "blocked", 1, None, true, t0()).unwrap();
        let later = t0() + Duration::days(10);
        storage.mark_processing(new_fail, later).unwrap();
        storage.mark_failed(new_fail, "blocked", 1, None, true, later).unwrap();

        let counts = storage.cleanup_targets(later - Duration::days(7)).unwrap();
        assert_eq!(counts, CleanupCounts { completed: 1, failed: 1 });
        assert!(!storage.target_exists(done).unwrap());
        assert!(!storage.target_exists(old_fail).unwrap());
        assert!(storage.target_exists(new_fail).unwrap());
        assert!(storage.target_exists(pending).unwrap());
    }

    #[test]
    fn test_upsert_insert_then_update_keeps_slug() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let url = "https://f.example/t/a/1";

        let first = storage.upsert_content(&draft(url, "late-check-in", "h1"), t0()).unwrap();
        assert!(matches!(first, UpsertOutcome::Inserted { .. }));

        let later = t0() + Duration::hours(2);
        let second = storage
            .upsert_content(&draft(url, "other-slug", "h1"), later)
            .unwrap();
        assert_eq!(second, UpsertOutcome::Updated { id: first.id() });

        let record = storage.get_content_by_url(url).unwrap().unwrap();
        assert_eq!(record.slug, "late-check-in");
        assert_eq!(record.created_at, db_timestamp(t0()));
        assert_eq!(record.last_updated, db_timestamp(later));
        assert_eq!(storage.count_content().unwrap(), 1);
    }

    #[test]
    fn test_slug_collision_is_constraint_violation() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .upsert_content(&draft("https://f.example/t/a/1", "same", "h1"), t0())
            .unwrap();
        let result = storage.upsert_content(&draft("https://f.example/t/b/2", "same", "h2"), t0());
        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
        assert!(storage.slug_exists("same").unwrap());
    }

    #[test]
    fn test_find_by_hash_excluding_self() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .upsert_content(&draft("https://f.example/t/a/1", "a", "same-hash"), t0())
            .unwrap();

        assert!(storage
            .find_by_hash_excluding("same-hash", "https://f.example/t/a/1")
            .unwrap()
            .is_none());
        let found = storage
            .find_by_hash_excluding("same-hash", "https://f.example/t/b/2")
            .unwrap()
            .unwrap();
        assert_eq!(found.url, "https://f.example/t/a/1");
    }

    #[test]
    fn test_chunks_replace_and_embed() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .upsert_content(&draft("https://f.example/t/a/1", "a", "h"), t0())
            .unwrap()
            .id();

        let ids = storage
            .replace_chunks(id, &["one".to_string(), "two".to_string()])
            .unwrap();
        assert_eq!(ids.len(), 2);
        storage.set_chunk_embedding(ids[0], &[0.5, -1.0]).unwrap();

        let chunks = storage.get_chunks(id).unwrap();
        assert_eq!(chunks[0].embedding, Some(vec![0.5, -1.0]));
        assert_eq!(chunks[1].embedding, None);

        storage.replace_chunks(id, &["only".to_string()]).unwrap();
        let chunks = storage.get_chunks(id).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "only");
    }

    #[test]
    fn test_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut verified = draft("https://f.example/t/a/1", "a", "h1");
        verified.is_verified = true;
        storage.upsert_content(&verified, t0()).unwrap();

        let mut dup = draft("https://f.example/t/b/2", "b", "h1");
        dup.duplicate_of = Some("https://f.example/t/a/1".to_string());
        dup.platform = "help".to_string();
        storage.upsert_content(&dup, t0()).unwrap();

        assert_eq!(storage.count_content().unwrap(), 2);
        assert_eq!(storage.count_duplicates().unwrap(), 1);
        assert_eq!(storage.count_verified().unwrap(), 1);
        assert_eq!(
            storage.content_per_platform().unwrap(),
            vec![("forum".to_string(), 1), ("help".to_string(), 1)]
        );
    }
}
