//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the QA-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawl queue
CREATE TABLE IF NOT EXISTS crawl_targets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    platform TEXT NOT NULL,
    target_type TEXT NOT NULL DEFAULT 'thread',
    priority INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0,
    first_seen TEXT NOT NULL,
    last_checked TEXT,
    error TEXT,
    metadata TEXT,
    next_attempt_at TEXT,
    permanent INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_targets_status ON crawl_targets(status);
CREATE INDEX IF NOT EXISTS idx_targets_order ON crawl_targets(priority DESC, first_seen ASC);

-- Extracted Q&A content
CREATE TABLE IF NOT EXISTS content_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    category TEXT,
    platform TEXT NOT NULL,
    content_type TEXT NOT NULL,
    source TEXT NOT NULL,
    author TEXT,
    votes INTEGER,
    is_verified INTEGER NOT NULL DEFAULT 0,
    language TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    duplicate_of TEXT,
    original_posts INTEGER NOT NULL DEFAULT 0,
    replies INTEGER NOT NULL DEFAULT 0,
    strategy TEXT,
    created_at TEXT NOT NULL,
    last_updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_content_hash ON content_records(content_hash);
CREATE INDEX IF NOT EXISTS idx_content_platform ON content_records(platform);

-- Paragraph chunks handed to the embedding service
CREATE TABLE IF NOT EXISTS content_chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_id INTEGER NOT NULL REFERENCES content_records(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    embedding TEXT,
    UNIQUE(content_id, position)
);

CREATE INDEX IF NOT EXISTS idx_chunks_content ON content_chunks(content_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
