//! Dedup and persistence
//!
//! The `ContentWriter` is the only component that writes content records:
//! - Normalized content hashing and duplicate flagging (never dropping)
//! - Upsert by URL, so re-crawls update in place
//! - Slug allocation with bounded collision probing
//! - Paragraph chunking and best-effort embeddings

mod text;

pub use text::{chunk_paragraphs, content_hash, random_suffix, slugify};

use crate::config::QualityConfig;
use crate::extract::ExtractedCandidate;
use crate::services::{Embedder, LanguageDetector, NullDetector};
use crate::storage::{ContentDraft, Storage, StorageError, UpsertOutcome};
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Suffixed candidates tried before falling back to a fully random slug
pub const SLUG_SUFFIX_ATTEMPTS: u32 = 5;

/// Upsert attempts when the store reports a uniqueness conflict
pub const CONFLICT_ATTEMPTS: u32 = 3;

const SUFFIX_LEN: usize = 6;
const RANDOM_SLUG_LEN: usize = 12;

/// Language tag for records no detector or platform could label
pub const UNDETERMINED_LANGUAGE: &str = "und";

/// What a write did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub id: i64,
    pub inserted: bool,
    pub slug: String,
    pub duplicate_of: Option<String>,
    pub chunks: usize,
    pub embedded: usize,
}

/// Writes accepted candidates to storage
pub struct ContentWriter {
    verified_vote_threshold: i64,
    min_paragraph_chars: usize,
    max_chunks: usize,
    embedder: Option<Arc<dyn Embedder>>,
    detector: Arc<dyn LanguageDetector>,
}

impl ContentWriter {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            verified_vote_threshold: config.verified_vote_threshold,
            min_paragraph_chars: config.min_paragraph_chars,
            max_chunks: config.max_chunks,
            embedder: None,
            detector: Arc::new(NullDetector),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Persists a candidate that passed the quality gate
    ///
    /// # Errors
    ///
    /// `PersistenceConflict` when every slug attempt collides; other storage
    /// failures propagate unchanged.
    pub async fn persist<S: Storage>(
        &self,
        storage: &mut S,
        candidate: &ExtractedCandidate,
        now: DateTime<Utc>,
    ) -> Result<PersistOutcome> {
        let hash = content_hash(&candidate.body);

        let duplicate_of = storage
            .find_by_hash_excluding(&hash, &candidate.url)?
            .map(|original| original.url);
        if let Some(original) = &duplicate_of {
            tracing::info!("{} duplicates content of {}", candidate.url, original);
        }

        let existing = storage.get_content_by_url(&candidate.url)?;
        let unchanged = existing
            .as_ref()
            .is_some_and(|record| record.content_hash == hash);

        let mut draft = self.draft(candidate, hash, duplicate_of.clone());
        let outcome = self.upsert_with_retry(storage, &mut draft, existing.is_some(), now)?;
        let id = outcome.id();
        let slug = match &existing {
            Some(record) => record.slug.clone(),
            None => draft.slug.clone(),
        };

        let mut persisted = PersistOutcome {
            id,
            inserted: matches!(outcome, UpsertOutcome::Inserted { .. }),
            slug,
            duplicate_of,
            chunks: 0,
            embedded: 0,
        };

        if unchanged && !storage.get_chunks(id)?.is_empty() {
            tracing::debug!("Content of {} unchanged, keeping chunks", candidate.url);
            return Ok(persisted);
        }

        let chunks = chunk_paragraphs(&candidate.body, self.min_paragraph_chars, self.max_chunks);
        let chunk_ids = storage.replace_chunks(id, &chunks)?;
        persisted.chunks = chunk_ids.len();

        if let Some(embedder) = &self.embedder {
            for (chunk_id, text) in chunk_ids.iter().zip(&chunks) {
                match embedder.embed(text).await {
                    Ok(vector) => {
                        storage.set_chunk_embedding(*chunk_id, &vector)?;
                        persisted.embedded += 1;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Embedding failed for chunk {} of {}: {}",
                            chunk_id,
                            candidate.url,
                            e
                        );
                    }
                }
            }
        }

        Ok(persisted)
    }

    fn draft(
        &self,
        candidate: &ExtractedCandidate,
        content_hash: String,
        duplicate_of: Option<String>,
    ) -> ContentDraft {
        ContentDraft {
            url: candidate.url.clone(),
            title: candidate.title.clone(),
            body: candidate.body.clone(),
            category: candidate.category.clone(),
            platform: candidate.platform.clone(),
            content_type: candidate.content_type,
            source: candidate.source.clone(),
            author: candidate.author.clone(),
            votes: candidate.votes,
            is_verified: candidate
                .votes
                .is_some_and(|votes| votes > self.verified_vote_threshold),
            language: self.language_for(candidate),
            content_hash,
            slug: String::new(),
            duplicate_of,
            original_posts: candidate.original_posts,
            replies: candidate.replies,
            strategy: Some(candidate.strategy.to_string()),
        }
    }

    /// Reliable detection, then the platform's declared language
    fn language_for(&self, candidate: &ExtractedCandidate) -> String {
        self.detector
            .detect(&candidate.body)
            .filter(|d| d.reliable)
            .map(|d| d.language)
            .or_else(|| candidate.language.clone())
            .unwrap_or_else(|| UNDETERMINED_LANGUAGE.to_string())
    }

    fn upsert_with_retry<S: Storage>(
        &self,
        storage: &mut S,
        draft: &mut ContentDraft,
        exists: bool,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        for attempt in 1..=CONFLICT_ATTEMPTS {
            if !exists {
                draft.slug = allocate_slug(storage, &draft.title, &draft.platform)?;
            }

            match storage.upsert_content(draft, now) {
                Ok(outcome) => return Ok(outcome),
                Err(StorageError::ConstraintViolation(msg)) => {
                    tracing::debug!(
                        "Upsert conflict for {} (attempt {}): {}",
                        draft.url,
                        attempt,
                        msg
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(HarvestError::PersistenceConflict {
            url: draft.url.clone(),
            attempts: CONFLICT_ATTEMPTS,
        })
    }
}

/// Picks an unused slug for a new record
///
/// Tries the title slug, then up to `SLUG_SUFFIX_ATTEMPTS` suffixed variants,
/// then `{platform}-{random}`.
pub fn allocate_slug<S: Storage>(storage: &S, title: &str, platform: &str) -> Result<String> {
    let base = slugify(title);
    if !storage.slug_exists(&base)? {
        return Ok(base);
    }

    let mut rng = rand::thread_rng();
    for _ in 0..SLUG_SUFFIX_ATTEMPTS {
        let candidate = format!("{}-{}", base, random_suffix(SUFFIX_LEN, &mut rng));
        if !storage.slug_exists(&candidate)? {
            return Ok(candidate);
        }
    }

    Ok(format!(
        "{}-{}",
        slugify(platform),
        random_suffix(RANDOM_SLUG_LEN, &mut rng)
    ))
}
