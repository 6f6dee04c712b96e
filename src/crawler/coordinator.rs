//! Crawl coordinator - per-URL pipeline orchestration
//!
//! The coordinator owns everything a run needs:
//! - The platform registry and HTTP client
//! - Per-platform politeness state
//! - The extraction engine, quality gate and content writer
//! - The storage backend, for the duration of the run
//!
//! `process_url` drives one URL through resolve → filter → politeness →
//! fetch → extract → gate → persist. Queue bookkeeping lives in `queue.rs`.

use crate::config::Config;
use crate::crawler::backoff::BackoffPolicy;
use crate::crawler::fetcher::{
    build_http_client, fetch_html, fetch_json, preflight, DocumentKind, FetchError,
    FetchedDocument,
};
use crate::crawler::politeness::PolitenessController;
use crate::extract::{ExtractedCandidate, ExtractionEngine};
use crate::persist::{ContentWriter, PersistOutcome};
use crate::platform::{Platform, PlatformRegistry};
use crate::quality::QualityGate;
use crate::storage::Storage;
use crate::{HarvestError, Result};
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Which representation of a page to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchMode {
    Html,
    Json,
}

/// A URL that made it all the way into storage
#[derive(Debug, Clone)]
pub struct ProcessedUrl {
    pub url: String,
    pub platform: String,
    pub strategy: &'static str,
    pub chars: usize,
    pub persisted: PersistOutcome,
}

/// Main crawler coordinator structure
pub struct Coordinator<S: Storage> {
    pub(crate) config: Arc<Config>,
    pub(crate) registry: PlatformRegistry,
    pub(crate) client: Client,
    pub(crate) politeness: PolitenessController,
    pub(crate) backoff: BackoffPolicy,
    engine: ExtractionEngine,
    gate: QualityGate,
    writer: ContentWriter,
    pub(crate) storage: S,
}

impl<S: Storage> Coordinator<S> {
    /// Creates a coordinator over an opened storage backend
    ///
    /// # Errors
    ///
    /// Fails when no platform is configured or the HTTP client cannot be built.
    pub fn new(config: Config, storage: S) -> Result<Self> {
        let registry = PlatformRegistry::new(&config.platforms)?;
        let client = build_http_client(&config.crawler)?;
        let backoff = BackoffPolicy::from_config(&config.backoff);
        let politeness = PolitenessController::from_config(&config.crawler, backoff);
        let engine = ExtractionEngine::new(&registry, config.quality.min_body_chars);
        let gate = QualityGate::from_config(&config.quality);
        let writer = ContentWriter::new(&config.quality);

        tracing::info!("Coordinator ready with {} platforms", registry.len());

        Ok(Self {
            config: Arc::new(config),
            registry,
            client,
            politeness,
            backoff,
            engine,
            gate,
            writer,
            storage,
        })
    }

    /// Replaces the content writer (embedder, language detector)
    pub fn with_writer(mut self, writer: ContentWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Replaces the extraction engine (custom strategy tables)
    pub fn with_engine(mut self, engine: ExtractionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn politeness(&self) -> &PolitenessController {
        &self.politeness
    }

    /// Resolves a URL to its platform, rejecting listing pages
    ///
    /// Runs before enqueue and again before every fetch, since the
    /// configuration may change between discovery and processing.
    pub fn resolve_content(&self, url: &str) -> Result<Arc<Platform>> {
        let parsed = Url::parse(url)?;
        let platform = self
            .registry
            .resolve_url(&parsed)
            .ok_or_else(|| HarvestError::UnsupportedUrl {
                url: url.to_string(),
            })?;

        if !platform.is_content_url(&parsed) {
            return Err(HarvestError::ListingPage {
                url: url.to_string(),
            });
        }

        Ok(platform)
    }

    /// Runs one URL through the whole pipeline
    pub async fn process_url(&mut self, url: &str) -> Result<ProcessedUrl> {
        let platform = self.resolve_content(url)?;

        let document = self.fetch_document(url, &platform).await?;
        let candidate = self.extract_preferring_json(url, &platform, document).await?;

        if let Err(reason) = self.gate.validate(&candidate) {
            tracing::info!("Rejected {}: {}", url, reason);
            return Err(HarvestError::ValidationFailed {
                url: url.to_string(),
                reason,
            });
        }

        let persisted = self
            .writer
            .persist(&mut self.storage, &candidate, Utc::now())
            .await?;

        tracing::info!(
            "Stored {} ({} chars via {}, {})",
            url,
            candidate.char_count,
            candidate.strategy,
            if persisted.inserted { "new" } else { "updated" }
        );

        Ok(ProcessedUrl {
            url: url.to_string(),
            platform: platform.name().to_string(),
            strategy: candidate.strategy,
            chars: candidate.char_count,
            persisted,
        })
    }

    /// Fetches the JSON representation when the platform offers one, else HTML
    ///
    /// A failed JSON request falls back to HTML, except on 429: the platform
    /// is cooling down and the attempt is abandoned.
    async fn fetch_document(
        &mut self,
        url: &str,
        platform: &Platform,
    ) -> Result<FetchedDocument> {
        if platform.config.api.is_some() {
            match self.polite_fetch(url, platform, FetchMode::Json).await {
                Ok(document) => return Ok(document),
                Err(e) if e.is_rate_limited() => return Err(e.into()),
                Err(e) => {
                    tracing::debug!("JSON API failed for {} ({}), falling back to HTML", url, e);
                }
            }
        }

        Ok(self.polite_fetch(url, platform, FetchMode::Html).await?)
    }

    /// Extracts from the fetched document; a JSON document that yields
    /// nothing usable is retried once as HTML
    async fn extract_preferring_json(
        &mut self,
        url: &str,
        platform: &Platform,
        document: FetchedDocument,
    ) -> Result<ExtractedCandidate> {
        let is_json = document.kind == DocumentKind::Json;

        match self.engine.extract(&document, platform) {
            Err(HarvestError::ParseFailed { .. }) if is_json => {
                tracing::debug!("JSON payload of {} unusable, fetching HTML", url);
                let html = self.polite_fetch(url, platform, FetchMode::Html).await?;
                self.engine.extract(&html, platform)
            }
            result => result,
        }
    }

    /// Waits for the platform's turn, fetches, and feeds the outcome back
    /// into the politeness controller
    ///
    /// With pre-flight enabled an HTML fetch is two requests, HEAD then GET,
    /// and each waits for its own turn.
    pub(crate) async fn polite_fetch(
        &mut self,
        url: &str,
        platform: &Platform,
        mode: FetchMode,
    ) -> std::result::Result<FetchedDocument, FetchError> {
        let name = platform.name();
        let budget = &platform.config.politeness;

        let result = match (mode, platform.config.api.as_ref()) {
            (FetchMode::Json, Some(api)) => {
                self.politeness.wait_turn(name, budget).await;
                let api_url = api.api_url(url);
                fetch_json(&self.client, &api_url, &platform.config)
                    .await
                    .map(|mut document| {
                        // Records are keyed by the thread URL, not the API URL
                        document.requested_url = url.to_string();
                        document
                    })
            }
            _ => {
                if self.config.crawler.preflight {
                    self.politeness.wait_turn(name, budget).await;
                    let checked = preflight(&self.client, url, &platform.config).await;
                    if let Err(e) = checked {
                        self.record_outcome(name, Err(&e));
                        return Err(e);
                    }
                }

                self.politeness.wait_turn(name, budget).await;
                fetch_html(&self.client, url, &platform.config).await
            }
        };

        self.record_outcome(name, result.as_ref().map(|_| ()));
        result
    }

    fn record_outcome(&mut self, platform: &str, outcome: std::result::Result<(), &FetchError>) {
        match outcome {
            Ok(()) => self.politeness.record_success(platform),
            Err(e) if e.is_rate_limited() => self.politeness.record_rate_limited(platform),
            Err(e) if e.is_retryable() => self.politeness.record_error(platform),
            Err(_) => {}
        }
    }
}
