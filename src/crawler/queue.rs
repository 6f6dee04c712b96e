//! Crawl queue phases
//!
//! This module drives the persistent target queue:
//! - Recovery of targets stranded in `processing` by an interrupted run
//! - Discovery: mining listing pages for thread links
//! - Processing: dequeue in priority/age order, run the pipeline, record outcome
//! - Cleanup: deleting completed and expired failed targets
//! - Direct mode: a fixed URL list with no queue bookkeeping
//!
//! A single URL's failure never aborts a phase; only storage failures do.

use super::coordinator::{Coordinator, FetchMode};
use crate::crawler::parser::parse_html;
use crate::storage::{CleanupCounts, CrawlTarget, NewTarget, Storage};
use crate::{HarvestError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use url::Url;

/// Outcome of a discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub listings_fetched: u32,
    pub listings_failed: u32,
    pub links_seen: u32,
    pub enqueued: u32,
    pub already_known: u32,
}

/// Outcome of a processing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub attempted: u32,
    pub completed: u32,
    pub failed: u32,

    /// Failures that remain eligible for another attempt
    pub will_retry: u32,
}

/// Outcome of a direct-mode run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectReport {
    pub attempted: u32,
    pub stored: u32,
    pub failed: u32,
}

/// Everything a full run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub recovered: u64,
    pub discovery: DiscoveryReport,
    pub batch: BatchReport,
    pub cleanup: CleanupCounts,
}

impl<S: Storage> Coordinator<S> {
    /// Full run: recover, discover, process one batch, clean up
    pub async fn run(&mut self) -> Result<RunReport> {
        let recovered = self.recover_interrupted()?;
        let discovery = self.discover().await?;
        let batch = self.process_batch().await?;
        let cleanup = self.cleanup(Utc::now())?;

        let report = RunReport {
            recovered,
            discovery,
            batch,
            cleanup,
        };
        tracing::info!("Run complete: {:?}", report);
        Ok(report)
    }

    /// Resets targets left in `processing` by a killed run
    pub fn recover_interrupted(&mut self) -> Result<u64> {
        let recovered = self.storage.recover_processing()?;
        if recovered > 0 {
            tracing::warn!(
                "Recovered {} targets left in processing by an interrupted run",
                recovered
            );
        }
        Ok(recovered)
    }

    /// Mines every platform's listing pages for new thread links
    pub async fn discover(&mut self) -> Result<DiscoveryReport> {
        let mut report = DiscoveryReport::default();

        let listings: Vec<(String, String)> = self
            .registry
            .iter()
            .flat_map(|p| {
                p.config
                    .listing_urls
                    .iter()
                    .map(move |url| (p.name().to_string(), url.clone()))
            })
            .collect();

        for (platform_name, listing_url) in listings {
            match self.discover_from(&platform_name, &listing_url, &mut report).await {
                Ok(enqueued) => {
                    report.listings_fetched += 1;
                    tracing::info!("Listing {} yielded {} new targets", listing_url, enqueued);
                }
                Err(HarvestError::Storage(e)) => return Err(e.into()),
                Err(e) => {
                    report.listings_failed += 1;
                    tracing::warn!("Failed to mine listing {}: {}", listing_url, e);
                }
            }
        }

        tracing::info!(
            "Discovery: {} listings, {} links, {} enqueued, {} already known",
            report.listings_fetched,
            report.links_seen,
            report.enqueued,
            report.already_known
        );
        Ok(report)
    }

    /// Fetches one listing page and enqueues its unseen thread links
    ///
    /// # Returns
    ///
    /// The number of newly enqueued targets
    pub async fn discover_from(
        &mut self,
        platform_name: &str,
        listing_url: &str,
        report: &mut DiscoveryReport,
    ) -> Result<u32> {
        let platform =
            self.registry
                .by_name(platform_name)
                .ok_or_else(|| HarvestError::UnsupportedUrl {
                    url: listing_url.to_string(),
                })?;

        let document = self
            .polite_fetch(listing_url, &platform, FetchMode::Html)
            .await?;
        let base = Url::parse(&document.final_url)?;
        let parsed = parse_html(&document.body, &base);

        let now = Utc::now();
        let mut enqueued = 0;
        for link in parsed.links {
            let Ok(resolved) = self.resolve_content(&link) else {
                continue;
            };
            if resolved.name() != platform.name() {
                continue;
            }
            report.links_seen += 1;

            if self.storage.target_exists(&link)? || self.storage.content_url_exists(&link)? {
                report.already_known += 1;
                continue;
            }

            let target = NewTarget {
                url: link.clone(),
                platform: platform.name().to_string(),
                target_type: platform.config.target_type.clone(),
                priority: platform.config.priority,
                first_seen: now,
                metadata: Some(serde_json::json!({ "discovered_from": listing_url })),
            };
            if self.storage.enqueue_target(&target)? {
                tracing::debug!("Enqueued {}", link);
                enqueued += 1;
            }
        }

        report.enqueued += enqueued;
        Ok(enqueued)
    }

    /// Seeds the queue with explicit URLs
    ///
    /// Unsupported URLs and listing pages are skipped. Returns the number of
    /// new targets.
    pub fn enqueue_urls(&mut self, urls: &[String]) -> Result<u32> {
        let now = Utc::now();
        let mut enqueued = 0;

        for url in urls {
            let normalized = match crate::url::normalize_url(url) {
                Ok(u) => u.to_string(),
                Err(e) => {
                    tracing::warn!("Skipping seed {}: {}", url, e);
                    continue;
                }
            };
            let platform = match self.resolve_content(&normalized) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("Skipping seed {}: {}", url, e);
                    continue;
                }
            };

            let target = NewTarget {
                url: normalized,
                platform: platform.name().to_string(),
                target_type: platform.config.target_type.clone(),
                priority: platform.config.priority,
                first_seen: now,
                metadata: Some(serde_json::json!({ "seeded": true })),
            };
            if self.storage.enqueue_target(&target)? {
                enqueued += 1;
            }
        }

        Ok(enqueued)
    }

    /// Processes up to `batch-size` eligible targets
    pub async fn process_batch(&mut self) -> Result<BatchReport> {
        let crawler = &self.config.crawler;
        let (batch_size, max_retries) = (crawler.batch_size, crawler.max_retries);

        let targets = self
            .storage
            .eligible_targets(batch_size, max_retries, Utc::now())?;
        tracing::info!("Processing {} targets", targets.len());

        let mut report = BatchReport::default();
        for target in targets {
            report.attempted += 1;
            self.storage.mark_processing(&target.url, Utc::now())?;

            match self.process_url(&target.url).await {
                Ok(_) => {
                    self.storage.mark_completed(&target.url, Utc::now())?;
                    report.completed += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    if self.record_failure(&target, &e, max_retries, Utc::now())? {
                        report.will_retry += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Batch done: {} attempted, {} completed, {} failed ({} will retry)",
            report.attempted,
            report.completed,
            report.failed,
            report.will_retry
        );
        Ok(report)
    }

    /// Marks a target failed and schedules its next attempt
    ///
    /// Every failure adds one to the retry count. Retryable errors also set a
    /// backoff delay; permanent errors flag the target so it is never
    /// dequeued again. Returns true if the target stays eligible.
    fn record_failure(
        &mut self,
        target: &CrawlTarget,
        error: &HarvestError,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let retry_count = target.retry_count.saturating_add(1);
        let permanent = !error.is_retryable();
        let will_retry = !permanent && retry_count < max_retries;

        let next_attempt_at = if will_retry {
            let delay = self.backoff.delay_for(retry_count);
            ChronoDuration::from_std(delay)
                .ok()
                .map(|delay| now + delay)
        } else {
            None
        };

        tracing::warn!(
            "Failed {} ({}, attempt {}): {}",
            target.url,
            error.kind(),
            retry_count,
            error
        );

        let message = format!("{}: {}", error.kind(), error);
        self.storage
            .mark_failed(
                &target.url,
                &message,
                retry_count,
                next_attempt_at,
                permanent,
                now,
            )?;
        Ok(will_retry)
    }

    /// Deletes completed targets and failed targets past the retention window
    pub fn cleanup(&mut self, now: DateTime<Utc>) -> Result<CleanupCounts> {
        let retention = ChronoDuration::days(i64::from(self.config.crawler.retention_days));
        let counts = self.storage.cleanup_targets(now - retention)?;
        tracing::info!(
            "Cleanup removed {} completed and {} expired failed targets",
            counts.completed,
            counts.failed
        );
        Ok(counts)
    }

    /// Scrapes a fixed URL list without queue bookkeeping
    ///
    /// No retry tracking: each URL is attempted once and failures are only
    /// logged.
    pub async fn run_direct(&mut self, urls: &[String]) -> Result<DirectReport> {
        let mut report = DirectReport::default();

        for url in urls {
            report.attempted += 1;
            match self.process_url(url).await {
                Ok(_) => report.stored += 1,
                Err(HarvestError::Storage(e)) => return Err(e.into()),
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("Direct scrape of {} failed: {}", url, e);
                }
            }
        }

        tracing::info!(
            "Direct run: {} attempted, {} stored, {} failed",
            report.attempted,
            report.stored,
            report.failed
        );
        Ok(report)
    }
}
