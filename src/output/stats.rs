//! Statistics from the harvest database
//!
//! This module provides functionality for extracting and displaying queue
//! and content statistics from the storage layer.

use crate::state::TargetStatus;
use crate::storage::Storage;
use crate::HarvestError;
use std::collections::HashMap;

/// Queue and content statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Count of crawl targets by status
    pub targets_by_status: HashMap<TargetStatus, u64>,

    /// Total number of content records
    pub total_content: u64,

    /// Records flagged as duplicates of another URL
    pub duplicates: u64,

    /// Records whose votes exceed the verification threshold
    pub verified: u64,

    /// Content records per platform, sorted by platform name
    pub content_per_platform: Vec<(String, u64)>,
}

impl HarvestStatistics {
    pub fn total_targets(&self) -> u64 {
        self.targets_by_status.values().sum()
    }

    pub fn targets_in(&self, status: TargetStatus) -> u64 {
        self.targets_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics<S: Storage + ?Sized>(storage: &S) -> Result<HarvestStatistics, HarvestError> {
    let mut targets_by_status = HashMap::new();
    for status in TargetStatus::all() {
        let count = storage.count_targets_by_status(status)?;
        if count > 0 {
            targets_by_status.insert(status, count);
        }
    }

    Ok(HarvestStatistics {
        targets_by_status,
        total_content: storage.count_content()?,
        duplicates: storage.count_duplicates()?,
        verified: storage.count_verified()?,
        content_per_platform: storage.content_per_platform()?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    let total_targets = stats.total_targets();
    println!("Crawl Queue ({} targets):", total_targets);
    for status in TargetStatus::all() {
        let count = stats.targets_in(status);
        let percentage = if total_targets > 0 {
            (count as f64 / total_targets as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!("Content:");
    println!("  Total records: {}", stats.total_content);
    println!("  Duplicates: {}", stats.duplicates);
    println!("  Verified: {}", stats.verified);
    println!();

    if !stats.content_per_platform.is_empty() {
        println!("Records by Platform:");
        for (platform, count) in &stats.content_per_platform {
            println!("  {}: {}", platform, count);
        }
        println!();
    }
}
