//! Output module for run reports and statistics
//!
//! This module handles:
//! - Loading queue and content statistics from storage
//! - Printing statistics and run reports

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::crawler::{DirectReport, RunReport};

/// Prints a full run report to stdout
pub fn print_run_report(report: &RunReport) {
    println!("=== Run Report ===\n");
    println!("Recovered interrupted targets: {}", report.recovered);
    println!();

    let d = &report.discovery;
    println!("Discovery:");
    println!("  Listings fetched: {} ({} failed)", d.listings_fetched, d.listings_failed);
    println!("  Thread links seen: {}", d.links_seen);
    println!("  Newly enqueued: {}", d.enqueued);
    println!("  Already known: {}", d.already_known);
    println!();

    let b = &report.batch;
    println!("Processing:");
    println!("  Attempted: {}", b.attempted);
    println!("  Completed: {}", b.completed);
    println!("  Failed: {} ({} will retry)", b.failed, b.will_retry);
    println!();

    println!("Cleanup:");
    println!("  Completed targets removed: {}", report.cleanup.completed);
    println!("  Expired failed targets removed: {}", report.cleanup.failed);
}

/// Prints a direct-mode report to stdout
pub fn print_direct_report(report: &DirectReport) {
    println!("=== Direct Run ===\n");
    println!("  Attempted: {}", report.attempted);
    println!("  Stored: {}", report.stored);
    println!("  Failed: {}", report.failed);
}
