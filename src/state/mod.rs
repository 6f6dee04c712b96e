//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TargetStatus`: lifecycle of a queued crawl target
//! - `PlatformThrottle`: per-platform politeness bookkeeping for one run

mod platform_state;
mod target_status;

pub use platform_state::PlatformThrottle;
pub use target_status::TargetStatus;
