/// Crawl target status definitions
///
/// A target moves `pending -> processing -> {completed | failed}`. Failed
/// targets with retries left go back through `processing`; targets stranded in
/// `processing` by a killed run are returned to `pending` on the next start.
use std::fmt;

/// Represents the current state of a crawl target in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetStatus {
    /// Discovered or seeded, waiting to be dequeued
    Pending,

    /// Dequeued by a run and currently being fetched/extracted
    Processing,

    /// Content extracted and persisted
    Completed,

    /// Last attempt failed; may be retried while retries remain
    Failed,
}

impl TargetStatus {
    /// Returns true if no further processing happens from this status alone
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: TargetStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
                | (Self::Processing, Self::Pending)
                | (Self::Failed, Self::Processing)
        )
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all statuses
    pub fn all() -> [Self; 4] {
        [
            Self::Pending,
            Self::Processing,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
