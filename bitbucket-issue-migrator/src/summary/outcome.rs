//! Per-issue outcome types.

/// What happened to one source issue.
#[derive(Debug, Clone)]
pub enum IssueOutcome {
    /// Imported on the destination.
    Submitted {
        /// Source tracker id.
        source_id: u64,
        /// Destination issue number, when the import job reported one.
        destination_number: Option<u64>,
    },

    /// Never submitted.
    Skipped {
        /// Source tracker id.
        source_id: u64,
        /// Reason for skipping.
        reason: String,
    },

    /// Submission failed; the run continued with the next issue.
    Failed {
        /// Source tracker id.
        source_id: u64,
        /// Human-readable cause.
        error: String,
    },
}

impl IssueOutcome {
    /// The source issue id this outcome belongs to.
    pub fn source_id(&self) -> u64 {
        match self {
            Self::Submitted { source_id, .. }
            | Self::Skipped { source_id, .. }
            | Self::Failed { source_id, .. } => *source_id,
        }
    }
}
