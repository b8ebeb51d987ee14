//! Submission error types.

use thiserror::Error;

/// Errors that can occur while delivering one issue to the destination.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The destination will never accept this payload unchanged, so it
    /// is not retried.
    #[error("Import payload rejected: {reason}")]
    PayloadRejected { reason: String },

    /// The payload could not be encoded at all.
    #[error("Failed to encode import payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The destination accepted the job and then reported it failed.
    #[error("GitHub reported the import job as failed: {errors}")]
    JobFailed { errors: String },

    /// The job never reached a terminal status within the poll budget.
    #[error("Import job still unfinished after {attempts} polls")]
    PollExhausted { attempts: u32 },

    /// Transient failures outlasted the retry budget.
    #[error("Retries exhausted while {action}: {source}")]
    RetriesExhausted {
        action: &'static str,
        #[source]
        source: octocrab::Error,
    },
}
