//! Source tracker error types.

use thiserror::Error;

/// Errors that can occur while reading from Bitbucket.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Credentials rejected. Fatal: the run can't continue.
    #[error("Bitbucket rejected the credentials for '{repo}'")]
    Auth { repo: String },

    /// The repository (or its issue tracker) doesn't exist. Fatal.
    #[error("Bitbucket repository '{repo}' not found (or its issue tracker is disabled)")]
    RepoNotFound { repo: String },

    /// Transport-level failure from the HTTP client.
    #[error("Bitbucket request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A retryable response status (5xx or 429).
    #[error("Bitbucket returned status {status} for '{url}'")]
    Status { url: String, status: u16 },

    /// A transient failure that survived the whole retry budget.
    #[error("Bitbucket request to '{url}' failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    /// A response status the client has no handling for. Fatal.
    #[error("Unexpected Bitbucket response status {status} from '{url}'")]
    UnexpectedStatus { url: String, status: u16 },
}

impl SourceError {
    /// Whether this error must abort the whole run rather than fail a
    /// single issue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. } | Self::RepoNotFound { .. } | Self::UnexpectedStatus { .. }
        )
    }
}
