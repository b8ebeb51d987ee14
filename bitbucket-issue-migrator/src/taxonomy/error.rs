//! Taxonomy resolution error types.

use thiserror::Error;

/// Errors that can occur while resolving labels and milestones.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// GitHub API error.
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// The milestone exists on the server but could not be found again
    /// after a create collided with a concurrent writer.
    #[error("Milestone '{title}' vanished between create and lookup")]
    MilestoneVanished { title: String },
}
