//! Mapping error types.

use thiserror::Error;

/// Errors that can occur while projecting a source issue onto the
/// destination schema.
#[derive(Debug, Error)]
pub enum MapError {
    /// Milestone resolution failed.
    #[error(transparent)]
    Taxonomy(#[from] crate::taxonomy::TaxonomyError),
}
