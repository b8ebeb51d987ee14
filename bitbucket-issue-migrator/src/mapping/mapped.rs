//! Destination-schema projections.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// An issue in the shape the import endpoint expects.
///
/// Serializes directly into the `issue` half of an import payload;
/// comments ride along in the struct but are serialized separately.
#[derive(Debug, Clone, Serialize)]
pub struct MappedIssue {
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub closed: bool,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Source milestone title, kept for dry-run previews.
    #[serde(skip)]
    pub source_milestone: Option<String>,
    #[serde(skip)]
    pub comments: Vec<MappedComment>,
}

/// A comment in the shape the import endpoint expects, body already
/// carrying its attribution annotation.
#[derive(Debug, Clone, Serialize)]
pub struct MappedComment {
    pub created_at: DateTime<Utc>,
    pub body: String,
}
