//! Mapping Bitbucket taxonomy values onto GitHub labels and milestones.
//!
//! Labels are pure string formatting: the import endpoint creates unknown
//! labels implicitly, so no API call is needed. Milestones have their own
//! identity on GitHub and are found-or-created once per title per run,
//! with per-title serialization so concurrent requests can't race to
//! create duplicates.

mod error;

pub use error::TaxonomyError;

use crate::config::RepoId;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// GitHub's maximum label length.
pub const MAX_LABEL_LEN: usize = 50;

/// The Bitbucket classification fields that become labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyKind {
    Priority,
    IssueType,
    Component,
    Version,
}

/// Formats one taxonomy value as a destination label.
///
/// Priorities and issue kinds read fine on their own; components and
/// versions get a prefix so `1.2` doesn't float around as a bare label.
/// Every label is truncated to GitHub's 50-character limit.
pub fn label_for(kind: TaxonomyKind, raw: &str) -> String {
    let formatted = match kind {
        TaxonomyKind::Priority | TaxonomyKind::IssueType => raw.trim().to_string(),
        TaxonomyKind::Component => format!("component: {}", raw.trim()),
        TaxonomyKind::Version => format!("version: {}", raw.trim()),
    };
    formatted.chars().take(MAX_LABEL_LEN).collect()
}

#[derive(Debug, Deserialize)]
struct Milestone {
    number: u64,
    title: String,
}

#[derive(Serialize)]
struct NewMilestone<'a> {
    title: &'a str,
}

/// Run-scoped find-or-create cache of destination milestone ids.
pub struct MilestoneRegistry {
    repo: RepoId,
    /// One cell per title; the cell serializes creation for that title
    /// while leaving other titles free to resolve concurrently.
    cells: Mutex<HashMap<String, Arc<OnceCell<u64>>>>,
}

impl MilestoneRegistry {
    pub fn new(repo: RepoId) -> Self {
        Self {
            repo,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves a milestone title to its destination id, creating the
    /// milestone on first encounter. Later calls for the same title hit
    /// the cache without any network traffic.
    ///
    /// # Errors
    ///
    /// Returns [`TaxonomyError`] if the milestone can't be listed or
    /// created.
    pub async fn milestone_id_for(
        &self,
        octocrab: &Octocrab,
        title: &str,
    ) -> Result<u64, TaxonomyError> {
        let cell = self.cell_for(title);
        cell.get_or_try_init(|| self.find_or_create(octocrab, title))
            .await
            .copied()
    }

    /// Seeds the cache with a known id, bypassing the network.
    #[cfg(test)]
    pub(crate) fn prime(&self, title: &str, number: u64) {
        let _ = self.cell_for(title).set(number);
    }

    fn cell_for(&self, title: &str) -> Arc<OnceCell<u64>> {
        let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells
            .entry(title.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    async fn find_or_create(&self, octocrab: &Octocrab, title: &str) -> Result<u64, TaxonomyError> {
        if let Some(number) = self.lookup(octocrab, title).await? {
            debug!(title, number, "Milestone already exists");
            return Ok(number);
        }

        let route = format!("/repos/{}/{}/milestones", self.repo.owner, self.repo.name);
        let created: Result<Milestone, octocrab::Error> =
            octocrab.post(&route, Some(&NewMilestone { title })).await;

        match created {
            Ok(milestone) => {
                info!(title, number = milestone.number, "Created milestone");
                Ok(milestone.number)
            }
            // Lost a server-side race: someone created it between our
            // lookup and create. Re-list and take theirs.
            Err(e) if is_already_exists(&e) => self
                .lookup(octocrab, title)
                .await?
                .ok_or_else(|| TaxonomyError::MilestoneVanished {
                    title: title.to_string(),
                }),
            Err(e) => Err(e.into()),
        }
    }

    async fn lookup(&self, octocrab: &Octocrab, title: &str) -> Result<Option<u64>, TaxonomyError> {
        let route = format!(
            "/repos/{}/{}/milestones?state=all&per_page=100",
            self.repo.owner, self.repo.name
        );
        let milestones: Vec<Milestone> = octocrab.get(&route, None::<&()>).await?;
        Ok(milestones
            .into_iter()
            .find(|m| m.title == title)
            .map(|m| m.number))
    }
}

fn is_already_exists(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 422
    )
}
