//! Orchestrates the migration pipeline.
//!
//! Pulls issues from the source in ascending id order, enriches and maps
//! each one, and hands the payloads to the submitter one at a time. Issue
//! enrichment (comments, attachments, change log) runs ahead with bounded
//! concurrency, but results are re-ordered back to fetch order before
//! submission: the destination assigns issue numbers as import jobs
//! complete, and link rewriting assumes a 1:1 id correspondence, so
//! out-of-order submission would misalign every cross-issue reference
//! processed afterwards.

use crate::config::{ConfigError, MigrationConfig};
use crate::context::MigrationContext;
use crate::mapping::{self, MappedIssue};
use crate::source::{SourceClient, SourceComment, SourceError, SourceIssue, StatusChange};
use crate::submit::{self, ImportState};
use crate::summary::{IssueOutcome, MigrationReport};
use futures::stream::StreamExt;
use octocrab::Octocrab;
use tracing::{error, info, warn};

/// Media type that unlocks the import preview endpoint.
const IMPORT_ACCEPT: &str = "application/vnd.github.golden-comet-preview+json";

/// Errors that can occur before or while starting a run.
///
/// Fatal errors *during* a run don't surface here; they stop processing
/// and are reported through [`MigrationReport::aborted`] so the outcomes
/// recorded up to that point survive.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration validation errors.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// GitHub API client initialization errors.
    #[error(transparent)]
    Octocrab(#[from] octocrab::Error),
    /// Source tracker errors that are fatal before processing starts.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// One issue with everything needed to map it.
struct Envelope {
    issue: SourceIssue,
    comments: Vec<SourceComment>,
    attachments: Vec<String>,
    changes: Vec<StatusChange>,
}

/// What the prefetch stage produced for one stream position.
enum Fetched {
    /// Fully enriched and ready to map.
    Ready(Box<Envelope>),
    /// Inside the configured skip offset; not enriched at all.
    Skipped { source_id: u64 },
    /// This issue could not be enriched; the run continues.
    Failed { source_id: u64, error: SourceError },
    /// Pagination or a fatal source error ended the run.
    Aborted(SourceError),
}

fn fetch_failure(source_id: u64, error: SourceError) -> Fetched {
    if error.is_fatal() {
        Fetched::Aborted(error)
    } else {
        Fetched::Failed { source_id, error }
    }
}

/// Drives a full migration run.
pub struct Runner {
    ctx: MigrationContext,
    octocrab: Octocrab,
    source: SourceClient,
}

impl Runner {
    /// Builds a runner from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the configuration is inconsistent or
    /// either API client can't be constructed.
    pub fn new(config: MigrationConfig) -> Result<Self, RunnerError> {
        let ctx = MigrationContext::new(config)?;
        let octocrab = Octocrab::builder()
            .personal_token(ctx.config.github_token.clone())
            .add_header(reqwest::header::ACCEPT, IMPORT_ACCEPT.to_string())
            .build()?;
        let source = SourceClient::new(
            &ctx.config.bitbucket_repo,
            ctx.config.bitbucket_auth.clone(),
        )?;
        Ok(Self {
            ctx,
            octocrab,
            source,
        })
    }

    /// Executes the migration and returns the final report.
    ///
    /// Per-issue failures are recorded and the run continues; a fatal
    /// source error mid-run stops processing and is recorded in
    /// [`MigrationReport::aborted`].
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] only for failures before the first issue
    /// is processed.
    pub async fn run(&self) -> Result<MigrationReport, RunnerError> {
        let mut report = MigrationReport::new(self.ctx.config.dry_run);

        match self.source.total_issues().await {
            Ok(total) => {
                info!(
                    total,
                    repo = %self.ctx.config.bitbucket_repo,
                    "Source tracker reachable"
                );
                report.total_advertised = Some(total);
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            // The count is a progress hint; pagination decides when the
            // run actually ends.
            Err(e) => warn!(error = %e, "Could not fetch the advertised issue count"),
        }

        let concurrency = self.ctx.config.concurrency.max(1);
        let fetched = self
            .source
            .issues()
            .enumerate()
            .map(|(position, result)| self.prefetch(position, result))
            .buffered(concurrency);
        futures::pin_mut!(fetched);

        while let Some(item) = fetched.next().await {
            match item {
                Fetched::Aborted(e) => {
                    error!(error = %e, "Fatal source error, stopping the run");
                    report.aborted = Some(e.to_string());
                    break;
                }
                Fetched::Skipped { source_id } => {
                    report.record(IssueOutcome::Skipped {
                        source_id,
                        reason: "skipped by offset".to_string(),
                    });
                }
                Fetched::Failed { source_id, error } => {
                    warn!(source_id, error = %error, "Issue could not be fetched");
                    report.record(IssueOutcome::Failed {
                        source_id,
                        error: error.to_string(),
                    });
                }
                Fetched::Ready(envelope) => self.process(&envelope, &mut report).await,
            }
        }

        info!(
            submitted = report.submitted,
            skipped = report.skipped,
            failed = report.failed,
            aborted = report.aborted.is_some(),
            "Run finished"
        );
        Ok(report)
    }

    /// Enriches one fetched issue with its ancillary records. Runs with
    /// bounded concurrency ahead of the sequential submission loop.
    async fn prefetch(&self, position: usize, result: Result<SourceIssue, SourceError>) -> Fetched {
        let issue = match result {
            Ok(issue) => issue,
            Err(e) => return Fetched::Aborted(e),
        };

        // The offset counts fetched issues, not ids: deleted source
        // issues already leave gaps in the id sequence.
        if position < self.ctx.config.skip {
            return Fetched::Skipped {
                source_id: issue.id,
            };
        }

        let source_id = issue.id;
        let comments = match self.source.comments(source_id).await {
            Ok(comments) => comments,
            Err(e) => return fetch_failure(source_id, e),
        };
        let attachments = if self.ctx.config.mention_attachments {
            match self.source.attachment_names(source_id).await {
                Ok(names) => names,
                Err(e) => return fetch_failure(source_id, e),
            }
        } else {
            Vec::new()
        };
        let changes = if self.ctx.config.mention_status_changes {
            match self.source.status_changes(source_id).await {
                Ok(changes) => changes,
                Err(e) => return fetch_failure(source_id, e),
            }
        } else {
            Vec::new()
        };

        Fetched::Ready(Box::new(Envelope {
            issue,
            comments,
            attachments,
            changes,
        }))
    }

    /// Maps and (unless dry-running) submits one enriched issue.
    async fn process(&self, envelope: &Envelope, report: &mut MigrationReport) {
        let source_id = envelope.issue.id;

        let mapped = match mapping::map_issue(
            &self.ctx,
            &self.octocrab,
            &envelope.issue,
            &envelope.comments,
            &envelope.attachments,
            &envelope.changes,
        )
        .await
        {
            Ok(mapped) => mapped,
            Err(e) => {
                warn!(source_id, error = %e, "Mapping failed");
                report.record(IssueOutcome::Failed {
                    source_id,
                    error: e.to_string(),
                });
                return;
            }
        };

        if self.ctx.config.dry_run {
            print_dry_run_payload(source_id, &mapped);
            report.record(IssueOutcome::Skipped {
                source_id,
                reason: "dry run".to_string(),
            });
            return;
        }

        match submit::submit_issue(&self.octocrab, &self.ctx, source_id, &mapped).await {
            ImportState::Done { issue_number } => {
                info!(source_id, ?issue_number, "Issue migrated");
                report.record(IssueOutcome::Submitted {
                    source_id,
                    destination_number: issue_number,
                });
            }
            ImportState::Failed { error } => {
                error!(source_id, error = %error, "Issue failed to import");
                report.record(IssueOutcome::Failed { source_id, error });
            }
            // The submitter only ever returns terminal states.
            other => {
                report.record(IssueOutcome::Failed {
                    source_id,
                    error: format!("import ended in non-terminal state {other:?}"),
                });
            }
        }
    }
}

fn print_dry_run_payload(source_id: u64, mapped: &MappedIssue) {
    println!("\n[DRY RUN] Issue #{source_id}: {}", mapped.title);
    println!(
        "  closed: {}, labels: {:?}, comments: {}",
        mapped.closed,
        mapped.labels,
        mapped.comments.len()
    );
    if let Some(title) = &mapped.source_milestone {
        println!("  milestone: {title} (would be found or created)");
    }

    let payload = serde_json::json!({
        "issue": mapped,
        "comments": mapped.comments,
    });
    if let Ok(json) = serde_json::to_string_pretty(&payload) {
        for line in json.lines().take(40) {
            println!("    {line}");
        }
        if json.lines().count() > 40 {
            println!("    ...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_fetch_errors_abort() {
        let fetched = fetch_failure(
            3,
            SourceError::RepoNotFound {
                repo: "a/b".into(),
            },
        );
        assert!(matches!(fetched, Fetched::Aborted(_)));
    }

    #[test]
    fn transient_fetch_errors_fail_the_single_issue() {
        let fetched = fetch_failure(
            3,
            SourceError::RetriesExhausted {
                url: "u".into(),
                attempts: 3,
                message: "timeout".into(),
            },
        );
        assert!(matches!(
            fetched,
            Fetched::Failed { source_id: 3, .. }
        ));
    }
}
