//! Rate-limited delivery to the destination's asynchronous import endpoint.
//!
//! One call submits one mapped issue with its comments, then polls the
//! returned job until it reaches a terminal status. Transient failures are
//! retried with bounded exponential backoff; destination-side throttling
//! (429) waits without consuming the retry budget, since it is expected
//! contention rather than a fault.

mod error;
mod status;

pub use error::SubmitError;
pub use status::ImportState;

use crate::context::MigrationContext;
use crate::mapping::{MappedComment, MappedIssue};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

/// The import endpoint rejects payloads above one megabyte.
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

const POLL_INTERVAL: Duration = Duration::from_secs(3);
const MAX_POLL_ATTEMPTS: u32 = 40;

/// Transient-failure attempts per request before giving up.
const MAX_TRANSIENT_ATTEMPTS: u32 = 4;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Wait after a 429 when the response gives no better hint.
const THROTTLE_WAIT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct ImportRequest<'a> {
    issue: &'a MappedIssue,
    comments: &'a [MappedComment],
}

/// Status strings reported by the job endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportJobStatus {
    Pending,
    Importing,
    Imported,
    Failed,
    /// Anything the API grows later; treated as still-running.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ImportJob {
    id: u64,
    status: ImportJobStatus,
    #[serde(default)]
    issue_url: Option<String>,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

/// Delivers one mapped issue to the destination and confirms completion.
///
/// Always returns a terminal [`ImportState`]; per-issue failures are data
/// for the caller's report, not reasons to stop the run.
pub async fn submit_issue(
    octocrab: &Octocrab,
    ctx: &MigrationContext,
    source_id: u64,
    issue: &MappedIssue,
) -> ImportState {
    let span = info_span!("submit_issue", source_id, dest = %ctx.dest);

    async move {
        let payload = ImportRequest {
            issue,
            comments: &issue.comments,
        };
        let encoded = match serde_json::to_vec(&payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                return ImportState::Failed {
                    error: SubmitError::Encode(e).to_string(),
                }
            }
        };
        if encoded.len() > MAX_PAYLOAD_BYTES {
            // The payload will never succeed unchanged, so no POST happens.
            warn!(bytes = encoded.len(), "Payload over the import size limit");
            return ImportState::Failed {
                error: SubmitError::PayloadRejected {
                    reason: format!(
                        "payload is {} bytes, the import endpoint accepts at most {MAX_PAYLOAD_BYTES}",
                        encoded.len()
                    ),
                }
                .to_string(),
            };
        }

        let mut state = ImportState::Pending;

        // The only intentional suspension point besides network I/O.
        ctx.budget.acquire().await;

        let route = format!("/repos/{}/{}/import/issues", ctx.dest.owner, ctx.dest.name);
        let job: ImportJob = match request_with_retry("submitting the import payload", || {
            octocrab.post(&route, Some(&payload))
        })
        .await
        {
            Ok(job) => job,
            Err(e) => return state.advance(ImportState::Failed { error: e.to_string() }),
        };

        state = state.advance(ImportState::Importing { job_id: job.id });
        info!(job_id = job.id, "Import job accepted");

        let status_route = format!(
            "/repos/{}/{}/import/issues/{}",
            ctx.dest.owner, ctx.dest.name, job.id
        );
        for attempt in 1..=MAX_POLL_ATTEMPTS {
            tokio::time::sleep(POLL_INTERVAL).await;

            let polled: ImportJob = match request_with_retry("polling the import job", || {
                octocrab.get(&status_route, None::<&()>)
            })
            .await
            {
                Ok(job) => job,
                Err(e) => return state.advance(ImportState::Failed { error: e.to_string() }),
            };

            match polled.status {
                ImportJobStatus::Imported => {
                    let issue_number = polled.issue_url.as_deref().and_then(parse_issue_number);
                    info!(?issue_number, polls = attempt, "Import job finished");
                    return state.advance(ImportState::Done { issue_number });
                }
                ImportJobStatus::Failed => {
                    let errors = polled
                        .errors
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no detail given".to_string());
                    warn!(job_id = job.id, errors = %errors, "Import job failed");
                    return state.advance(ImportState::Failed {
                        error: SubmitError::JobFailed { errors }.to_string(),
                    });
                }
                ImportJobStatus::Pending | ImportJobStatus::Importing | ImportJobStatus::Unknown => {
                    debug!(job_id = job.id, attempt, "Import job still running");
                }
            }
        }

        state.advance(ImportState::Failed {
            error: SubmitError::PollExhausted {
                attempts: MAX_POLL_ATTEMPTS,
            }
            .to_string(),
        })
    }
    .instrument(span)
    .await
}

enum ApiFailure {
    /// 429: wait it out, never counted against the retry budget.
    Throttled,
    /// 5xx or a transport failure: retry with backoff.
    Transient,
    /// Any other client error: the request is wrong, retrying won't help.
    Rejected,
}

fn classify(error: &octocrab::Error) -> ApiFailure {
    match error {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            if status == 429 {
                ApiFailure::Throttled
            } else if status >= 500 {
                ApiFailure::Transient
            } else {
                ApiFailure::Rejected
            }
        }
        // Timeouts, connection resets and friends.
        _ => ApiFailure::Transient,
    }
}

async fn request_with_retry<T, F, Fut>(action: &'static str, mut call: F) -> Result<T, SubmitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, octocrab::Error>>,
{
    let mut failures = 0u32;
    let mut delay = RETRY_BASE_DELAY;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) => match classify(&error) {
                ApiFailure::Throttled => {
                    info!(action, wait_secs = THROTTLE_WAIT.as_secs(), "Destination throttled the request, waiting");
                    tokio::time::sleep(THROTTLE_WAIT).await;
                }
                ApiFailure::Transient => {
                    failures += 1;
                    if failures >= MAX_TRANSIENT_ATTEMPTS {
                        return Err(SubmitError::RetriesExhausted {
                            action,
                            source: error,
                        });
                    }
                    warn!(action, attempt = failures, error = %error, "Transient destination failure");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RETRY_MAX_DELAY);
                }
                ApiFailure::Rejected => {
                    return Err(SubmitError::PayloadRejected {
                        reason: error.to_string(),
                    })
                }
            },
        }
    }
}

/// Pulls the issue number out of a destination issue URL.
fn parse_issue_number(issue_url: &str) -> Option<u64> {
    let url = Url::parse(issue_url).ok()?;
    url.path_segments()?.last()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MigrationConfig;
    use chrono::{TimeZone, Utc};

    fn context() -> MigrationContext {
        MigrationContext::new(MigrationConfig {
            bitbucket_repo: "acme/widget".into(),
            github_repo: "acme/widget-rs".into(),
            github_token: "token".into(),
            ..MigrationConfig::default()
        })
        .unwrap()
    }

    fn mapped_issue(body: String) -> MappedIssue {
        MappedIssue {
            title: "t".into(),
            body,
            created_at: Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap(),
            updated_at: None,
            closed: false,
            labels: vec![],
            milestone: None,
            assignee: None,
            source_milestone: None,
            comments: vec![],
        }
    }

    #[tokio::test]
    async fn oversized_payload_fails_without_a_post() {
        let ctx = context();
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let octocrab = Octocrab::builder().build().unwrap();
        let issue = mapped_issue("x".repeat(MAX_PAYLOAD_BYTES + 200_000));

        // No network in this test: the size check fires before any request.
        let state = submit_issue(&octocrab, &ctx, 1, &issue).await;
        assert!(state.is_terminal());
        match state {
            ImportState::Failed { error } => {
                assert!(error.contains("rejected"), "unexpected error: {error}")
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn issue_number_parsed_from_url() {
        assert_eq!(
            parse_issue_number("https://api.github.com/repos/acme/widget-rs/issues/123"),
            Some(123)
        );
        assert_eq!(parse_issue_number("not a url"), None);
        assert_eq!(
            parse_issue_number("https://api.github.com/repos/acme/widget-rs/issues/abc"),
            None
        );
    }

    #[test]
    fn job_status_strings_deserialize() {
        let job: ImportJob = serde_json::from_str(
            r#"{"id": 3, "status": "imported", "issue_url": "https://api.github.com/repos/a/b/issues/9"}"#,
        )
        .unwrap();
        assert_eq!(job.status, ImportJobStatus::Imported);
        assert_eq!(job.issue_url.as_deref().and_then(parse_issue_number), Some(9));

        let job: ImportJob =
            serde_json::from_str(r#"{"id": 3, "status": "archived"}"#).unwrap();
        assert_eq!(job.status, ImportJobStatus::Unknown);
    }

    #[test]
    fn payload_serializes_issue_and_comments() {
        let mut issue = mapped_issue("body".into());
        issue.labels = vec!["bug".into()];
        issue.comments = vec![MappedComment {
            created_at: Utc.with_ymd_and_hms(2014, 1, 2, 0, 0, 0).unwrap(),
            body: "comment".into(),
        }];

        let payload = ImportRequest {
            issue: &issue,
            comments: &issue.comments,
        };
        let json: serde_json::Value =
            serde_json::from_slice(&serde_json::to_vec(&payload).unwrap()).unwrap();

        assert_eq!(json["issue"]["title"], "t");
        assert_eq!(json["issue"]["labels"][0], "bug");
        // Skipped fields must not leak into the wire payload.
        assert!(json["issue"].get("comments").is_none());
        assert!(json["issue"].get("milestone").is_none());
        assert_eq!(json["comments"][0]["body"], "comment");
    }
}
