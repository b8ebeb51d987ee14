//! Paginated read-only access to the Bitbucket issue tracker.
//!
//! All fetches go through a bounded retry loop with exponential backoff;
//! authentication failures and missing repositories are fatal and abort
//! the enclosing run instead of being retried.

mod error;
mod records;

pub use error::SourceError;
pub use records::{
    Account, Attachment, ChangeEntry, Content, Named, Page, SourceComment, SourceIssue,
    StatusChange,
};

use crate::config::SourceAuth;
use futures::stream::{self, Stream, TryStreamExt};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const API_ROOT: &str = "https://api.bitbucket.org/2.0/repositories";
const PAGE_LEN: u32 = 50;

/// Attempts per page fetch before giving up.
const FETCH_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("bitbucket-issue-migrator/", env!("CARGO_PKG_VERSION"));

/// Read-only client for one Bitbucket repository's issue tracker.
pub struct SourceClient {
    http: reqwest::Client,
    repo: String,
    auth: Option<SourceAuth>,
}

impl SourceClient {
    /// Builds a client for `owner/slug`, optionally authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying HTTP client can't be built.
    pub fn new(repo: &str, auth: Option<SourceAuth>) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            repo: repo.to_string(),
            auth,
        })
    }

    /// The tracker's advertised issue count.
    ///
    /// Stale on repositories with deleted issues; callers use it for
    /// progress reporting only, never to bound pagination.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the count can't be fetched.
    pub async fn total_issues(&self) -> Result<u64, SourceError> {
        let url = format!("{API_ROOT}/{}/issues?pagelen=1", self.repo);
        let page: Page<serde_json::Value> = self.get_json(&url).await?;
        Ok(page.size.unwrap_or(0))
    }

    /// Lazily paginated stream of issues in ascending id order.
    ///
    /// The stream ends after the last page, regardless of the advertised
    /// total. Any error item is terminal: pagination state is lost once a
    /// page fetch fails for good.
    pub fn issues(&self) -> impl Stream<Item = Result<SourceIssue, SourceError>> + '_ {
        let first = format!("{API_ROOT}/{}/issues?sort=id&pagelen={PAGE_LEN}", self.repo);
        stream::try_unfold(Some(first), move |state| async move {
            let Some(url) = state else {
                return Ok::<_, SourceError>(None);
            };
            debug!(url = %url, "Fetching issue page");
            let page: Page<SourceIssue> = self.get_json(&url).await?;
            let items = stream::iter(page.values.into_iter().map(Ok::<_, SourceError>));
            Ok(Some((items, page.next)))
        })
        .try_flatten()
    }

    /// All comments of one issue, oldest first, empty-bodied status
    /// comments dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if any comment page can't be fetched.
    pub async fn comments(&self, issue_id: u64) -> Result<Vec<SourceComment>, SourceError> {
        let url = format!(
            "{API_ROOT}/{}/issues/{issue_id}/comments?sort=created_on&pagelen={PAGE_LEN}",
            self.repo
        );
        let comments: Vec<SourceComment> = self.collect_all(url).await?;
        Ok(comments
            .into_iter()
            .filter(|c| !c.body().trim().is_empty())
            .collect())
    }

    /// File names of one issue's attachments.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if any attachment page can't be fetched.
    pub async fn attachment_names(&self, issue_id: u64) -> Result<Vec<String>, SourceError> {
        let url = format!(
            "{API_ROOT}/{}/issues/{issue_id}/attachments?pagelen={PAGE_LEN}",
            self.repo
        );
        let attachments: Vec<Attachment> = self.collect_all(url).await?;
        Ok(attachments.into_iter().map(|a| a.name).collect())
    }

    /// State transitions from one issue's change log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if any change page can't be fetched.
    pub async fn status_changes(&self, issue_id: u64) -> Result<Vec<StatusChange>, SourceError> {
        let url = format!(
            "{API_ROOT}/{}/issues/{issue_id}/changes?sort=created_on&pagelen={PAGE_LEN}",
            self.repo
        );
        let entries: Vec<ChangeEntry> = self.collect_all(url).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let to = entry.changes.state.as_ref()?.new.clone()?;
                Some(StatusChange {
                    actor: entry.user.as_ref().and_then(Account::handle).map(String::from),
                    to,
                    created_on: entry.created_on,
                })
            })
            .collect())
    }

    /// Follows `next` links until the collection is exhausted.
    async fn collect_all<T: DeserializeOwned>(
        &self,
        first_url: String,
    ) -> Result<Vec<T>, SourceError> {
        let mut values = Vec::new();
        let mut next = Some(first_url);
        while let Some(url) = next {
            let mut page: Page<T> = self.get_json(&url).await?;
            values.append(&mut page.values);
            next = page.next;
        }
        Ok(values)
    }

    /// One GET with the bounded-backoff retry loop around it.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let mut delay = RETRY_BASE_DELAY;
        let mut last_message = String::new();

        for attempt in 1..=FETCH_ATTEMPTS {
            match self.get_once(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    last_message = e.to_string();
                    warn!(url = %url, attempt, error = %e, "Transient Bitbucket failure");
                    if attempt < FETCH_ATTEMPTS {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(RETRY_MAX_DELAY);
                    }
                }
            }
        }

        Err(SourceError::RetriesExhausted {
            url: url.to_string(),
            attempts: FETCH_ATTEMPTS,
            message: last_message,
        })
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let mut request = self.http.get(url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.app_password));
        }

        let response = request.send().await?;
        let status = response.status();
        match status {
            s if s.is_success() => Ok(response.json().await?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::Auth {
                repo: self.repo.clone(),
            }),
            StatusCode::NOT_FOUND => Err(SourceError::RepoNotFound {
                repo: self.repo.clone(),
            }),
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                Err(SourceError::Status {
                    url: url.to_string(),
                    status: s.as_u16(),
                })
            }
            s => Err(SourceError::UnexpectedStatus {
                url: url.to_string(),
                status: s.as_u16(),
            }),
        }
    }
}
