//! Bitbucket wire records.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Bitbucket states that map to a closed GitHub issue.
const CLOSED_STATES: &[&str] = &["resolved", "closed", "invalid", "duplicate", "wontfix"];

/// One page of a Bitbucket 2.0 collection endpoint.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,
    /// URL of the following page, absent on the last one.
    pub next: Option<String>,
    /// Advertised total size. Stale for trackers with deletions, so only
    /// ever used for progress reporting.
    pub size: Option<u64>,
}

/// Markup content wrapper (`{"raw": ..., "markup": ..., "html": ...}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    pub raw: Option<String>,
}

/// A Bitbucket account reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub nickname: Option<String>,
    pub display_name: Option<String>,
}

impl Account {
    /// Preferred handle for links and attribution.
    pub fn handle(&self) -> Option<&str> {
        self.nickname
            .as_deref()
            .or(self.display_name.as_deref())
    }
}

/// A `{"name": ...}` reference (component, milestone, version).
#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

/// An issue as fetched from the Bitbucket tracker. Immutable once fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceIssue {
    /// Tracker-local id. Deleted issues leave gaps in the sequence.
    pub id: u64,
    pub title: String,
    pub content: Option<Content>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub priority: String,
    pub reporter: Option<Account>,
    pub assignee: Option<Account>,
    pub component: Option<Named>,
    pub milestone: Option<Named>,
    pub version: Option<Named>,
    pub created_on: DateTime<Utc>,
    pub updated_on: Option<DateTime<Utc>>,
}

impl SourceIssue {
    /// Raw body text, empty if the issue has none.
    pub fn body(&self) -> &str {
        self.content
            .as_ref()
            .and_then(|c| c.raw.as_deref())
            .unwrap_or("")
    }

    /// Whether the Bitbucket state maps to a closed GitHub issue.
    /// `on hold` stays open.
    pub fn is_closed(&self) -> bool {
        CLOSED_STATES.contains(&self.state.as_str())
    }

    pub fn reporter_handle(&self) -> Option<&str> {
        self.reporter.as_ref().and_then(Account::handle)
    }
}

/// A comment belonging to one issue.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceComment {
    pub user: Option<Account>,
    pub content: Option<Content>,
    pub created_on: DateTime<Utc>,
}

impl SourceComment {
    pub fn body(&self) -> &str {
        self.content
            .as_ref()
            .and_then(|c| c.raw.as_deref())
            .unwrap_or("")
    }

    pub fn author_handle(&self) -> Option<&str> {
        self.user.as_ref().and_then(Account::handle)
    }
}

/// An attachment record; only the file name is carried over.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub name: String,
}

/// One entry of the issue change log.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEntry {
    #[serde(default)]
    pub changes: ChangeSet,
    pub user: Option<Account>,
    pub created_on: DateTime<Utc>,
}

/// Fields modified by a change-log entry; only state changes matter here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeSet {
    pub state: Option<ChangedValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangedValue {
    pub old: Option<String>,
    pub new: Option<String>,
}

/// A state transition extracted from the change log.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// Who flipped the state, when known.
    pub actor: Option<String>,
    /// The state the issue moved to.
    pub to: String,
    pub created_on: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_json(state: &str) -> String {
        format!(
            r#"{{
                "id": 7,
                "title": "Crash on startup",
                "content": {{"raw": "It crashes."}},
                "state": "{state}",
                "kind": "bug",
                "priority": "major",
                "reporter": {{"nickname": "jsmith", "display_name": "John Smith"}},
                "created_on": "2014-01-01T12:34:56.000000+00:00"
            }}"#
        )
    }

    #[test]
    fn deserialize_issue() {
        let issue: SourceIssue = serde_json::from_str(&issue_json("open")).unwrap();
        assert_eq!(issue.id, 7);
        assert_eq!(issue.body(), "It crashes.");
        assert_eq!(issue.reporter_handle(), Some("jsmith"));
        assert!(!issue.is_closed());
    }

    #[test]
    fn closed_state_mapping() {
        for state in ["resolved", "closed", "invalid", "duplicate", "wontfix"] {
            let issue: SourceIssue = serde_json::from_str(&issue_json(state)).unwrap();
            assert!(issue.is_closed(), "{state} should close the issue");
        }
        for state in ["new", "open", "on hold"] {
            let issue: SourceIssue = serde_json::from_str(&issue_json(state)).unwrap();
            assert!(!issue.is_closed(), "{state} should stay open");
        }
    }

    #[test]
    fn missing_content_yields_empty_body() {
        let comment: SourceComment = serde_json::from_str(
            r#"{"user": null, "content": null, "created_on": "2014-01-01T00:00:00+00:00"}"#,
        )
        .unwrap();
        assert_eq!(comment.body(), "");
        assert_eq!(comment.author_handle(), None);
    }

    #[test]
    fn account_handle_prefers_nickname() {
        let account = Account {
            nickname: Some("jsmith".into()),
            display_name: Some("John Smith".into()),
        };
        assert_eq!(account.handle(), Some("jsmith"));

        let account = Account {
            nickname: None,
            display_name: Some("John Smith".into()),
        };
        assert_eq!(account.handle(), Some("John Smith"));
    }
}
