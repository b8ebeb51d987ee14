//! Validated run configuration.
//!
//! The migrator core does not parse command-line flags or prompt for
//! credentials; the embedding binary builds a [`MigrationConfig`] and hands
//! it over. This module also loads the optional TOML user-mapping file.

mod error;

pub use error::ConfigError;

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::info;

/// A `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoId {
    /// Parses an `owner/name` string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRepo`] if the string is not exactly
    /// two non-empty segments separated by a slash.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ConfigError::InvalidRepo {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Basic-auth credentials for a private Bitbucket repository.
#[derive(Debug, Clone)]
pub struct SourceAuth {
    /// Bitbucket username.
    pub username: String,
    /// App password for that user.
    pub app_password: String,
}

/// Everything a single migration run needs to know.
///
/// Built by the embedding binary from flags, environment and files; the
/// pipeline treats it as read-only for the whole run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Bitbucket repository to pull issues from, `owner/slug`.
    pub bitbucket_repo: String,
    /// GitHub repository to import issues into, `owner/name`.
    pub github_repo: String,
    /// GitHub personal access token with issue-write scope.
    pub github_token: String,
    /// Optional credentials for a private Bitbucket repository.
    pub bitbucket_auth: Option<SourceAuth>,
    /// Fetch and map, but never submit; print would-be payloads instead.
    pub dry_run: bool,
    /// Number of issues, in fetch order, to skip before submitting.
    pub skip: usize,
    /// Bound on concurrent Bitbucket fetches while enriching issues.
    pub concurrency: usize,
    /// Explicit Bitbucket -> GitHub username overrides. An empty GitHub
    /// name suppresses attribution for that user entirely.
    pub user_map: Vec<(String, String)>,
    /// Treat unmapped Bitbucket usernames as identical GitHub usernames.
    pub assume_same_names: bool,
    /// Username whose comments get no attribution annotation (typically
    /// the account running the migration).
    pub suppress_attribution: Option<String>,
    /// Rewrite `<<changeset ...>>` markers into Bitbucket commit links.
    pub link_changesets: bool,
    /// Append a note listing attachment file names (the files themselves
    /// are not migrated).
    pub mention_attachments: bool,
    /// Replay Bitbucket status changes as synthetic comments.
    pub mention_status_changes: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            bitbucket_repo: String::new(),
            github_repo: String::new(),
            github_token: String::new(),
            bitbucket_auth: None,
            dry_run: false,
            skip: 0,
            concurrency: 4,
            user_map: Vec::new(),
            assume_same_names: false,
            suppress_attribution: None,
            link_changesets: false,
            mention_attachments: false,
            mention_status_changes: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UserMapFile {
    #[serde(default)]
    users: HashMap<String, String>,
}

/// Loads Bitbucket -> GitHub username overrides from a TOML file.
///
/// The file holds a single `[users]` table; an empty value suppresses
/// attribution for that user:
///
/// ```toml
/// [users]
/// jsmith = "john-smith"
/// migrationbot = ""
/// ```
///
/// # Errors
///
/// Returns [`ConfigError`] if the file can't be read or parsed.
pub fn load_user_map(path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: UserMapFile = toml::from_str(&raw).map_err(|e| ConfigError::TomlError {
        path: path.display().to_string(),
        source: e,
    })?;

    info!(path = %path.display(), count = file.users.len(), "Loaded user map");
    Ok(file.users.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parse_valid_repo() {
        let repo = RepoId::parse("octocat/hello-world").unwrap();
        assert_eq!(repo.owner, "octocat");
        assert_eq!(repo.name, "hello-world");
        assert_eq!(repo.to_string(), "octocat/hello-world");
    }

    #[test]
    fn parse_rejects_malformed_repo() {
        for value in ["", "justowner", "/name", "owner/", "a/b/c"] {
            assert!(
                matches!(RepoId::parse(value), Err(ConfigError::InvalidRepo { .. })),
                "accepted {value:?}"
            );
        }
    }

    #[test]
    fn load_user_map_reads_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("users.toml");
        fs::write(
            &path,
            r#"
[users]
jsmith = "john-smith"
migrationbot = ""
"#,
        )
        .unwrap();

        let map = load_user_map(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert!(map
            .iter()
            .any(|(s, d)| s == "jsmith" && d == "john-smith"));
        assert!(map.iter().any(|(s, d)| s == "migrationbot" && d.is_empty()));
    }

    #[test]
    fn load_user_map_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = load_user_map(&temp.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
