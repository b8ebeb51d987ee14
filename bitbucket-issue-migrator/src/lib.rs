#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

pub mod config;
pub mod context;
pub mod mapping;
pub mod rate_limit;
pub mod rewrite;
pub mod runner;
pub mod source;
pub mod submit;
pub mod summary;
pub mod taxonomy;
pub mod users;

pub use config::{load_user_map, ConfigError, MigrationConfig, RepoId, SourceAuth};
pub use context::MigrationContext;
pub use mapping::{map_comment, map_issue, MapError, MappedComment, MappedIssue};
pub use rate_limit::SubmissionBudget;
pub use rewrite::{
    append_attribution, link_changesets, normalize_code_blocks, rewrite_body,
    rewrite_issue_links,
};
pub use runner::{Runner, RunnerError};
pub use source::{SourceClient, SourceComment, SourceError, SourceIssue, StatusChange};
pub use submit::{submit_issue, ImportState, SubmitError};
pub use summary::{IssueOutcome, MigrationReport};
pub use taxonomy::{label_for, MilestoneRegistry, TaxonomyError, TaxonomyKind};
pub use users::{Resolution, UserMapper};
