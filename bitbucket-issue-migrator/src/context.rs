//! Run-scoped shared state.

use crate::config::{ConfigError, MigrationConfig, RepoId};
use crate::rate_limit::SubmissionBudget;
use crate::taxonomy::MilestoneRegistry;
use crate::users::UserMapper;

/// Everything the pipeline stages share during one run.
///
/// Built once up front and passed by reference into every stage; nothing
/// here is a process-wide singleton, so multiple migrations can run
/// isolated in the same process.
pub struct MigrationContext {
    pub config: MigrationConfig,
    /// Parsed destination repository.
    pub dest: RepoId,
    pub users: UserMapper,
    pub milestones: MilestoneRegistry,
    pub budget: SubmissionBudget,
}

impl MigrationContext {
    /// Validates the configuration and builds the run-scoped caches.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if either repository identifier is
    /// malformed.
    pub fn new(config: MigrationConfig) -> Result<Self, ConfigError> {
        let dest = RepoId::parse(&config.github_repo)?;
        // The source identifier is only ever spliced into URLs, but catch
        // obvious typos before the first network call.
        RepoId::parse(&config.bitbucket_repo)?;

        let mut overrides = config.user_map.clone();
        if let Some(user) = &config.suppress_attribution {
            overrides.push((user.clone(), String::new()));
        }
        let users = UserMapper::new(overrides, config.assume_same_names);
        let milestones = MilestoneRegistry::new(dest.clone());

        Ok(Self {
            config,
            dest,
            users,
            milestones,
            budget: SubmissionBudget::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::Resolution;

    fn config() -> MigrationConfig {
        MigrationConfig {
            bitbucket_repo: "acme/widget".into(),
            github_repo: "acme/widget-rs".into(),
            github_token: "token".into(),
            suppress_attribution: Some("migrationbot".into()),
            ..MigrationConfig::default()
        }
    }

    #[test]
    fn builds_context_from_valid_config() {
        let ctx = MigrationContext::new(config()).unwrap();
        assert_eq!(ctx.dest.owner, "acme");
        assert_eq!(ctx.dest.name, "widget-rs");
    }

    #[test]
    fn suppression_user_is_merged_into_the_mapper() {
        let ctx = MigrationContext::new(config()).unwrap();
        assert_eq!(ctx.users.resolve("migrationbot"), Resolution::Suppressed);
    }

    #[test]
    fn malformed_destination_is_rejected() {
        let mut bad = config();
        bad.github_repo = "not-a-repo".into();
        assert!(MigrationContext::new(bad).is_err());
    }
}
