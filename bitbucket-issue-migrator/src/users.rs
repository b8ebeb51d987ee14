//! Source-to-destination username resolution.
//!
//! Built once from the configured override table before processing starts
//! and read-only for the rest of the run.

use std::collections::HashMap;

/// Outcome of resolving one Bitbucket username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Explicitly mapped (or same-name fallback) GitHub username.
    Destination(String),
    /// Mapped to the empty string: attribution is suppressed entirely.
    Suppressed,
    /// No mapping known.
    Unknown,
}

/// Resolves Bitbucket usernames to GitHub usernames.
#[derive(Debug, Clone, Default)]
pub struct UserMapper {
    overrides: HashMap<String, Option<String>>,
    assume_same_names: bool,
}

impl UserMapper {
    /// Builds the mapper from `(bitbucket, github)` override pairs. An
    /// empty GitHub name marks the user as suppressed. With
    /// `assume_same_names`, usernames without an override resolve to
    /// themselves.
    pub fn new(
        overrides: impl IntoIterator<Item = (String, String)>,
        assume_same_names: bool,
    ) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(source, dest)| {
                let dest = dest.trim().to_string();
                (source, (!dest.is_empty()).then_some(dest))
            })
            .collect();
        Self {
            overrides,
            assume_same_names,
        }
    }

    /// Resolves one source username.
    pub fn resolve(&self, source: &str) -> Resolution {
        match self.overrides.get(source) {
            Some(Some(dest)) => Resolution::Destination(dest.clone()),
            Some(None) => Resolution::Suppressed,
            None if self.assume_same_names => Resolution::Destination(source.to_string()),
            None => Resolution::Unknown,
        }
    }

    /// The GitHub username to assign an issue to, if any. Suppressed and
    /// unknown users leave the assignee unset.
    pub fn assignee_for(&self, source: &str) -> Option<String> {
        match self.resolve(source) {
            Resolution::Destination(dest) => Some(dest),
            Resolution::Suppressed | Resolution::Unknown => None,
        }
    }

    /// Whether a user's comments should carry no attribution annotation.
    pub fn is_suppressed(&self, source: &str) -> bool {
        self.resolve(source) == Resolution::Suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(assume_same_names: bool) -> UserMapper {
        UserMapper::new(
            [
                ("jsmith".to_string(), "john-smith".to_string()),
                ("migrationbot".to_string(), String::new()),
            ],
            assume_same_names,
        )
    }

    #[test]
    fn explicit_mapping_wins() {
        assert_eq!(
            mapper(false).resolve("jsmith"),
            Resolution::Destination("john-smith".into())
        );
    }

    #[test]
    fn empty_override_suppresses() {
        let m = mapper(false);
        assert_eq!(m.resolve("migrationbot"), Resolution::Suppressed);
        assert!(m.is_suppressed("migrationbot"));
        assert_eq!(m.assignee_for("migrationbot"), None);
    }

    #[test]
    fn unmapped_is_unknown_by_default() {
        let m = mapper(false);
        assert_eq!(m.resolve("stranger"), Resolution::Unknown);
        assert_eq!(m.assignee_for("stranger"), None);
    }

    #[test]
    fn same_name_assumption_falls_back() {
        let m = mapper(true);
        assert_eq!(
            m.resolve("stranger"),
            Resolution::Destination("stranger".into())
        );
        assert_eq!(m.assignee_for("stranger"), Some("stranger".into()));
        // Suppression is still honored.
        assert_eq!(m.resolve("migrationbot"), Resolution::Suppressed);
    }
}
