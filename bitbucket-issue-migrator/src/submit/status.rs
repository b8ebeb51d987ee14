//! Import job state machine.

use serde::Serialize;

/// Lifecycle of one issue's trip through the import endpoint.
///
/// `Done` and `Failed` are terminal: [`advance`](Self::advance) refuses
/// to move out of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImportState {
    /// Payload built, nothing sent yet.
    Pending,

    /// Accepted by the import endpoint, job running.
    Importing {
        /// Job id assigned by the destination.
        job_id: u64,
    },

    /// Import finished.
    Done {
        /// Destination issue number, when the job reported one.
        issue_number: Option<u64>,
    },

    /// Import failed for good.
    Failed {
        /// Human-readable cause.
        error: String,
    },
}

impl ImportState {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. })
    }

    /// Moves to `next` unless this state is terminal, in which case the
    /// terminal state is kept.
    #[must_use]
    pub fn advance(self, next: ImportState) -> ImportState {
        if self.is_terminal() {
            self
        } else {
            next
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_and_importing_advance() {
        let state = ImportState::Pending.advance(ImportState::Importing { job_id: 3 });
        assert_eq!(state, ImportState::Importing { job_id: 3 });

        let state = state.advance(ImportState::Done {
            issue_number: Some(12),
        });
        assert_eq!(
            state,
            ImportState::Done {
                issue_number: Some(12)
            }
        );
    }

    #[test]
    fn terminal_states_absorb_transitions() {
        let done = ImportState::Done { issue_number: None };
        let after = done.clone().advance(ImportState::Failed {
            error: "late".into(),
        });
        assert_eq!(after, done);

        let failed = ImportState::Failed {
            error: "boom".into(),
        };
        let after = failed.clone().advance(ImportState::Done {
            issue_number: Some(1),
        });
        assert_eq!(after, failed);
    }

    #[test]
    fn terminality() {
        assert!(!ImportState::Pending.is_terminal());
        assert!(!ImportState::Importing { job_id: 1 }.is_terminal());
        assert!(ImportState::Done { issue_number: None }.is_terminal());
        assert!(ImportState::Failed { error: String::new() }.is_terminal());
    }
}
