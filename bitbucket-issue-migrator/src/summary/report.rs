//! Run report types.

use super::outcome::IssueOutcome;

/// Summary of a complete migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Issue count advertised by the source tracker. Progress hint only;
    /// deletions make it unreliable.
    pub total_advertised: Option<u64>,

    /// Number of issues imported on the destination.
    pub submitted: usize,

    /// Number of issues skipped (offset or dry run).
    pub skipped: usize,

    /// Number of issues whose submission failed.
    pub failed: usize,

    /// Per-issue outcomes in processing order.
    pub outcomes: Vec<IssueOutcome>,

    /// Whether this was a dry run.
    pub dry_run: bool,

    /// Set when a fatal source error stopped the run early; outcomes
    /// recorded up to that point are preserved.
    pub aborted: Option<String>,
}

impl MigrationReport {
    /// Creates a new empty report.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Records one outcome and updates the counters.
    pub fn record(&mut self, outcome: IssueOutcome) {
        match &outcome {
            IssueOutcome::Submitted { .. } => self.submitted += 1,
            IssueOutcome::Skipped { .. } => self.skipped += 1,
            IssueOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Returns true if any per-issue failures occurred.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Returns true if the run finished without failures or an abort.
    #[must_use]
    pub fn all_success(&self) -> bool {
        self.failed == 0 && self.aborted.is_none()
    }

    /// The failed outcomes, in processing order.
    pub fn failures(&self) -> impl Iterator<Item = &IssueOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, IssueOutcome::Failed { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_outcomes() {
        let mut report = MigrationReport::new(false);
        report.record(IssueOutcome::Submitted {
            source_id: 1,
            destination_number: Some(1),
        });
        report.record(IssueOutcome::Skipped {
            source_id: 2,
            reason: "skipped by offset".into(),
        });
        report.record(IssueOutcome::Failed {
            source_id: 3,
            error: "boom".into(),
        });

        assert_eq!(report.submitted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 1);
        assert!(report.has_failures());
        assert!(!report.all_success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.outcomes.len(), 3);
    }

    #[test]
    fn abort_spoils_success_without_failures() {
        let mut report = MigrationReport::new(false);
        report.record(IssueOutcome::Submitted {
            source_id: 1,
            destination_number: None,
        });
        report.aborted = Some("repository vanished".into());

        assert!(!report.has_failures());
        assert!(!report.all_success());
        // Earlier outcomes survive the abort.
        assert_eq!(report.submitted, 1);
    }
}
