//! Local rate limiting for the destination's import endpoint.
//!
//! GitHub throttles content-creating requests well below the headline API
//! limit, so the submitter keeps its own rolling-window budget instead of
//! waiting for 429s. One budget is owned per run context, not process-wide,
//! so migrations running side by side in one process stay isolated.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Default submissions allowed per rolling window. Deliberately below
/// GitHub's documented secondary limit for content creation.
pub const DEFAULT_MAX_PER_WINDOW: usize = 20;

/// Default rolling window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// A rolling-window token budget.
///
/// [`acquire`](Self::acquire) is the pipeline's only intentional
/// suspension point besides network I/O itself.
pub struct SubmissionBudget {
    max_per_window: usize,
    window: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl SubmissionBudget {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            // A zero budget would deadlock the first acquire.
            max_per_window: max_per_window.max(1),
            window,
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Blocks until a submission slot is free within the rolling window,
    /// then consumes it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.stamps.lock().await;
                let now = Instant::now();
                while stamps
                    .front()
                    .is_some_and(|&front| now.duration_since(front) >= self.window)
                {
                    stamps.pop_front();
                }

                if stamps.len() < self.max_per_window {
                    stamps.push_back(now);
                    return;
                }

                // Oldest in-window stamp decides when the next slot opens.
                // Lock is dropped before sleeping.
                match stamps.front() {
                    Some(&front) => (front + self.window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };

            debug!(wait_ms = wait.as_millis() as u64, "Submission budget exhausted, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}

impl Default for SubmissionBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_WINDOW, DEFAULT_WINDOW)
    }
}
