use chrono::{DateTime, Duration, Utc};

use super::reconstruct::Timeline;
use crate::classify::LifecycleState;

/// Scalar metrics reduced from one PR's interval sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewMetrics {
    /// Total wall-clock time spent in review-eligible states across the
    /// whole lifetime; reopening into review counts again.
    pub total_review_time: Duration,
    /// Time since the start of the interval currently in effect.
    pub time_since_last_change: Duration,
    pub current_state: LifecycleState,
}

/// Reduce an interval sequence into aggregate metrics. A PR with no
/// review-eligible interval yet has a total of zero, not an error.
pub fn aggregate(timeline: &Timeline, now: DateTime<Utc>) -> ReviewMetrics {
    let total_review_time = timeline
        .intervals
        .iter()
        .filter(|i| i.state.is_review_eligible())
        .fold(Duration::zero(), |acc, i| acc + i.duration_until(now));
    let current = timeline.current();
    ReviewMetrics {
        total_review_time,
        time_since_last_change: (now - current.start).max(Duration::zero()),
        current_state: current.state,
    }
}

/// When this PR first became ready for review, if it ever did.
/// Zero-length ready stretches were coalesced away during reconstruction,
/// so a PR labelled at creation time does not count as ever having been
/// on the queue.
pub fn first_ready_for_review(timeline: &Timeline) -> Option<DateTime<Utc>> {
    timeline
        .intervals
        .iter()
        .find(|i| i.state.is_review_eligible())
        .map(|i| i.start)
}
