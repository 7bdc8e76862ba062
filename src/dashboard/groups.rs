use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::classify::{classify, normalize, Facts, LifecycleState};
use crate::github::types::PullRequestSnapshot;
use crate::timeline::ReviewMetrics;

/// Staleness thresholds used by the "stale ..." dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub stale_queue: Duration,
    pub stale_ready_to_merge: Duration,
    pub stale_delegated: Duration,
    pub stale_maintainer_merge: Duration,
    pub stale_new_contributor: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            stale_queue: Duration::days(14),
            stale_ready_to_merge: Duration::hours(24),
            stale_delegated: Duration::hours(24),
            stale_maintainer_merge: Duration::hours(24),
            stale_new_contributor: Duration::days(7),
        }
    }
}

/// One pull request after classification: the snapshot it came from, the
/// facts that produced the verdict, the verdict itself, and (when event
/// history was available) the reconstructed review-time metrics.
#[derive(Debug, Clone)]
pub struct ClassifiedPr {
    pub snapshot: PullRequestSnapshot,
    pub facts: Facts,
    pub state: LifecycleState,
    pub metrics: Option<ReviewMetrics>,
}

impl ClassifiedPr {
    pub fn from_snapshot(mut snapshot: PullRequestSnapshot) -> Self {
        snapshot.dedup_labels();
        let facts = normalize(&snapshot);
        let state = classify(&facts);
        Self {
            snapshot,
            facts,
            state,
            metrics: None,
        }
    }

    /// A PR whose record could not be normalized: reported, never omitted.
    pub fn unknown(number: u64, as_of: DateTime<Utc>) -> Self {
        Self {
            snapshot: PullRequestSnapshot::placeholder(number, as_of),
            facts: Facts::default(),
            state: LifecycleState::Unknown,
            metrics: None,
        }
    }

    pub fn number(&self) -> u64 {
        self.snapshot.number
    }

    /// Time since the last meaningful change: the reconstructed state-change
    /// time when history is available, the host's "last updated" timestamp
    /// as a cruder fallback otherwise.
    pub fn staleness(&self, as_of: DateTime<Utc>) -> Duration {
        match &self.metrics {
            Some(m) => m.time_since_last_change,
            None => (as_of - self.snapshot.last_updated_at).max(Duration::zero()),
        }
    }
}

/// The dashboards on the generated triage page, listed in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dashboard {
    Queue,
    QueueEasy,
    QueueNewContributor,
    QueueStaleUnassigned,
    QueueStaleAssigned,
    NeedsMerge,
    NeedsDecision,
    NeedsHelp,
    AllReadyToMerge,
    StaleReadyToMerge,
    StaleDelegated,
    StaleMaintainerMerge,
    StaleNewContributor,
    FromFork,
    Approved,
    Unknown,
}

impl Dashboard {
    pub const ALL: &'static [Dashboard] = &[
        Dashboard::Queue,
        Dashboard::QueueEasy,
        Dashboard::QueueNewContributor,
        Dashboard::QueueStaleUnassigned,
        Dashboard::QueueStaleAssigned,
        Dashboard::NeedsMerge,
        Dashboard::NeedsDecision,
        Dashboard::NeedsHelp,
        Dashboard::AllReadyToMerge,
        Dashboard::StaleReadyToMerge,
        Dashboard::StaleDelegated,
        Dashboard::StaleMaintainerMerge,
        Dashboard::StaleNewContributor,
        Dashboard::FromFork,
        Dashboard::Approved,
        Dashboard::Unknown,
    ];

    /// HTML anchor id for the table rendering this dashboard.
    pub fn anchor(&self) -> &'static str {
        match self {
            Dashboard::Queue => "queue",
            Dashboard::QueueEasy => "queue-easy",
            Dashboard::QueueNewContributor => "queue-new-contributors",
            Dashboard::QueueStaleUnassigned => "queue-stale-unassigned",
            Dashboard::QueueStaleAssigned => "queue-stale-assigned",
            Dashboard::NeedsMerge => "needs-merge",
            Dashboard::NeedsDecision => "needs-decision",
            Dashboard::NeedsHelp => "needs-help",
            Dashboard::AllReadyToMerge => "all-ready-to-merge",
            Dashboard::StaleReadyToMerge => "stale-ready-to-merge",
            Dashboard::StaleDelegated => "stale-delegated",
            Dashboard::StaleMaintainerMerge => "stale-maintainer-merge",
            Dashboard::StaleNewContributor => "stale-new-contributor",
            Dashboard::FromFork => "from-fork",
            Dashboard::Approved => "approved",
            Dashboard::Unknown => "unknown",
        }
    }

    /// Describe what this table contains, for headings and for a
    /// "there are no such PRs" message.
    pub fn short_description(&self) -> &'static str {
        match self {
            Dashboard::Queue => "PRs on the review queue",
            Dashboard::QueueEasy => "PRs on the review queue labelled 'easy'",
            Dashboard::QueueNewContributor => "new contributors' PRs on the review queue",
            Dashboard::QueueStaleUnassigned => {
                "unassigned PRs on the review queue without activity in the past two weeks"
            }
            Dashboard::QueueStaleAssigned => {
                "assigned PRs on the review queue without activity in the past two weeks"
            }
            Dashboard::NeedsMerge => "PRs which just have a merge conflict",
            Dashboard::NeedsDecision => "PRs blocked on a zulip discussion or similar",
            Dashboard::NeedsHelp => "PRs looking for help",
            Dashboard::AllReadyToMerge => "all PRs sent to the merge queue",
            Dashboard::StaleReadyToMerge => "stale PRs sent to the merge queue",
            Dashboard::StaleDelegated => "stale delegated PRs",
            Dashboard::StaleMaintainerMerge => "stale maintainer-merge'd PRs",
            Dashboard::StaleNewContributor => "stale PRs by new contributors",
            Dashboard::FromFork => "PRs opened from a fork",
            Dashboard::Approved => "PRs with an 'approved' review",
            Dashboard::Unknown => "PRs whose data could not be read",
        }
    }

    /// Membership predicate, evaluated independently per PR on every pass.
    /// A PR may satisfy several dashboards; forked PRs satisfy none of the
    /// queue predicates because they can never classify as ready for review.
    pub fn contains(&self, pr: &ClassifiedPr, as_of: DateTime<Utc>, thresholds: &Thresholds) -> bool {
        let on_queue = pr.state == LifecycleState::ReadyForReview;
        match self {
            Dashboard::Queue => on_queue,
            Dashboard::QueueEasy => on_queue && pr.snapshot.has_label("easy"),
            Dashboard::QueueNewContributor => on_queue && pr.snapshot.has_label("new-contributor"),
            Dashboard::QueueStaleUnassigned => {
                on_queue
                    && !pr.snapshot.has_assignee()
                    && pr.staleness(as_of) > thresholds.stale_queue
            }
            Dashboard::QueueStaleAssigned => {
                on_queue
                    && pr.snapshot.has_assignee()
                    && pr.staleness(as_of) > thresholds.stale_queue
            }
            Dashboard::NeedsMerge => pr.state == LifecycleState::MergeConflict,
            Dashboard::NeedsDecision => pr.state == LifecycleState::AwaitingDecision,
            Dashboard::NeedsHelp => matches!(
                pr.state,
                LifecycleState::HelpWanted | LifecycleState::PleaseAdopt
            ),
            Dashboard::AllReadyToMerge => matches!(
                pr.state,
                LifecycleState::ReadyToMerge | LifecycleState::AutoMergeAfterCi
            ),
            Dashboard::StaleReadyToMerge => {
                Dashboard::AllReadyToMerge.contains(pr, as_of, thresholds)
                    && pr.staleness(as_of) > thresholds.stale_ready_to_merge
            }
            Dashboard::StaleDelegated => {
                pr.state == LifecycleState::Delegated
                    && pr.staleness(as_of) > thresholds.stale_delegated
            }
            Dashboard::StaleMaintainerMerge => {
                pr.state == LifecycleState::MaintainerMerge
                    && pr.staleness(as_of) > thresholds.stale_maintainer_merge
            }
            Dashboard::StaleNewContributor => {
                pr.snapshot.has_label("new-contributor")
                    && pr.state != LifecycleState::FromFork
                    && pr.state != LifecycleState::Unknown
                    && pr.staleness(as_of) > thresholds.stale_new_contributor
            }
            Dashboard::FromFork => pr.state == LifecycleState::FromFork,
            Dashboard::Approved => {
                !pr.snapshot.approvals.is_empty()
                    && pr.state != LifecycleState::FromFork
                    && pr.state != LifecycleState::Unknown
            }
            Dashboard::Unknown => pr.state == LifecycleState::Unknown,
        }
    }
}

/// Partition classified PRs into dashboards. Recomputed fresh on every
/// pass, never updated incrementally, so there is no staleness to carry
/// over between runs. PR numbers in each group are sorted ascending.
pub fn group(
    prs: &[ClassifiedPr],
    as_of: DateTime<Utc>,
    thresholds: &Thresholds,
) -> BTreeMap<Dashboard, Vec<u64>> {
    let mut groups = BTreeMap::new();
    for dashboard in Dashboard::ALL {
        let mut numbers: Vec<u64> = prs
            .iter()
            .filter(|pr| dashboard.contains(pr, as_of, thresholds))
            .map(|pr| pr.number())
            .collect();
        numbers.sort_unstable();
        groups.insert(*dashboard, numbers);
    }
    groups
}
