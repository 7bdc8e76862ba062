use super::facts::Facts;

/// The lifecycle state of a pull request. Exactly one holds per snapshot;
/// the precedence ladder in [`classify`] makes the variants mutually
/// exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Opened from a fork: cannot run full CI, reported for visibility only.
    FromFork,
    /// CI is currently running; transient.
    CiRunning,
    /// CI failing, marked draft, or labelled WIP.
    NotReady,
    /// Blocked on another PR.
    Blocked,
    /// Has a merge conflict; resolution is mechanical, not review-dependent,
    /// hence reported separately from `Blocked`.
    MergeConflict,
    /// CI has not started yet.
    AwaitingCi,
    /// Review comments to process: different from "not ready".
    AwaitingAuthor,
    /// Blocked on a zulip discussion or similar.
    AwaitingDecision,
    HelpWanted,
    PleaseAdopt,
    /// CI passes, nothing blocks it: on the review queue.
    ReadyForReview,
    /// Delegated to the author for the final merge.
    Delegated,
    AutoMergeAfterCi,
    /// Approved by a maintainer, waiting for a final sign-off.
    MaintainerMerge,
    /// Sent to the merge queue.
    ReadyToMerge,
    /// The snapshot data could not be normalized at all. Never produced by
    /// [`classify`]; used by callers so dashboards do not drop such PRs.
    Unknown,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::FromFork => "from-fork",
            LifecycleState::CiRunning => "ci-running",
            LifecycleState::NotReady => "not-ready",
            LifecycleState::Blocked => "blocked",
            LifecycleState::MergeConflict => "merge-conflict",
            LifecycleState::AwaitingCi => "awaiting-ci",
            LifecycleState::AwaitingAuthor => "awaiting-author",
            LifecycleState::AwaitingDecision => "awaiting-decision",
            LifecycleState::HelpWanted => "help-wanted",
            LifecycleState::PleaseAdopt => "please-adopt",
            LifecycleState::ReadyForReview => "ready-for-review",
            LifecycleState::Delegated => "delegated",
            LifecycleState::AutoMergeAfterCi => "auto-merge-after-ci",
            LifecycleState::MaintainerMerge => "maintainer-merge",
            LifecycleState::ReadyToMerge => "ready-to-merge",
            LifecycleState::Unknown => "unknown",
        }
    }

    /// States that count towards total time in review. The "accepted,
    /// pending mechanics" states are deliberately excluded.
    pub fn is_review_eligible(&self) -> bool {
        matches!(self, LifecycleState::ReadyForReview)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Determine a PR's lifecycle state from its facts.
///
/// Total and deterministic. Each rule short-circuits all later ones; the
/// order is load-bearing and must not be rearranged:
/// 1. fork and unsettled CI make review categorically impossible or premature,
/// 2. explicit blockers requiring external action come next,
/// 3. "accepted, pending mechanics" states are checked only once nothing
///    blocks them.
///
/// In particular, an open decision outranks `awaiting_author` even when both
/// flags are set: the two are not a contradiction, and the decision is the
/// higher-priority blocker. This ordering is an explicit product decision
/// carried over from the host project, not derived from data.
pub fn classify(facts: &Facts) -> LifecycleState {
    if facts.from_fork {
        LifecycleState::FromFork
    } else if facts.ci_running {
        // Running CI removes a PR from the queue even if it would otherwise
        // qualify, so we never flag a PR as reviewable moments before a
        // likely CI failure.
        LifecycleState::CiRunning
    } else if facts.ci_failing || facts.wip {
        LifecycleState::NotReady
    } else if facts.blocked_by_other_pr {
        LifecycleState::Blocked
    } else if facts.has_merge_conflict {
        LifecycleState::MergeConflict
    } else if facts.awaiting_ci {
        LifecycleState::AwaitingCi
    } else if facts.awaiting_zulip_decision {
        LifecycleState::AwaitingDecision
    } else if facts.awaiting_author {
        LifecycleState::AwaitingAuthor
    } else if facts.help_wanted {
        LifecycleState::HelpWanted
    } else if facts.please_adopt {
        LifecycleState::PleaseAdopt
    } else if facts.ready_to_merge {
        LifecycleState::ReadyToMerge
    } else if facts.auto_merge_after_ci {
        LifecycleState::AutoMergeAfterCi
    } else if facts.maintainer_merge {
        LifecycleState::MaintainerMerge
    } else if facts.delegated {
        LifecycleState::Delegated
    } else {
        LifecycleState::ReadyForReview
    }
}
