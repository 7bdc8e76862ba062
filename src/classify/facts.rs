use crate::github::types::{CiConclusion, PullRequestSnapshot};

/// The classification-relevant meaning of a label.
///
/// We usually do not care about precise label names, only their function;
/// several label names may map to the same flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactFlag {
    Wip,
    Blocked,
    MergeConflict,
    AwaitingCi,
    AwaitingAuthor,
    AwaitingDecision,
    HelpWanted,
    PleaseAdopt,
    Delegated,
    ReadyToMerge,
    AutoMergeAfterCi,
    MaintainerMerge,
}

/// Label name to fact flag, as a data table rather than a chain of
/// conditionals, so precedence changes stay auditable.
///
/// NB. Keep this in sync with the *current* label names on the host;
/// historical names only matter for replaying old event data.
pub const LABEL_RULES: &[(&str, FactFlag)] = &[
    ("WIP", FactFlag::Wip),
    ("blocked-by-other-PR", FactFlag::Blocked),
    ("blocked-by-core-PR", FactFlag::Blocked),
    ("blocked-by-batt-PR", FactFlag::Blocked),
    ("blocked-by-qq-PR", FactFlag::Blocked),
    ("merge-conflict", FactFlag::MergeConflict),
    ("awaiting-CI", FactFlag::AwaitingCi),
    ("awaiting-author", FactFlag::AwaitingAuthor),
    ("awaiting-zulip", FactFlag::AwaitingDecision),
    ("help-wanted", FactFlag::HelpWanted),
    ("please-adopt", FactFlag::PleaseAdopt),
    ("delegated", FactFlag::Delegated),
    ("ready-to-merge", FactFlag::ReadyToMerge),
    ("auto-merge-after-CI", FactFlag::AutoMergeAfterCi),
    ("maintainer-merge", FactFlag::MaintainerMerge),
];

/// Look up the fact flag for a label name. Labels without an entry
/// (topic labels, "easy", "new-contributor", ...) are irrelevant here.
pub fn flag_for_label(name: &str) -> Option<FactFlag> {
    LABEL_RULES
        .iter()
        .find(|(label, _)| *label == name)
        .map(|(_, flag)| *flag)
}

/// The flat record of named facts the classifier consumes.
///
/// Computed fresh per classification call from exactly one snapshot
/// (or one replayed accumulator state); never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Facts {
    pub blocked_by_other_pr: bool,
    pub ci_failing: bool,
    pub ci_running: bool,
    pub awaiting_ci: bool,
    pub awaiting_author: bool,
    pub awaiting_zulip_decision: bool,
    /// Set by the WIP label or by draft status; a draft PR is work in
    /// progress by definition.
    pub wip: bool,
    pub help_wanted: bool,
    pub please_adopt: bool,
    pub delegated: bool,
    pub ready_to_merge: bool,
    pub auto_merge_after_ci: bool,
    pub maintainer_merge: bool,
    pub from_fork: bool,
    pub has_merge_conflict: bool,
}

impl Facts {
    /// Apply one label-derived flag.
    pub fn set(&mut self, flag: FactFlag) {
        match flag {
            FactFlag::Wip => self.wip = true,
            FactFlag::Blocked => self.blocked_by_other_pr = true,
            FactFlag::MergeConflict => self.has_merge_conflict = true,
            FactFlag::AwaitingCi => self.awaiting_ci = true,
            FactFlag::AwaitingAuthor => self.awaiting_author = true,
            FactFlag::AwaitingDecision => self.awaiting_zulip_decision = true,
            FactFlag::HelpWanted => self.help_wanted = true,
            FactFlag::PleaseAdopt => self.please_adopt = true,
            FactFlag::Delegated => self.delegated = true,
            FactFlag::ReadyToMerge => self.ready_to_merge = true,
            FactFlag::AutoMergeAfterCi => self.auto_merge_after_ci = true,
            FactFlag::MaintainerMerge => self.maintainer_merge = true,
        }
    }

    /// Seed the CI, draft, fork and conflict facts that do not come
    /// from labels. Shared by the normalizer and the timeline replay.
    pub(crate) fn from_parts(ci: CiConclusion, draft: bool, fork: bool, conflict: bool) -> Self {
        Facts {
            ci_failing: ci == CiConclusion::Failure,
            ci_running: ci == CiConclusion::Running,
            awaiting_ci: ci == CiConclusion::None,
            wip: draft,
            from_fork: fork,
            has_merge_conflict: conflict,
            ..Facts::default()
        }
    }

    /// Names of all facts currently set, for display and debugging.
    pub fn active(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut push = |cond: bool, name: &'static str| {
            if cond {
                names.push(name);
            }
        };
        push(self.from_fork, "from-fork");
        push(self.ci_running, "ci-running");
        push(self.ci_failing, "ci-failing");
        push(self.wip, "wip");
        push(self.blocked_by_other_pr, "blocked-by-other-pr");
        push(self.has_merge_conflict, "merge-conflict");
        push(self.awaiting_ci, "awaiting-ci");
        push(self.awaiting_zulip_decision, "awaiting-decision");
        push(self.awaiting_author, "awaiting-author");
        push(self.help_wanted, "help-wanted");
        push(self.please_adopt, "please-adopt");
        push(self.ready_to_merge, "ready-to-merge");
        push(self.auto_merge_after_ci, "auto-merge-after-ci");
        push(self.maintainer_merge, "maintainer-merge");
        push(self.delegated, "delegated");
        names
    }
}

/// Derive the classifier's facts from one snapshot. Pure; a missing or
/// malformed field has already degraded to a conservative default during
/// deserialization, so this never fails.
pub fn normalize(snapshot: &PullRequestSnapshot) -> Facts {
    let mut facts = Facts::from_parts(
        snapshot.ci,
        snapshot.is_draft,
        snapshot.is_fork,
        snapshot.has_merge_conflict,
    );
    for label in &snapshot.labels {
        if let Some(flag) = flag_for_label(&label.name) {
            facts.set(flag);
        }
    }
    facts
}
