use chrono::{DateTime, Utc};

use super::event::{EventKind, PrEvent};
use crate::classify::{classify, flag_for_label, FactFlag, Facts, LifecycleState};
use crate::github::types::{CiConclusion, PullRequestSnapshot};

/// One stretch of a PR's lifetime spent in a single state. `end` is `None`
/// for the interval currently in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub state: LifecycleState,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Interval {
    /// Duration of this interval, counting an open interval up to `now`.
    pub fn duration_until(&self, now: DateTime<Utc>) -> chrono::Duration {
        (self.end.unwrap_or(now) - self.start).max(chrono::Duration::zero())
    }
}

/// The reconstructed state history of one pull request.
///
/// The intervals are contiguous, non-overlapping, and cover the PR's
/// lifetime from open to now (or to its close time) exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    pub intervals: Vec<Interval>,
    /// True when tracked history begins after the PR was created, so the
    /// earliest interval is a synthetic approximation rather than exact.
    pub approximate: bool,
}

impl Timeline {
    /// The interval currently in effect. Reconstruction always produces at
    /// least one interval, so this never panics.
    pub fn current(&self) -> &Interval {
        self.intervals.last().expect("timeline has >= 1 interval")
    }
}

/// Running accumulator for the replay: the observable state of a PR at one
/// historical instant. Labels form a multiset; a PR can legitimately carry
/// two labels mapping to the same flag, and removing one must not clear the
/// other.
#[derive(Debug, Clone)]
pub struct Seed {
    labels: Vec<FactFlag>,
    ci: CiConclusion,
    draft: bool,
    from_fork: bool,
    approximate: bool,
}

impl Seed {
    /// State at PR creation: no labels, CI not yet started.
    pub fn at_creation(draft: bool, from_fork: bool) -> Self {
        Self {
            labels: Vec::new(),
            ci: CiConclusion::None,
            draft,
            from_fork,
            approximate: false,
        }
    }

    /// Seed from the earliest known snapshot when event history only begins
    /// after the PR was created. The resulting timeline carries the
    /// `approximate` flag.
    pub fn from_snapshot(snapshot: &PullRequestSnapshot) -> Self {
        let labels = snapshot
            .labels
            .iter()
            .filter_map(|l| flag_for_label(&l.name))
            .collect();
        Self {
            labels,
            ci: snapshot.ci,
            draft: snapshot.is_draft,
            from_fork: snapshot.is_fork,
            approximate: true,
        }
    }

    /// Seed the replay start from a snapshot taken *after* the tracked
    /// events, by un-applying those events in reverse. The snapshot already
    /// reflects every tracked label change, so replaying on top of it
    /// directly would double-apply them.
    ///
    /// Label changes are invertible; CI and draft changes are not (the value
    /// before a change is not recorded), so those keep the snapshot's value
    /// until the first tracked change overwrites them. The resulting
    /// timeline carries the `approximate` flag either way.
    pub fn before_events(snapshot: &PullRequestSnapshot, events: &[PrEvent]) -> Self {
        let mut seed = Self::from_snapshot(snapshot);
        for event in events.iter().rev() {
            match &event.kind {
                EventKind::LabelAdded { name } => {
                    if let Some(flag) = flag_for_label(name) {
                        if let Some(pos) = seed.labels.iter().position(|f| *f == flag) {
                            seed.labels.remove(pos);
                        }
                    }
                }
                EventKind::LabelRemoved { name } => {
                    if let Some(flag) = flag_for_label(name) {
                        seed.labels.push(flag);
                    }
                }
                EventKind::CiChanged { .. }
                | EventKind::DraftChanged { .. }
                | EventKind::Opened
                | EventKind::Closed => {}
            }
        }
        seed
    }

    fn facts(&self) -> Facts {
        let mut facts = Facts::from_parts(self.ci, self.draft, self.from_fork, false);
        for flag in &self.labels {
            facts.set(*flag);
        }
        facts
    }

    fn apply(&mut self, kind: &EventKind) {
        match kind {
            EventKind::LabelAdded { name } => {
                if let Some(flag) = flag_for_label(name) {
                    self.labels.push(flag);
                }
            }
            EventKind::LabelRemoved { name } => {
                // Remove one occurrence only; the label may be gone already
                // when history is incomplete.
                if let Some(flag) = flag_for_label(name) {
                    if let Some(pos) = self.labels.iter().position(|f| *f == flag) {
                        self.labels.remove(pos);
                    }
                }
            }
            EventKind::CiChanged { conclusion } => self.ci = *conclusion,
            EventKind::DraftChanged { draft } => self.draft = *draft,
            // Opened is informational; Closed is handled by the replay loop.
            EventKind::Opened | EventKind::Closed => {}
        }
    }
}

/// Replay a PR's event history into a sequence of state intervals covering
/// `[opened_at, now]` (or up to the close event, for closed PRs).
///
/// Events are sorted by `(at, seq)` first; same-timestamp events apply in
/// ingestion order, and a state that holds for zero time is coalesced into
/// its predecessor rather than emitted. Reconstruction is a pure fold over
/// the accumulator, so replaying the same inputs yields the same intervals.
pub fn reconstruct(
    opened_at: DateTime<Utc>,
    seed: Seed,
    events: &[PrEvent],
    now: DateTime<Utc>,
) -> Timeline {
    let now = now.max(opened_at);
    let mut ordered: Vec<&PrEvent> = events.iter().filter(|e| e.at <= now).collect();
    ordered.sort_by_key(|e| (e.at, e.seq));

    let approximate = seed.approximate;
    let mut acc = seed;
    let mut intervals: Vec<Interval> = Vec::new();
    let mut open_state = classify(&acc.facts());
    let mut open_start = opened_at;
    let mut closed_at = None;

    for event in ordered {
        // Events predating the open time collapse into the initial state.
        let at = event.at.max(opened_at);
        if let EventKind::Closed = event.kind {
            closed_at = Some(at);
            break;
        }
        acc.apply(&event.kind);
        let state = classify(&acc.facts());
        if state != open_state {
            if at > open_start {
                intervals.push(Interval {
                    state: open_state,
                    start: open_start,
                    end: Some(at),
                });
                open_start = at;
            }
            open_state = state;
            // A same-instant revert recreates the predecessor's state; merge
            // back into it instead of emitting two adjacent equal intervals.
            let reverted = intervals
                .last()
                .is_some_and(|last| last.state == open_state && last.end == Some(open_start));
            if reverted {
                if let Some(prev) = intervals.pop() {
                    open_start = prev.start;
                }
            }
        }
    }

    // A state change at the close instant would leave a zero-length final
    // interval; its predecessor already ends at the close time, so it is
    // dropped rather than emitted.
    let zero_length_tail = closed_at == Some(open_start) && !intervals.is_empty();
    if !zero_length_tail {
        intervals.push(Interval {
            state: open_state,
            start: open_start,
            end: closed_at,
        });
    }
    Timeline {
        intervals,
        approximate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::event::assign_seq;
    use chrono::{Duration, TimeZone};

    fn sep(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, day, 0, 0, 0).unwrap()
    }

    fn replay(events: Vec<PrEvent>, now: DateTime<Utc>) -> Timeline {
        let mut events = events;
        assign_seq(&mut events);
        reconstruct(sep(1), Seed::at_creation(false, false), &events, now)
    }

    /// The intervals must partition `[opened_at, now]`: contiguous,
    /// non-overlapping, first starts at open, last is open-ended (or capped
    /// at the close time).
    fn assert_partition(timeline: &Timeline, opened_at: DateTime<Utc>) {
        assert!(!timeline.intervals.is_empty());
        assert_eq!(timeline.intervals[0].start, opened_at);
        for pair in timeline.intervals.windows(2) {
            assert_eq!(pair[0].end, Some(pair[1].start));
            assert!(pair[0].start < pair[1].start, "zero-length interval emitted");
            assert_ne!(pair[0].state, pair[1].state, "adjacent intervals share a state");
        }
    }

    #[test]
    fn test_no_events_yields_single_awaiting_ci_interval() {
        let timeline = replay(vec![], sep(10));
        assert_eq!(timeline.intervals.len(), 1);
        assert_eq!(timeline.current().state, LifecycleState::AwaitingCi);
        assert_eq!(timeline.current().end, None);
        assert_partition(&timeline, sep(1));
    }

    #[test]
    fn test_wip_then_ci_success_produces_three_intervals() {
        // Opened with WIP; label removed three days in; CI concludes a day
        // later. NotReady -> AwaitingCi -> ReadyForReview.
        let events = vec![
            PrEvent::add_label(sep(1), "WIP"),
            PrEvent::remove_label(sep(4), "WIP"),
            PrEvent::ci_changed(sep(5), CiConclusion::Success),
        ];
        let timeline = replay(events, sep(10));
        assert_partition(&timeline, sep(1));
        let states: Vec<_> = timeline.intervals.iter().map(|i| i.state).collect();
        assert_eq!(
            states,
            vec![
                LifecycleState::NotReady,
                LifecycleState::AwaitingCi,
                LifecycleState::ReadyForReview,
            ]
        );
        assert_eq!(timeline.intervals[0].end, Some(sep(4)));
        assert_eq!(timeline.intervals[1].end, Some(sep(5)));
        assert_eq!(timeline.intervals[2].end, None);
    }

    #[test]
    fn test_same_timestamp_events_do_not_emit_zero_length_intervals() {
        // Label churn at one instant: only the settled state survives.
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(3), "awaiting-author"),
            PrEvent::remove_label(sep(3), "awaiting-author"),
            PrEvent::add_label(sep(3), "awaiting-zulip"),
        ];
        let timeline = replay(events, sep(10));
        assert_partition(&timeline, sep(1));
        let states: Vec<_> = timeline.intervals.iter().map(|i| i.state).collect();
        assert_eq!(
            states,
            vec![
                LifecycleState::ReadyForReview,
                LifecycleState::AwaitingDecision,
            ]
        );
    }

    #[test]
    fn test_same_instant_revert_merges_into_predecessor() {
        // The state leaves ReadyForReview and returns to it at one instant;
        // the timeline must stay a single interval.
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(3), "awaiting-author"),
            PrEvent::remove_label(sep(3), "awaiting-author"),
        ];
        let timeline = replay(events, sep(10));
        assert_partition(&timeline, sep(1));
        assert_eq!(timeline.intervals.len(), 1);
        assert_eq!(timeline.current().state, LifecycleState::ReadyForReview);
    }

    #[test]
    fn test_add_remove_same_label_is_a_no_op() {
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(3), "WIP"),
            PrEvent::remove_label(sep(3), "WIP"),
        ];
        let timeline = replay(events, sep(10));
        assert_eq!(timeline.intervals.len(), 1);
        assert_eq!(timeline.current().state, LifecycleState::ReadyForReview);
    }

    #[test]
    fn test_duplicate_flag_labels_are_a_multiset() {
        // Two blocking labels; removing one must keep the PR blocked.
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(1), "blocked-by-other-PR"),
            PrEvent::add_label(sep(2), "blocked-by-core-PR"),
            PrEvent::remove_label(sep(5), "blocked-by-other-PR"),
        ];
        let timeline = replay(events, sep(10));
        assert_eq!(timeline.current().state, LifecycleState::Blocked);
    }

    #[test]
    fn test_irrelevant_labels_never_change_state() {
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(2), "t-data"),
            PrEvent::add_label(sep(3), "new-contributor"),
            PrEvent::remove_label(sep(4), "t-data"),
        ];
        let timeline = replay(events, sep(10));
        assert_eq!(timeline.intervals.len(), 1);
        assert_eq!(timeline.current().state, LifecycleState::ReadyForReview);
    }

    #[test]
    fn test_draft_toggles() {
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::draft(sep(3)),
            PrEvent::undraft(sep(6)),
        ];
        let timeline = replay(events, sep(10));
        assert_partition(&timeline, sep(1));
        let states: Vec<_> = timeline.intervals.iter().map(|i| i.state).collect();
        assert_eq!(
            states,
            vec![
                LifecycleState::ReadyForReview,
                LifecycleState::NotReady,
                LifecycleState::ReadyForReview,
            ]
        );
    }

    #[test]
    fn test_closed_event_caps_final_interval() {
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::closed(sep(7)),
        ];
        let timeline = replay(events, sep(10));
        assert_eq!(timeline.intervals.len(), 1);
        assert_eq!(timeline.current().end, Some(sep(7)));
    }

    #[test]
    fn test_close_at_state_change_instant_emits_no_zero_length_interval() {
        // The label lands at the same instant the PR closes: the new state
        // held for zero time, so only the capped predecessor survives.
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(5), "awaiting-author"),
            PrEvent::closed(sep(5)),
        ];
        let timeline = replay(events, sep(10));
        assert_eq!(timeline.intervals.len(), 1);
        assert_eq!(timeline.current().state, LifecycleState::ReadyForReview);
        assert_eq!(timeline.current().end, Some(sep(5)));
        for interval in &timeline.intervals {
            assert_ne!(interval.end, Some(interval.start), "zero-length interval emitted");
        }
    }

    #[test]
    fn test_events_after_now_are_ignored() {
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(9), "WIP"),
        ];
        let timeline = replay(events, sep(5));
        assert_eq!(timeline.intervals.len(), 1);
        assert_eq!(timeline.current().state, LifecycleState::ReadyForReview);
    }

    #[test]
    fn test_unsorted_input_is_replayed_in_timestamp_order() {
        let mut events = vec![
            PrEvent::remove_label(sep(6), "WIP"),
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(2), "WIP"),
        ];
        assign_seq(&mut events);
        let timeline = reconstruct(sep(1), Seed::at_creation(false, false), &events, sep(10));
        assert_partition(&timeline, sep(1));
        let states: Vec<_> = timeline.intervals.iter().map(|i| i.state).collect();
        assert_eq!(
            states,
            vec![
                LifecycleState::ReadyForReview,
                LifecycleState::NotReady,
                LifecycleState::ReadyForReview,
            ]
        );
    }

    #[test]
    fn test_seed_from_snapshot_marks_timeline_approximate() {
        use crate::github::types::{Label, PullRequestSnapshot};
        let snapshot = PullRequestSnapshot {
            number: 1,
            author: "octocat".to_string(),
            title: String::new(),
            labels: vec![Label::new("awaiting-author")],
            ci: CiConclusion::Success,
            is_draft: false,
            is_fork: false,
            has_merge_conflict: false,
            assignee: "nobody".to_string(),
            approvals: vec![],
            participants: vec![],
            additions: 0,
            deletions: 0,
            changed_files: 0,
            last_updated_at: sep(5),
        };
        let timeline = reconstruct(sep(1), Seed::from_snapshot(&snapshot), &[], sep(10));
        assert!(timeline.approximate);
        assert_eq!(timeline.current().state, LifecycleState::AwaitingAuthor);
    }

    #[test]
    fn test_snapshot_seed_does_not_double_apply_tracked_events() {
        use crate::github::types::{Label, PullRequestSnapshot};
        // The snapshot postdates the tracked window, so it already carries
        // the label from the final add. Replaying the tracked events must
        // still see the interior removal: [sep 7, sep 8] is ready for
        // review, not swallowed by a phantom copy from the seed.
        let snapshot = PullRequestSnapshot {
            number: 1,
            author: "octocat".to_string(),
            title: String::new(),
            labels: vec![Label::new("awaiting-author")],
            ci: CiConclusion::Success,
            is_draft: false,
            is_fork: false,
            has_merge_conflict: false,
            assignee: "nobody".to_string(),
            approvals: vec![],
            participants: vec![],
            additions: 0,
            deletions: 0,
            changed_files: 0,
            last_updated_at: sep(10),
        };
        let mut events = vec![
            PrEvent::add_label(sep(6), "awaiting-author"),
            PrEvent::remove_label(sep(7), "awaiting-author"),
            PrEvent::add_label(sep(8), "awaiting-author"),
        ];
        assign_seq(&mut events);
        let seed = Seed::before_events(&snapshot, &events);
        let timeline = reconstruct(sep(1), seed, &events, sep(10));
        assert!(timeline.approximate);
        assert_partition(&timeline, sep(1));
        let states: Vec<_> = timeline.intervals.iter().map(|i| i.state).collect();
        assert_eq!(
            states,
            vec![
                LifecycleState::ReadyForReview,
                LifecycleState::AwaitingAuthor,
                LifecycleState::ReadyForReview,
                LifecycleState::AwaitingAuthor,
            ]
        );
        assert_eq!(timeline.intervals[2].start, sep(7));
        assert_eq!(timeline.intervals[2].end, Some(sep(8)));
    }

    #[test]
    fn test_reconstruction_is_idempotent() {
        let mut events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(2), "WIP"),
            PrEvent::remove_label(sep(4), "WIP"),
            PrEvent::add_label(sep(4), "awaiting-author"),
        ];
        assign_seq(&mut events);
        let a = reconstruct(sep(1), Seed::at_creation(false, false), &events, sep(10));
        let b = reconstruct(sep(1), Seed::at_creation(false, false), &events, sep(10));
        assert_eq!(a, b);
    }

    #[test]
    fn test_created_as_draft() {
        let mut events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::undraft(sep(5)),
        ];
        assign_seq(&mut events);
        let timeline = reconstruct(sep(1), Seed::at_creation(true, false), &events, sep(10));
        let states: Vec<_> = timeline.intervals.iter().map(|i| i.state).collect();
        assert_eq!(
            states,
            vec![LifecycleState::NotReady, LifecycleState::ReadyForReview]
        );
    }

    #[test]
    fn test_fork_seed_pins_state_for_whole_lifetime() {
        let events = vec![
            PrEvent::ci_changed(sep(1), CiConclusion::Success),
            PrEvent::add_label(sep(3), "ready-to-merge"),
        ];
        let mut events = events;
        assign_seq(&mut events);
        let timeline = reconstruct(sep(1), Seed::at_creation(false, true), &events, sep(10));
        assert_eq!(timeline.intervals.len(), 1);
        assert_eq!(timeline.current().state, LifecycleState::FromFork);
    }
}
