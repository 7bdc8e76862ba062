use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::types::PullRequestSnapshot;
use crate::timeline::{assign_seq, PrEvent, Seed};

/// The staged JSON cache written by the polling scripts. This module only
/// ever reads it; concurrent classification runs must not race with
/// re-downloads, so no write path exists here.
///
/// Layout under the data directory:
///   open-prs.json      array of snapshot records
///   events/<n>.json    per-PR event history, present only for tracked PRs
pub const SNAPSHOT_FILE: &str = "open-prs.json";
pub const EVENTS_DIR: &str = "events";

/// One element of the snapshot file. A record that cannot be parsed is
/// carried along as `Malformed` so the PR is reported as unknown instead
/// of silently vanishing from the dashboards.
#[derive(Debug, Clone)]
pub enum LoadedPr {
    Parsed(PullRequestSnapshot),
    Malformed { number: u64 },
}

/// Load the snapshot file, isolating per-PR failures: one bad record never
/// prevents classifying the rest of the batch. Records without even a
/// readable PR number are skipped with a warning, as there is nothing left
/// to report them under.
pub fn load_snapshots(data_dir: &Path) -> Result<Vec<LoadedPr>> {
    let path = data_dir.join(SNAPSHOT_FILE);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read snapshot file at {}", path.display()))?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("snapshot file {} is not a JSON array", path.display()))?;

    let mut prs = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<PullRequestSnapshot>(record.clone()) {
            Ok(snapshot) => prs.push(LoadedPr::Parsed(snapshot)),
            Err(e) => match record.get("number").and_then(|n| n.as_u64()) {
                Some(number) => {
                    eprintln!("warning: unreadable record for PR {}: {}", number, e);
                    prs.push(LoadedPr::Malformed { number });
                }
                None => {
                    eprintln!("warning: skipping snapshot record without a PR number: {}", e);
                }
            },
        }
    }
    Ok(prs)
}

/// Per-PR event history as staged on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventHistory {
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub created_as_draft: bool,
    #[serde(default)]
    pub from_fork: bool,
    /// When event collection began, if later than the PR's creation.
    /// Histories with this set reconstruct an approximate timeline.
    #[serde(default)]
    pub tracking_since: Option<DateTime<Utc>>,
    pub events: Vec<PrEvent>,
}

impl EventHistory {
    /// True when tracked history begins after the PR was created.
    pub fn has_bootstrap_gap(&self) -> bool {
        self.tracking_since.is_some_and(|t| t > self.opened_at)
    }

    /// The accumulator to start the replay from. When the history has a
    /// bootstrapping gap and a snapshot is available, the snapshot stands in
    /// for the untracked prefix and the timeline is flagged approximate.
    /// The snapshot postdates the tracked events, so they are un-applied
    /// from it first; replaying them forward must not double-apply.
    pub fn seed(&self, snapshot: Option<&PullRequestSnapshot>) -> Seed {
        match (self.has_bootstrap_gap(), snapshot) {
            (true, Some(snapshot)) => Seed::before_events(snapshot, &self.events),
            _ => Seed::at_creation(self.created_as_draft, self.from_fork),
        }
    }
}

pub fn event_history_path(data_dir: &Path, number: u64) -> PathBuf {
    data_dir.join(EVENTS_DIR).join(format!("{}.json", number))
}

/// Load one PR's event history. Absence is not an error: current-state
/// classification never requires history, so features degrade independently.
pub fn load_event_history(data_dir: &Path, number: u64) -> Result<Option<EventHistory>> {
    let path = event_history_path(data_dir, number);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read event file at {}", path.display()))
        }
    };
    let mut history: EventHistory = serde_json::from_str(&content)
        .with_context(|| format!("invalid event history in {}", path.display()))?;
    assign_seq(&mut history.events);
    Ok(Some(history))
}
