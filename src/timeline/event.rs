use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::types::CiConclusion;

/// A discrete change to one pull request's observable facts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    LabelAdded { name: String },
    LabelRemoved { name: String },
    CiChanged { conclusion: CiConclusion },
    DraftChanged { draft: bool },
    Opened,
    Closed,
}

/// A timestamped event in one PR's history.
///
/// Ordered by `(at, seq)`: `seq` is a stable sequence number assigned at
/// ingestion, so same-timestamp events replay in ingestion order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PrEvent {
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub seq: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl PrEvent {
    pub fn add_label(at: DateTime<Utc>, name: &str) -> Self {
        Self {
            at,
            seq: 0,
            kind: EventKind::LabelAdded {
                name: name.to_string(),
            },
        }
    }

    pub fn remove_label(at: DateTime<Utc>, name: &str) -> Self {
        Self {
            at,
            seq: 0,
            kind: EventKind::LabelRemoved {
                name: name.to_string(),
            },
        }
    }

    pub fn ci_changed(at: DateTime<Utc>, conclusion: CiConclusion) -> Self {
        Self {
            at,
            seq: 0,
            kind: EventKind::CiChanged { conclusion },
        }
    }

    pub fn draft(at: DateTime<Utc>) -> Self {
        Self {
            at,
            seq: 0,
            kind: EventKind::DraftChanged { draft: true },
        }
    }

    pub fn undraft(at: DateTime<Utc>) -> Self {
        Self {
            at,
            seq: 0,
            kind: EventKind::DraftChanged { draft: false },
        }
    }

    pub fn closed(at: DateTime<Utc>) -> Self {
        Self {
            at,
            seq: 0,
            kind: EventKind::Closed,
        }
    }
}

/// Assign ingestion-order sequence numbers. Called once when an event list
/// is read in; the reconstructor then sorts by `(at, seq)` and never trusts
/// the source ordering beyond this.
pub fn assign_seq(events: &mut [PrEvent]) {
    for (i, event) in events.iter_mut().enumerate() {
        event.seq = i as u64;
    }
}
