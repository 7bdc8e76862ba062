use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A label attached to a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Label {
    pub name: String,
    /// Background colour as a six-digit hexadecimal code, when known.
    #[serde(default)]
    pub color: Option<String>,
}

impl Label {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: None,
        }
    }
}

/// Outcome of the most recent completed or in-progress CI run.
///
/// Older run outcomes are superseded, never merged. An unknown or malformed
/// conclusion in the input deserializes to `None` so that one odd record
/// cannot fail a whole classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CiConclusion {
    Success,
    Failure,
    Running,
    /// CI has not started, or the data is missing.
    #[default]
    None,
}

impl CiConclusion {
    pub fn parse(s: &str) -> Self {
        match s {
            "success" | "pass" => CiConclusion::Success,
            "failure" | "fail" => CiConclusion::Failure,
            "running" => CiConclusion::Running,
            _ => CiConclusion::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CiConclusion::Success => "success",
            CiConclusion::Failure => "failure",
            CiConclusion::Running => "running",
            CiConclusion::None => "none",
        }
    }
}

impl<'de> Deserialize<'de> for CiConclusion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Absent fields are handled by #[serde(default)] on the snapshot.
        // A present field of any unexpected shape (null, number, bool, ...)
        // degrades to `None` instead of failing the whole record.
        struct ConclusionVisitor;

        impl<'de> serde::de::Visitor<'de> for ConclusionVisitor {
            type Value = CiConclusion;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a CI conclusion string")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(CiConclusion::parse(v))
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(CiConclusion::None)
            }

            fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(CiConclusion::None)
            }

            fn visit_some<D2: serde::Deserializer<'de>>(
                self,
                deserializer: D2,
            ) -> Result<Self::Value, D2::Error> {
                deserializer.deserialize_any(ConclusionVisitor)
            }

            fn visit_bool<E: serde::de::Error>(self, _: bool) -> Result<Self::Value, E> {
                Ok(CiConclusion::None)
            }

            fn visit_i64<E: serde::de::Error>(self, _: i64) -> Result<Self::Value, E> {
                Ok(CiConclusion::None)
            }

            fn visit_u64<E: serde::de::Error>(self, _: u64) -> Result<Self::Value, E> {
                Ok(CiConclusion::None)
            }

            fn visit_f64<E: serde::de::Error>(self, _: f64) -> Result<Self::Value, E> {
                Ok(CiConclusion::None)
            }

            fn visit_seq<A: serde::de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> Result<Self::Value, A::Error> {
                while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}
                Ok(CiConclusion::None)
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> Result<Self::Value, A::Error> {
                while map
                    .next_entry::<serde::de::IgnoredAny, serde::de::IgnoredAny>()?
                    .is_some()
                {}
                Ok(CiConclusion::None)
            }
        }

        deserializer.deserialize_any(ConclusionVisitor)
    }
}

impl Serialize for CiConclusion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// One observation of an open pull request, as written by the polling scripts.
///
/// Immutable once constructed; the classifier derives everything else from it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PullRequestSnapshot {
    pub number: u64,
    #[serde(default = "unknown_handle")]
    pub author: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub ci: CiConclusion,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub is_fork: bool,
    #[serde(default)]
    pub has_merge_conflict: bool,
    /// Handle of the assignee, or "nobody".
    #[serde(default = "nobody")]
    pub assignee: String,
    /// Handles of all users approving this PR.
    #[serde(default)]
    pub approvals: Vec<String>,
    /// Handles of all comment and review participants.
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
    pub last_updated_at: DateTime<Utc>,
}

fn unknown_handle() -> String {
    "unknown".to_string()
}

fn nobody() -> String {
    "nobody".to_string()
}

impl PullRequestSnapshot {
    /// Total diff size (additions + deletions).
    pub fn size(&self) -> u64 {
        self.additions + self.deletions
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }

    /// Whether anybody is assigned to this PR. "nobody" is the loader's
    /// stand-in for an absent assignee, not a handle.
    pub fn has_assignee(&self) -> bool {
        self.assignee != "nobody"
    }

    /// Stand-in for a PR whose record could not be parsed at all; such PRs
    /// are reported as unknown rather than dropped from the dashboards.
    pub fn placeholder(number: u64, as_of: DateTime<Utc>) -> Self {
        Self {
            number,
            author: "unknown".to_string(),
            title: "(unreadable record)".to_string(),
            labels: Vec::new(),
            ci: CiConclusion::None,
            is_draft: false,
            is_fork: false,
            has_merge_conflict: false,
            assignee: "nobody".to_string(),
            approvals: Vec::new(),
            participants: Vec::new(),
            additions: 0,
            deletions: 0,
            changed_files: 0,
            last_updated_at: as_of,
        }
    }

    /// Drop duplicate label names, keeping the first occurrence.
    /// Label names are unique per snapshot by invariant; pollers occasionally
    /// violate it when result pages overlap.
    pub fn dedup_labels(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.labels.retain(|l| seen.insert(l.name.clone()));
    }
}
