pub mod cache;
pub mod types;

pub use cache::{load_event_history, load_snapshots, EventHistory, LoadedPr};
pub use types::{CiConclusion, Label, PullRequestSnapshot};
