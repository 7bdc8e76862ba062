use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding the snapshot file and event histories.
    /// Defaults to the current directory.
    pub data_dir: Option<String>,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

/// Staleness thresholds as humantime strings ("24h", "7d").
/// Parsed and validated once at startup.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ThresholdsConfig {
    pub stale_queue: Option<String>,
    pub stale_ready_to_merge: Option<String>,
    pub stale_delegated: Option<String>,
    pub stale_maintainer_merge: Option<String>,
    pub stale_new_contributor: Option<String>,
}
