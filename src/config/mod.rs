mod schema;

pub use schema::{Config, ThresholdsConfig};

use anyhow::{Context, Result};
use chrono::Duration;
use std::fs;
use std::path::PathBuf;

use crate::dashboard::Thresholds;

/// Get the config directory path (~/.config/queueboard/)
pub fn get_config_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Could not determine home directory");
    home.join(".config").join("queueboard")
}

/// Get the default config file path (~/.config/queueboard/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file.
///
/// A missing file is not an error: every setting has a default, so the tool
/// works out of the box. An explicitly-passed path must exist, though; a typo
/// in `--config` should not silently run with defaults.
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    let config: Config = serde_saphyr::from_str(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))?;

    Ok(config)
}

/// Validate threshold strings at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_thresholds(config: &ThresholdsConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let fields = [
        ("thresholds.stale_queue", &config.stale_queue),
        ("thresholds.stale_ready_to_merge", &config.stale_ready_to_merge),
        ("thresholds.stale_delegated", &config.stale_delegated),
        ("thresholds.stale_maintainer_merge", &config.stale_maintainer_merge),
        ("thresholds.stale_new_contributor", &config.stale_new_contributor),
    ];

    for (name, value) in fields {
        if let Some(raw) = value {
            if let Err(e) = humantime::parse_duration(raw) {
                errors.push(format!("{}: invalid duration '{}' - {}", name, raw, e));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn parse_or_default(raw: &Option<String>, default: Duration) -> Duration {
    match raw.as_deref().and_then(|s| humantime::parse_duration(s).ok()) {
        Some(std) => Duration::from_std(std).unwrap_or(default),
        None => default,
    }
}

/// Resolve the config's threshold strings into concrete durations.
/// Call `validate_thresholds` first; unparseable values fall back to defaults.
pub fn resolve_thresholds(config: &ThresholdsConfig) -> Thresholds {
    let defaults = Thresholds::default();
    Thresholds {
        stale_queue: parse_or_default(&config.stale_queue, defaults.stale_queue),
        stale_ready_to_merge: parse_or_default(&config.stale_ready_to_merge, defaults.stale_ready_to_merge),
        stale_delegated: parse_or_default(&config.stale_delegated, defaults.stale_delegated),
        stale_maintainer_merge: parse_or_default(
            &config.stale_maintainer_merge,
            defaults.stale_maintainer_merge,
        ),
        stale_new_contributor: parse_or_default(
            &config.stale_new_contributor,
            defaults.stale_new_contributor,
        ),
    }
}
