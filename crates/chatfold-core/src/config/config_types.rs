//! Configuration types and defaults for chatfold.
//!
//! Keeps schema definitions in one place for easier auditing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::index::DEFAULT_WINDOW_MS;

/// Top-level configuration loaded from config.toml.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub dedup: DedupConfig,
    pub feed: FeedConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Merge window in milliseconds, measured from the last occurrence.
    pub window_ms: u64,
    /// Interval for sweeping lapsed index entries; disabled when absent.
    /// Lazy overwrite already keeps the index correct without it.
    pub prune_interval_ms: Option<u64>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            prune_interval_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Path to the JSON-lines chat transcript to observe.
    pub path: PathBuf,
    /// Retry interval while waiting for the transcript to appear.
    pub attach_retry_ms: u64,
    /// Replay lines already present at attach time instead of tailing only
    /// fresh appends.
    pub replay_existing: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("chat.jsonl"),
            attach_retry_ms: 1_000,
            replay_existing: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Duration of the cosmetic badge pulse after a counter update.
    pub pulse_ms: u64,
    /// Maximum rows the terminal renderer retains, hidden rows included.
    pub max_rows: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pulse_ms: 180,
            max_rows: 500,
        }
    }
}
