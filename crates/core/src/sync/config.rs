//! Configuration for sync runs.

use serde::{Deserialize, Serialize};

/// Sync run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Purchase records fetched per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Period of scheduled runs in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound on chunks delivered per run (0 = unlimited).
    #[serde(default)]
    pub max_chunks_per_run: usize,
}

fn default_chunk_size() -> usize {
    10
}

fn default_interval_secs() -> u64 {
    3600
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            interval_secs: default_interval_secs(),
            max_chunks_per_run: 0,
        }
    }
}
