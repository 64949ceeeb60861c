//! Configuration for the file system target.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for [`super::FsTarget`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsTargetConfig {
    /// Directory receiving metadata, assets and the id index.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Whether replaced binaries (version > 1) are accepted.
    #[serde(default = "default_true")]
    pub binary_updates: bool,

    /// Whether every import language is stored, or only the primary one.
    #[serde(default = "default_true")]
    pub multi_language: bool,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("./assetsync-data")
}

fn default_true() -> bool {
    true
}

impl Default for FsTargetConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            binary_updates: true,
            multi_language: true,
        }
    }
}

impl FsTargetConfig {
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = root_dir.into();
        self
    }

    pub fn with_binary_updates(mut self, enabled: bool) -> Self {
        self.binary_updates = enabled;
        self
    }
}
