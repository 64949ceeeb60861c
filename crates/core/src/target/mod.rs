//! Downstream target seam and the file system reference target.

mod config;
mod error;
mod fs;
mod traits;

pub use config::FsTargetConfig;
pub use error::TargetError;
pub use fs::{FsTarget, StoredAsset};
pub use traits::{SyncTarget, SyncTargetCapabilities};
