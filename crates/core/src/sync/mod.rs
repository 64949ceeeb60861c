//! Two-phase synchronization: metadata first, then assets.

mod config;
mod convert;
mod error;
mod orchestrator;
mod service;
mod types;

pub use config::SyncConfig;
pub use error::{ContractViolation, SyncError};
pub use orchestrator::{SyncCollaborators, SyncOrchestrator};
pub use service::{ServiceStatus, SyncService};
pub use types::{SyncOutcome, SyncPhase, SyncReport};
