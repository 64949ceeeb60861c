use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::queue::RunKind;

/// Step of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    BeforeSync,
    MetadataPhase,
    AssetsPhase,
    AfterSync,
    Idle,
    Aborted,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed,
    /// A `before_*` hook declined to continue.
    Aborted { phase: SyncPhase },
    Failed {
        phase: SyncPhase,
        error: String,
        authentication: bool,
    },
}

impl SyncOutcome {
    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted { .. } => "aborted",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Summary of one sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub kind: RunKind,
    /// `Idle` after a completed run, `Aborted` otherwise.
    pub phase: SyncPhase,
    pub outcome: SyncOutcome,
    pub metadata_elements: usize,
    pub chunks: usize,
    pub new_assets: usize,
    pub updated_assets: usize,
    pub new_compound_assets: usize,
    pub updated_compound_assets: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub(crate) fn new(kind: RunKind) -> Self {
        Self {
            kind,
            phase: SyncPhase::BeforeSync,
            outcome: SyncOutcome::Completed,
            metadata_elements: 0,
            chunks: 0,
            new_assets: 0,
            updated_assets: 0,
            new_compound_assets: 0,
            updated_compound_assets: 0,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: 0,
        }
    }

    /// Total assets handed to the target.
    pub fn delivered(&self) -> usize {
        self.new_assets + self.updated_assets + self.new_compound_assets + self.updated_compound_assets
    }

    pub fn is_completed(&self) -> bool {
        self.outcome == SyncOutcome::Completed
    }
}
