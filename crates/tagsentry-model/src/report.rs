//! Branch results and the final test report

use crate::comparison::BranchComparisonResult;
use crate::event::BranchEventData;
use crate::ids::{BranchId, RunId};
use crate::task::TaskError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Branch lifecycle; only moves forward, never backward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl BranchStatus {
    /// Whether `next` is a legal forward transition from `self`
    #[must_use]
    pub fn can_transition_to(&self, next: BranchStatus) -> bool {
        use BranchStatus::{Completed, Failed, InProgress, Pending, Skipped};
        matches!(
            (self, next),
            (Pending, InProgress | Skipped) | (InProgress, Completed | Failed)
        )
    }

    /// Terminal states accept no further transitions
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

/// Running aggregate for one branch, finalized at branch completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchTestResult {
    pub branch_id: BranchId,
    pub content_group: String,
    pub status: BranchStatus,
    pub tested_urls: Vec<String>,
    /// Collected event data across all of the branch's tasks
    pub events: Vec<BranchEventData>,
    pub comparison: Option<BranchComparisonResult>,
    /// Firing-prediction accuracy in [0, 100], set at report time
    pub accuracy: f64,
    pub errors: Vec<TaskError>,
    /// Screenshot artifact references captured by workers
    pub screenshots: Vec<String>,
}

impl BranchTestResult {
    /// Fresh pending result for a branch
    pub fn pending(branch_id: BranchId, content_group: impl Into<String>) -> Self {
        Self {
            branch_id,
            content_group: content_group.into(),
            status: BranchStatus::Pending,
            tested_urls: Vec::new(),
            events: Vec::new(),
            comparison: None,
            accuracy: 0.0,
            errors: Vec::new(),
            screenshots: Vec::new(),
        }
    }
}

/// Run-level bookkeeping for the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub concurrency: usize,
    pub total_branches: usize,
    pub total_tasks: usize,
    /// True when the run was cancelled mid-flight
    pub cancelled: bool,
}

/// Aggregated outcome counts and accuracies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Mean branch accuracy across executed branches, in [0, 100]
    pub overall_accuracy: f64,
    /// Per-branch accuracy, in run order
    pub branch_accuracies: IndexMap<String, f64>,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// The always-produced outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub metadata: ReportMetadata,
    pub branches: Vec<BranchTestResult>,
    pub summary: ReportSummary,
}
