//! Tasks and task results
//!
//! A task is one URL x branch unit of work, created by the queue and
//! consumed exactly once by a worker. Failures degrade to a failed
//! `TaskResult` carrying a typed `TaskError` - never a panic.

use crate::branch::ExpectedEvent;
use crate::event::BranchEventData;
use crate::ids::{BranchId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One URL x branch unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTask {
    pub task_id: TaskId,
    pub branch_id: BranchId,
    pub content_group: String,
    pub url: String,
    /// Expected events inherited from the branch config
    pub events: Vec<ExpectedEvent>,
    /// Inherited branch priority, lower runs first
    pub priority: u32,
    pub created_at: DateTime<Utc>,
}

impl AgentTask {
    /// Create a task for one test URL of a branch
    pub fn new(
        branch_id: BranchId,
        content_group: impl Into<String>,
        url: impl Into<String>,
        events: Vec<ExpectedEvent>,
        priority: u32,
    ) -> Self {
        Self {
            task_id: TaskId::new(),
            branch_id,
            content_group: content_group.into(),
            url: url.into(),
            events,
            priority,
            created_at: Utc::now(),
        }
    }
}

/// Failure classification for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    Network,
    Timeout,
    VisionApi,
    Ga4Api,
    Parse,
    Unknown,
}

impl TaskErrorKind {
    /// Whether a retry by the caller could plausibly succeed
    #[must_use]
    pub fn default_recoverable(&self) -> bool {
        match self {
            Self::Network | Self::Timeout | Self::VisionApi | Self::Ga4Api => true,
            Self::Parse | Self::Unknown => false,
        }
    }
}

/// Typed task failure attached to `BranchTestResult::errors`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind:?} error: {message}")]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
    pub recoverable: bool,
}

impl TaskError {
    /// Create a task error with the kind's default recoverability
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: kind.default_recoverable(),
        }
    }

    /// Network failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Network, message)
    }

    /// Timeout
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Timeout, message)
    }

    /// Vision/prediction API failure
    pub fn vision_api(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::VisionApi, message)
    }

    /// Analytics API failure
    pub fn ga4_api(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Ga4Api, message)
    }

    /// Payload parse failure
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Parse, message)
    }

    /// Anything unclassified
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Unknown, message)
    }
}

/// Outcome of one task execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub branch_id: BranchId,
    pub success: bool,
    /// Collected event data, one entry per expected event
    pub data: Vec<BranchEventData>,
    pub error: Option<TaskError>,
    /// References to screenshot artifacts stored by the page driver
    pub screenshots: Vec<String>,
    pub duration_ms: u64,
}

impl TaskResult {
    /// Successful execution
    #[must_use]
    pub fn ok(task: &AgentTask, data: Vec<BranchEventData>, duration_ms: u64) -> Self {
        Self {
            task_id: task.task_id,
            branch_id: task.branch_id.clone(),
            success: true,
            data,
            error: None,
            screenshots: Vec::new(),
            duration_ms,
        }
    }

    /// With screenshot artifact references
    #[must_use]
    pub fn with_screenshots(mut self, screenshots: Vec<String>) -> Self {
        self.screenshots = screenshots;
        self
    }

    /// Failed execution
    #[must_use]
    pub fn failed(task: &AgentTask, error: TaskError, duration_ms: u64) -> Self {
        Self {
            task_id: task.task_id,
            branch_id: task.branch_id.clone(),
            success: false,
            data: Vec::new(),
            error: Some(error),
            screenshots: Vec::new(),
            duration_ms,
        }
    }
}
