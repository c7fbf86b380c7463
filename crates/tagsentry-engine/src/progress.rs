//! Progress tracking
//!
//! Holds live run/branch/task/agent state and emits an event on every
//! transition. Derived figures (percent complete, ETA) are recomputed on
//! every `get_progress` call rather than cached, so reads are always safe
//! concurrently with writers. Subscriber callbacks are isolated: one
//! panicking subscriber cannot halt tracking.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tagsentry_model::{AgentId, BranchId, BranchStatus, TaskId};

/// Run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    NotStarted,
    Started,
    Running,
    Completed,
}

/// Task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Enqueued,
    InProgress,
    Completed,
    Failed,
}

/// Agent (worker loop) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Idle,
    Running,
    Error,
}

/// Live snapshot of one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentProgress {
    pub agent_id: AgentId,
    pub state: AgentState,
    pub current_task: Option<TaskId>,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    pub updated_at: DateTime<Utc>,
}

/// One state transition, as seen by subscribers and the history buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProgressEvent {
    RunStarted {
        total_branches: usize,
        total_tasks: usize,
        at: DateTime<Utc>,
    },
    RunCompleted {
        at: DateTime<Utc>,
    },
    BranchStarted {
        branch_id: BranchId,
        at: DateTime<Utc>,
    },
    BranchCompleted {
        branch_id: BranchId,
        at: DateTime<Utc>,
    },
    BranchFailed {
        branch_id: BranchId,
        at: DateTime<Utc>,
    },
    TaskStarted {
        task_id: TaskId,
        branch_id: BranchId,
        agent_id: AgentId,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    TaskFailed {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    AgentStatusChanged {
        agent_id: AgentId,
        state: AgentState,
        at: DateTime<Utc>,
    },
}

/// Run-wide live snapshot, recomputed on every read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrchestratorProgress {
    pub run_status: RunStatus,
    pub total_branches: usize,
    pub completed_branches: usize,
    pub failed_branches: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub in_progress_tasks: usize,
    /// Finished tasks over total, in [0, 100]
    pub percent_complete: f64,
    pub elapsed_ms: u64,
    /// `elapsed / completed x remaining`; None until the first completion
    pub eta_ms: Option<u64>,
    pub agents: Vec<AgentProgress>,
}

type Callback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

#[derive(Default)]
struct TrackerInner {
    run_status: Option<RunStatus>,
    started_at: Option<Instant>,
    total_branches: usize,
    total_tasks: usize,
    branches: HashMap<BranchId, BranchStatus>,
    tasks: HashMap<TaskId, TaskStatus>,
    agents: HashMap<AgentId, AgentProgress>,
    history: VecDeque<ProgressEvent>,
}

/// Tracks run/branch/task/agent state machines
pub struct ProgressTracker {
    inner: Mutex<TrackerInner>,
    callbacks: Mutex<Vec<Callback>>,
    history_capacity: usize,
}

impl ProgressTracker {
    /// Create a tracker with the given event-history capacity
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(TrackerInner::default()),
            callbacks: Mutex::new(Vec::new()),
            history_capacity: history_capacity.max(1),
        }
    }

    /// Subscribe to every transition event
    pub fn on_progress<F>(&self, callback: F)
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.callbacks.lock().push(Arc::new(callback));
    }

    /// Mark the run started with its totals
    pub fn run_started(&self, total_branches: usize, total_tasks: usize) {
        {
            let mut inner = self.inner.lock();
            inner.run_status = Some(RunStatus::Started);
            inner.started_at = Some(Instant::now());
            inner.total_branches = total_branches;
            inner.total_tasks = total_tasks;
        }
        self.emit(ProgressEvent::RunStarted {
            total_branches,
            total_tasks,
            at: Utc::now(),
        });
    }

    /// Mark the run completed
    pub fn run_completed(&self) {
        self.inner.lock().run_status = Some(RunStatus::Completed);
        self.emit(ProgressEvent::RunCompleted { at: Utc::now() });
    }

    /// Branch moved to in-progress
    pub fn branch_started(&self, branch_id: &BranchId) {
        if self.transition_branch(branch_id, BranchStatus::InProgress) {
            self.emit(ProgressEvent::BranchStarted {
                branch_id: branch_id.clone(),
                at: Utc::now(),
            });
        }
    }

    /// Branch finished successfully
    pub fn branch_completed(&self, branch_id: &BranchId) {
        if self.transition_branch(branch_id, BranchStatus::Completed) {
            self.emit(ProgressEvent::BranchCompleted {
                branch_id: branch_id.clone(),
                at: Utc::now(),
            });
        }
    }

    /// Branch failed
    pub fn branch_failed(&self, branch_id: &BranchId) {
        if self.transition_branch(branch_id, BranchStatus::Failed) {
            self.emit(ProgressEvent::BranchFailed {
                branch_id: branch_id.clone(),
                at: Utc::now(),
            });
        }
    }

    /// Task picked up by an agent
    pub fn task_started(&self, task_id: TaskId, branch_id: &BranchId, agent_id: AgentId) {
        {
            let mut inner = self.inner.lock();
            if inner.run_status == Some(RunStatus::Started) {
                inner.run_status = Some(RunStatus::Running);
            }
            inner.tasks.insert(task_id, TaskStatus::InProgress);
        }
        self.emit(ProgressEvent::TaskStarted {
            task_id,
            branch_id: branch_id.clone(),
            agent_id,
            at: Utc::now(),
        });
    }

    /// Task finished successfully
    pub fn task_completed(&self, task_id: TaskId) {
        if self.finish_task(task_id, TaskStatus::Completed) {
            self.emit(ProgressEvent::TaskCompleted {
                task_id,
                at: Utc::now(),
            });
        }
    }

    /// Task failed
    pub fn task_failed(&self, task_id: TaskId) {
        if self.finish_task(task_id, TaskStatus::Failed) {
            self.emit(ProgressEvent::TaskFailed {
                task_id,
                at: Utc::now(),
            });
        }
    }

    /// Record an agent's state and current task
    pub fn update_agent_status(
        &self,
        agent_id: AgentId,
        state: AgentState,
        current_task: Option<TaskId>,
    ) {
        {
            let mut inner = self.inner.lock();
            let entry = inner.agents.entry(agent_id).or_insert(AgentProgress {
                agent_id,
                state: AgentState::Idle,
                current_task: None,
                tasks_completed: 0,
                tasks_failed: 0,
                updated_at: Utc::now(),
            });
            entry.state = state;
            entry.current_task = current_task;
            entry.updated_at = Utc::now();
        }
        self.emit(ProgressEvent::AgentStatusChanged {
            agent_id,
            state,
            at: Utc::now(),
        });
    }

    /// Count a finished task against an agent's tally
    pub fn record_agent_outcome(&self, agent_id: AgentId, success: bool) {
        let mut inner = self.inner.lock();
        if let Some(agent) = inner.agents.get_mut(&agent_id) {
            if success {
                agent.tasks_completed += 1;
            } else {
                agent.tasks_failed += 1;
            }
            agent.updated_at = Utc::now();
        }
    }

    /// Branches currently in the Completed state
    #[must_use]
    pub fn completed_branches(&self) -> Vec<BranchId> {
        self.inner
            .lock()
            .branches
            .iter()
            .filter(|(_, status)| **status == BranchStatus::Completed)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Recent transition events, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<ProgressEvent> {
        self.inner.lock().history.iter().cloned().collect()
    }

    /// Recompute the live snapshot from internal state
    #[must_use]
    pub fn get_progress(&self) -> OrchestratorProgress {
        let inner = self.inner.lock();

        let completed_tasks = inner
            .tasks
            .values()
            .filter(|s| **s == TaskStatus::Completed)
            .count();
        let failed_tasks = inner
            .tasks
            .values()
            .filter(|s| **s == TaskStatus::Failed)
            .count();
        let in_progress_tasks = inner
            .tasks
            .values()
            .filter(|s| **s == TaskStatus::InProgress)
            .count();

        let finished = completed_tasks + failed_tasks;
        let percent_complete = if inner.total_tasks == 0 {
            0.0
        } else {
            finished as f64 / inner.total_tasks as f64 * 100.0
        };

        let elapsed_ms = inner
            .started_at
            .map_or(0, |t| t.elapsed().as_millis() as u64);

        // ETA extrapolates from completions only; failed tasks say nothing
        // about how long the remaining work will take.
        let remaining = inner.total_tasks.saturating_sub(finished);
        let eta_ms = if completed_tasks > 0 && remaining > 0 {
            Some(elapsed_ms / completed_tasks as u64 * remaining as u64)
        } else {
            None
        };

        OrchestratorProgress {
            run_status: inner.run_status.unwrap_or(RunStatus::NotStarted),
            total_branches: inner.total_branches,
            completed_branches: inner
                .branches
                .values()
                .filter(|s| **s == BranchStatus::Completed)
                .count(),
            failed_branches: inner
                .branches
                .values()
                .filter(|s| **s == BranchStatus::Failed)
                .count(),
            total_tasks: inner.total_tasks,
            completed_tasks,
            failed_tasks,
            in_progress_tasks,
            percent_complete,
            elapsed_ms,
            eta_ms,
            agents: inner.agents.values().cloned().collect(),
        }
    }

    /// Apply a branch transition; backward moves are dropped with a warning
    fn transition_branch(&self, branch_id: &BranchId, next: BranchStatus) -> bool {
        let mut inner = self.inner.lock();
        let current = inner
            .branches
            .get(branch_id)
            .copied()
            .unwrap_or(BranchStatus::Pending);

        if !current.can_transition_to(next) {
            tracing::warn!(
                branch = %branch_id,
                ?current,
                ?next,
                "illegal branch transition dropped"
            );
            return false;
        }

        inner.branches.insert(branch_id.clone(), next);
        true
    }

    /// Finish a task; only in-flight tasks may finish
    fn finish_task(&self, task_id: TaskId, status: TaskStatus) -> bool {
        let mut inner = self.inner.lock();
        match inner.tasks.get(&task_id) {
            Some(TaskStatus::InProgress) => {
                inner.tasks.insert(task_id, status);
                true
            }
            other => {
                tracing::warn!(task = %task_id, ?other, "illegal task transition dropped");
                false
            }
        }
    }

    /// Record the event and fan it out to subscribers
    ///
    /// Callbacks run outside the state lock; a panicking subscriber is
    /// caught and logged.
    fn emit(&self, event: ProgressEvent) {
        {
            let mut inner = self.inner.lock();
            if inner.history.len() >= self.history_capacity {
                inner.history.pop_front();
            }
            inner.history.push_back(event.clone());
        }

        let callbacks: Vec<Callback> = self.callbacks.lock().clone();
        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                tracing::error!(?event, "progress subscriber panicked; ignoring");
            }
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("history_capacity", &self.history_capacity)
            .finish_non_exhaustive()
    }
}
