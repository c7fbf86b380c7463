//! Task queue
//!
//! Expands branch configs into one task per test URL and dispenses them in
//! (priority ascending, enqueue order) sequence. Every task is consumed by
//! exactly one caller: all mutation goes through the single internal mutex.
//! Pure in-memory structure, no failure modes.

use parking_lot::Mutex;
use tagsentry_model::{AgentTask, BranchConfig, BranchId};

#[derive(Debug, Default)]
struct QueueInner {
    /// Kept sorted by priority; equal priorities stay in enqueue order
    tasks: Vec<AgentTask>,
    processed: usize,
}

/// Priority-ordered, single-consumption task queue
#[derive(Debug, Default)]
pub struct TaskQueue {
    inner: Mutex<QueueInner>,
}

impl TaskQueue {
    /// Create an empty queue
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand branch configs into tasks, one per test URL
    ///
    /// Tasks inherit the branch's priority and expected-events list.
    /// Returns the number of tasks enqueued.
    pub fn create_tasks_from_branches(&self, branches: &[BranchConfig]) -> usize {
        let mut enqueued = 0;
        for branch in branches {
            for url in &branch.test_urls {
                let task = AgentTask::new(
                    branch.id.clone(),
                    branch.content_group.clone(),
                    url.clone(),
                    branch.expected_events.clone(),
                    branch.priority,
                );
                self.enqueue(task);
                enqueued += 1;
            }
        }
        tracing::debug!(enqueued, branches = branches.len(), "tasks created");
        enqueued
    }

    /// Insert one task, keeping (priority, enqueue order) sort
    pub fn enqueue(&self, task: AgentTask) {
        let mut inner = self.inner.lock();
        // Insert before the first strictly-greater priority; equal
        // priorities keep FIFO order.
        let pos = inner
            .tasks
            .iter()
            .position(|t| t.priority > task.priority)
            .unwrap_or(inner.tasks.len());
        inner.tasks.insert(pos, task);
    }

    /// Remove and return the head task, or None when empty
    #[must_use]
    pub fn dequeue(&self) -> Option<AgentTask> {
        let mut inner = self.inner.lock();
        if inner.tasks.is_empty() {
            return None;
        }
        let task = inner.tasks.remove(0);
        inner.processed += 1;
        Some(task)
    }

    /// Remove and return the first task matching the predicate
    ///
    /// Relative order of the remaining tasks is untouched.
    #[must_use]
    pub fn dequeue_with_filter<F>(&self, predicate: F) -> Option<AgentTask>
    where
        F: Fn(&AgentTask) -> bool,
    {
        let mut inner = self.inner.lock();
        let pos = inner.tasks.iter().position(|t| predicate(t))?;
        let task = inner.tasks.remove(pos);
        inner.processed += 1;
        Some(task)
    }

    /// Pending tasks for one branch
    #[must_use]
    pub fn pending_for_branch(&self, branch_id: &BranchId) -> usize {
        self.inner
            .lock()
            .tasks
            .iter()
            .filter(|t| &t.branch_id == branch_id)
            .count()
    }

    /// Pending tasks for one content group
    #[must_use]
    pub fn pending_for_content_group(&self, content_group: &str) -> usize {
        self.inner
            .lock()
            .tasks
            .iter()
            .filter(|t| t.content_group == content_group)
            .count()
    }

    /// Number of tasks still queued
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    /// True when nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().tasks.is_empty()
    }

    /// Number of tasks handed out so far
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.inner.lock().processed
    }
}
