//! Test orchestrator
//!
//! Composes the queue, the tracker, the worker pool and the comparison
//! engine: dispatch tasks to N parallel worker loops, fold results into
//! per-branch aggregates, compare, and assemble the final report.
//!
//! A run always yields a `TestReport`, even if every branch failed;
//! cancellation is cooperative and the report is flagged instead of the
//! run aborting. One orchestrator instance drives one run.

use crate::error::OrchestratorError;
use crate::progress::{AgentState, OrchestratorProgress, ProgressEvent, ProgressTracker};
use crate::queue::TaskQueue;
use crate::worker::AgentWorker;
use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tagsentry_compare::ComparisonEngine;
use tagsentry_model::{
    BranchConfig, BranchEventData, BranchId, BranchStatus, BranchTestResult, EngineConfig,
    FiringPrediction, ReportMetadata, ReportSummary, RunId, TestReport,
};

/// Per-run options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Restrict the run to these content groups; None runs everything
    pub content_groups: Option<Vec<String>>,
    /// Resolve and report the branch subset without executing tasks
    pub dry_run: bool,
}

/// Running aggregate plus the pending-count barrier for one branch
struct BranchSlot {
    result: BranchTestResult,
    remaining: usize,
}

/// Composes queue, tracker, workers and comparison engine into a run
pub struct TestOrchestrator {
    config: EngineConfig,
    branches: Vec<BranchConfig>,
    workers: Vec<Arc<dyn AgentWorker>>,
    queue: Arc<TaskQueue>,
    tracker: Arc<ProgressTracker>,
    engine: ComparisonEngine,
    cancelled: Arc<AtomicBool>,
}

impl TestOrchestrator {
    /// Create an orchestrator over a fixed branch list and worker pool
    ///
    /// # Errors
    /// Returns an error when no workers are supplied or concurrency is 0.
    pub fn new(
        config: EngineConfig,
        branches: Vec<BranchConfig>,
        workers: Vec<Arc<dyn AgentWorker>>,
    ) -> Result<Self, OrchestratorError> {
        if workers.is_empty() {
            return Err(OrchestratorError::NoWorkers);
        }
        if config.concurrency == 0 {
            return Err(OrchestratorError::ZeroConcurrency);
        }

        let tracker = Arc::new(ProgressTracker::new(config.history_capacity));
        Ok(Self {
            engine: ComparisonEngine::new(config.clone()),
            config,
            branches,
            workers,
            queue: Arc::new(TaskQueue::new()),
            tracker,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Subscribe to progress events
    pub fn on_progress<F>(&self, callback: F)
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.tracker.on_progress(callback);
    }

    /// Live run snapshot
    #[must_use]
    pub fn get_progress(&self) -> OrchestratorProgress {
        self.tracker.get_progress()
    }

    /// Request cooperative cancellation
    ///
    /// Polled by every worker loop before its next dequeue; in-flight
    /// tasks finish normally.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        tracing::info!("cancellation requested");
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Execute the run and assemble the report
    pub async fn run_branches(&self, options: RunOptions) -> TestReport {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let started = Instant::now();

        let selected = self.resolve_branches(&options);
        tracing::info!(
            run = %run_id,
            branches = selected.len(),
            dry_run = options.dry_run,
            "run starting"
        );

        let slots: Arc<DashMap<BranchId, BranchSlot>> = Arc::new(DashMap::new());
        for branch in &selected {
            let mut result = BranchTestResult::pending(branch.id.clone(), &branch.content_group);
            // Branches without URLs (and dry runs) never execute.
            if options.dry_run || branch.test_urls.is_empty() {
                result.status = BranchStatus::Skipped;
            }
            slots.insert(
                branch.id.clone(),
                BranchSlot {
                    result,
                    remaining: branch.test_urls.len(),
                },
            );
        }

        let total_tasks = if options.dry_run {
            0
        } else {
            self.queue.create_tasks_from_branches(&selected)
        };
        self.tracker.run_started(selected.len(), total_tasks);

        if !options.dry_run {
            let n = self.config.concurrency.min(self.workers.len());
            let loops: Vec<_> = self
                .workers
                .iter()
                .take(n)
                .map(|worker| {
                    tokio::spawn(worker_loop(
                        Arc::clone(worker),
                        Arc::clone(&self.queue),
                        Arc::clone(&self.tracker),
                        Arc::clone(&slots),
                        Arc::clone(&self.cancelled),
                        self.config.continue_on_error,
                    ))
                })
                .collect();

            // Barrier: the run suspends until all N loops drained the
            // queue or observed cancellation.
            join_all(loops).await;
        }

        self.tracker.run_completed();

        let report = self.assemble_report(
            run_id,
            started_at,
            started.elapsed().as_millis() as u64,
            &selected,
            &slots,
            total_tasks,
        );
        tracing::info!(
            run = %run_id,
            overall = report.summary.overall_accuracy,
            completed = report.summary.completed,
            failed = report.summary.failed,
            "run finished"
        );
        report
    }

    /// Resolve the branch subset for this run
    fn resolve_branches(&self, options: &RunOptions) -> Vec<BranchConfig> {
        match &options.content_groups {
            None => self.branches.clone(),
            Some(groups) => self
                .branches
                .iter()
                .filter(|b| groups.iter().any(|g| g == &b.content_group))
                .cloned()
                .collect(),
        }
    }

    fn assemble_report(
        &self,
        run_id: RunId,
        started_at: chrono::DateTime<Utc>,
        duration_ms: u64,
        selected: &[BranchConfig],
        slots: &DashMap<BranchId, BranchSlot>,
        total_tasks: usize,
    ) -> TestReport {
        let mut branches_out = Vec::with_capacity(selected.len());
        let mut branch_accuracies = IndexMap::new();
        let (mut completed, mut failed, mut skipped) = (0usize, 0usize, 0usize);

        for branch in selected {
            let Some((_, slot)) = slots.remove(&branch.id) else {
                continue;
            };
            let mut result = slot.result;

            match result.status {
                BranchStatus::Completed => completed += 1,
                BranchStatus::Failed => failed += 1,
                BranchStatus::Skipped => skipped += 1,
                BranchStatus::Pending | BranchStatus::InProgress => {}
            }

            if !result.tested_urls.is_empty() {
                result.comparison = Some(self.engine.compare_branch(
                    &result.branch_id,
                    &result.content_group,
                    &result.events,
                ));
                let accuracy = calculate_branch_accuracy(&result.events, &self.config);
                result.accuracy = accuracy;
                branch_accuracies.insert(result.branch_id.to_string(), accuracy);
            }

            branches_out.push(result);
        }

        let overall_accuracy = if branch_accuracies.is_empty() {
            0.0
        } else {
            branch_accuracies.values().sum::<f64>() / branch_accuracies.len() as f64
        };

        TestReport {
            metadata: ReportMetadata {
                run_id,
                started_at,
                finished_at: Utc::now(),
                duration_ms,
                concurrency: self.config.concurrency.min(self.workers.len()),
                total_branches: selected.len(),
                total_tasks,
                cancelled: self.is_cancelled(),
            },
            branches: branches_out,
            summary: ReportSummary {
                overall_accuracy,
                branch_accuracies,
                completed,
                failed,
                skipped,
            },
        }
    }
}

impl std::fmt::Debug for TestOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestOrchestrator")
            .field("branches", &self.branches.len())
            .field("workers", &self.workers.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One worker's consumption loop
///
/// Polls the cancellation flag, dequeues, executes, folds the result into
/// the owning branch slot, and finalizes the branch when its pending count
/// reaches zero. Tracker notifications fire outside the slot guard.
async fn worker_loop(
    worker: Arc<dyn AgentWorker>,
    queue: Arc<TaskQueue>,
    tracker: Arc<ProgressTracker>,
    slots: Arc<DashMap<BranchId, BranchSlot>>,
    cancelled: Arc<AtomicBool>,
    continue_on_error: bool,
) {
    let agent_id = worker.id();
    tracker.update_agent_status(agent_id, AgentState::Idle, None);

    loop {
        if cancelled.load(Ordering::Acquire) {
            tracing::debug!(agent = %agent_id, "cancellation observed, loop exiting");
            break;
        }
        let Some(task) = queue.dequeue() else {
            break;
        };

        // First task of a branch moves it to in-progress.
        let newly_started = slots
            .get_mut(&task.branch_id)
            .map(|mut slot| {
                if slot.result.status == BranchStatus::Pending {
                    slot.result.status = BranchStatus::InProgress;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);
        if newly_started {
            tracker.branch_started(&task.branch_id);
        }

        tracker.task_started(task.task_id, &task.branch_id, agent_id);
        tracker.update_agent_status(agent_id, AgentState::Running, Some(task.task_id));

        let result = worker.execute_task(&task).await;

        if result.success {
            tracker.task_completed(task.task_id);
        } else {
            tracker.task_failed(task.task_id);
        }
        tracker.record_agent_outcome(agent_id, result.success);
        let next_state = if result.success {
            AgentState::Idle
        } else {
            AgentState::Error
        };
        tracker.update_agent_status(agent_id, next_state, None);

        // Fold into the branch slot; this is the single mutation choke
        // point for branch aggregates.
        let mut branch_failed = false;
        let mut branch_completed = false;
        if let Some(mut slot) = slots.get_mut(&task.branch_id) {
            slot.result.tested_urls.push(task.url.clone());
            slot.result.screenshots.extend(result.screenshots);

            if result.success {
                slot.result.events.extend(result.data);
            } else if let Some(error) = result.error {
                slot.result.errors.push(error);
                if !continue_on_error && slot.result.status == BranchStatus::InProgress {
                    slot.result.status = BranchStatus::Failed;
                    branch_failed = true;
                }
            }

            slot.remaining = slot.remaining.saturating_sub(1);
            if slot.remaining == 0 && slot.result.status == BranchStatus::InProgress {
                slot.result.status = BranchStatus::Completed;
                branch_completed = true;
            }
        }

        if branch_failed {
            tracker.branch_failed(&task.branch_id);
        }
        if branch_completed {
            tracker.branch_completed(&task.branch_id);
        }
    }

    tracker.update_agent_status(agent_id, AgentState::Idle, None);
}

/// Firing-prediction accuracy over a branch's collected events
///
/// Scored per event carrying a prediction; events without one are excluded
/// from the denominator, never penalized:
/// - AutoFire: 1 if occurred, else 0
/// - Forbidden: 1 unless it occurred at or above the noise threshold
/// - Conditional: 0.5 regardless of occurrence
///
/// Returns a value in [0, 100]; 0 when no event carries a prediction.
#[must_use]
pub fn calculate_branch_accuracy(events: &[BranchEventData], config: &EngineConfig) -> f64 {
    let mut points = 0.0;
    let mut counted = 0usize;

    for event in events {
        let Some(prediction) = event.firing_prediction() else {
            continue;
        };
        counted += 1;
        let occurrence = event.occurrence();

        points += match prediction {
            FiringPrediction::AutoFire => {
                if occurrence.occurred {
                    1.0
                } else {
                    0.0
                }
            }
            FiringPrediction::Forbidden => {
                if !occurrence.occurred || occurrence.count < config.noise_count_threshold {
                    1.0
                } else {
                    0.0
                }
            }
            FiringPrediction::Conditional => 0.5,
        };
    }

    if counted == 0 {
        0.0
    } else {
        points / counted as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tagsentry_model::{Ga4Parameter, PredictedParameter};

    fn event(prediction: Option<FiringPrediction>, occurred: bool, count: u64) -> BranchEventData {
        let mut predicted = Vec::new();
        if let Some(p) = prediction {
            predicted.push(PredictedParameter::firing_meta(p));
        }
        BranchEventData::new("e")
            .with_predicted(predicted)
            .with_actual(vec![Ga4Parameter::occurred_meta(occurred, count)])
    }

    #[test]
    fn accuracy_scores_predicted_events_only() {
        let config = EngineConfig::default();
        let events = vec![
            event(Some(FiringPrediction::AutoFire), true, 50), // 1
            event(Some(FiringPrediction::Conditional), true, 50), // 0.5
            event(None, true, 50),                             // excluded
        ];
        assert_eq!(calculate_branch_accuracy(&events, &config), 75.0);
    }

    #[test]
    fn auto_fire_misses_score_zero() {
        let config = EngineConfig::default();
        let events = vec![event(Some(FiringPrediction::AutoFire), false, 0)];
        assert_eq!(calculate_branch_accuracy(&events, &config), 0.0);
    }

    #[test]
    fn forbidden_below_noise_threshold_scores_full() {
        let config = EngineConfig::default();
        let quiet = vec![event(Some(FiringPrediction::Forbidden), false, 0)];
        let trickle = vec![event(Some(FiringPrediction::Forbidden), true, 5)];
        let loud = vec![event(Some(FiringPrediction::Forbidden), true, 500)];

        assert_eq!(calculate_branch_accuracy(&quiet, &config), 100.0);
        assert_eq!(calculate_branch_accuracy(&trickle, &config), 100.0);
        assert_eq!(calculate_branch_accuracy(&loud, &config), 0.0);
    }

    #[test]
    fn no_predictions_means_zero_accuracy() {
        let config = EngineConfig::default();
        let events = vec![event(None, true, 50)];
        assert_eq!(calculate_branch_accuracy(&events, &config), 0.0);
        assert_eq!(calculate_branch_accuracy(&[], &config), 0.0);
    }
}
