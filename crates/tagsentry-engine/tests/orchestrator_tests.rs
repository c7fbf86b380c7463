//! End-to-end orchestrator runs over stub workers.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tagsentry_engine::{RunOptions, TestOrchestrator};
use tagsentry_engine::worker::AgentWorker;
use tagsentry_model::{
    AgentId, AgentTask, BranchStatus, EngineConfig, TaskError, TaskId, TaskResult,
};
use tagsentry_test_utils::{create_branch, create_matching_event};

/// Worker that records every task it executed and fails on listed URLs.
struct StubWorker {
    id: AgentId,
    executed: Arc<Mutex<Vec<TaskId>>>,
    fail_urls: Vec<String>,
    delay: Option<Duration>,
}

impl StubWorker {
    fn new(executed: Arc<Mutex<Vec<TaskId>>>) -> Self {
        Self {
            id: AgentId::new(),
            executed,
            fail_urls: Vec::new(),
            delay: None,
        }
    }

    fn failing_on(mut self, url: &str) -> Self {
        self.fail_urls.push(url.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AgentWorker for StubWorker {
    fn id(&self) -> AgentId {
        self.id
    }

    async fn execute_task(&self, task: &AgentTask) -> TaskResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.executed.lock().push(task.task_id);
        if self.fail_urls.contains(&task.url) {
            TaskResult::failed(task, TaskError::network("connection refused"), 5)
        } else {
            TaskResult::ok(task, vec![create_matching_event("page_view")], 5)
        }
    }
}

/// Worker that parks on one URL until released, so a test can observe
/// the run while that branch is still open.
struct GatedWorker {
    id: AgentId,
    gate: Arc<tokio::sync::Notify>,
    gated_url: String,
}

#[async_trait]
impl AgentWorker for GatedWorker {
    fn id(&self) -> AgentId {
        self.id
    }

    async fn execute_task(&self, task: &AgentTask) -> TaskResult {
        if task.url == self.gated_url {
            self.gate.notified().await;
        }
        TaskResult::ok(task, vec![create_matching_event("page_view")], 5)
    }
}

fn pool(n: usize, executed: &Arc<Mutex<Vec<TaskId>>>) -> Vec<Arc<dyn AgentWorker>> {
    (0..n)
        .map(|_| Arc::new(StubWorker::new(Arc::clone(executed))) as Arc<dyn AgentWorker>)
        .collect()
}

#[tokio::test]
async fn every_task_executes_exactly_once_across_the_pool() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let branches = (0..5)
        .map(|i| {
            let urls = [format!("https://shop.example/{i}/a"), format!("https://shop.example/{i}/b")];
            create_branch(
                &format!("branch-{i}"),
                "PDP",
                &[urls[0].as_str(), urls[1].as_str()],
            )
        })
        .collect();

    let orchestrator = TestOrchestrator::new(
        EngineConfig::default().with_concurrency(4),
        branches,
        pool(4, &executed),
    )
    .unwrap();
    let report = orchestrator.run_branches(RunOptions::default()).await;

    let mut seen = executed.lock().clone();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 10, "each task runs exactly once");
    assert_eq!(report.metadata.total_tasks, 10);
    assert_eq!(report.summary.completed, 5);
    assert_eq!(report.summary.failed, 0);
}

#[tokio::test]
async fn branch_completes_only_after_its_last_task() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let branches = vec![create_branch(
        "home",
        "Homepage",
        &["https://x.example/1", "https://x.example/2", "https://x.example/3"],
    )];

    let orchestrator =
        TestOrchestrator::new(EngineConfig::default(), branches, pool(2, &executed)).unwrap();
    let report = orchestrator.run_branches(RunOptions::default()).await;

    let branch = &report.branches[0];
    assert_eq!(branch.status, BranchStatus::Completed);
    assert_eq!(branch.tested_urls.len(), 3);
    // Every URL's events are folded into the single branch result.
    assert_eq!(branch.events.len(), 3);
    assert!(branch.comparison.is_some());
}

#[tokio::test]
async fn branch_stays_open_while_a_task_is_in_flight() {
    let branches = vec![create_branch(
        "home",
        "Homepage",
        &["https://x.example/1", "https://x.example/2", "https://x.example/3"],
    )];
    let gate = Arc::new(tokio::sync::Notify::new());
    let workers: Vec<Arc<dyn AgentWorker>> = vec![Arc::new(GatedWorker {
        id: AgentId::new(),
        gate: Arc::clone(&gate),
        gated_url: "https://x.example/3".to_string(),
    })];

    let orchestrator = Arc::new(
        TestOrchestrator::new(EngineConfig::default(), branches, workers).unwrap(),
    );
    let runner = Arc::clone(&orchestrator);
    let handle = tokio::spawn(async move { runner.run_branches(RunOptions::default()).await });

    // Wait for the first two tasks, leaving the third parked at the gate.
    tokio::time::timeout(Duration::from_secs(5), async {
        while orchestrator.get_progress().completed_tasks < 2 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();

    let progress = orchestrator.get_progress();
    assert_eq!(progress.completed_branches, 0, "branch must not close early");
    assert_eq!(progress.completed_tasks, 2);

    gate.notify_one();
    let report = handle.await.unwrap();
    assert_eq!(report.branches[0].status, BranchStatus::Completed);
    assert_eq!(report.summary.completed, 1);
}

#[tokio::test]
async fn continue_on_error_keeps_the_branch_alive() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let branches = vec![create_branch("home", "Homepage", &["https://x.example/bad", "https://x.example/ok"])];
    let workers: Vec<Arc<dyn AgentWorker>> = vec![Arc::new(
        StubWorker::new(Arc::clone(&executed)).failing_on("https://x.example/bad"),
    )];

    let orchestrator = TestOrchestrator::new(
        EngineConfig::default().with_continue_on_error(true),
        branches,
        workers,
    )
    .unwrap();
    let report = orchestrator.run_branches(RunOptions::default()).await;

    let branch = &report.branches[0];
    assert_eq!(branch.status, BranchStatus::Completed);
    assert_eq!(branch.errors.len(), 1);
    assert_eq!(branch.events.len(), 1);
}

#[tokio::test]
async fn fail_fast_marks_the_branch_failed_immediately() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let branches = vec![create_branch("home", "Homepage", &["https://x.example/bad", "https://x.example/ok"])];
    let workers: Vec<Arc<dyn AgentWorker>> = vec![Arc::new(
        StubWorker::new(Arc::clone(&executed)).failing_on("https://x.example/bad"),
    )];

    let orchestrator = TestOrchestrator::new(
        EngineConfig::default().with_continue_on_error(false),
        branches,
        workers,
    )
    .unwrap();
    let report = orchestrator.run_branches(RunOptions::default()).await;

    assert_eq!(report.branches[0].status, BranchStatus::Failed);
    assert_eq!(report.summary.failed, 1);
}

#[tokio::test]
async fn content_group_filter_restricts_the_run() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let branches = vec![
        create_branch("pdp-1", "PDP", &["https://x.example/p"]),
        create_branch("cart-1", "Cart", &["https://x.example/c"]),
    ];

    let orchestrator =
        TestOrchestrator::new(EngineConfig::default(), branches, pool(2, &executed)).unwrap();
    let report = orchestrator
        .run_branches(RunOptions {
            content_groups: Some(vec!["Cart".to_string()]),
            dry_run: false,
        })
        .await;

    assert_eq!(report.branches.len(), 1);
    assert_eq!(report.branches[0].branch_id.as_str(), "cart-1");
    assert_eq!(executed.lock().len(), 1);
}

#[tokio::test]
async fn dry_run_skips_every_branch() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let branches = vec![
        create_branch("pdp-1", "PDP", &["https://x.example/p"]),
        create_branch("cart-1", "Cart", &["https://x.example/c"]),
    ];

    let orchestrator =
        TestOrchestrator::new(EngineConfig::default(), branches, pool(2, &executed)).unwrap();
    let report = orchestrator
        .run_branches(RunOptions {
            content_groups: None,
            dry_run: true,
        })
        .await;

    assert!(executed.lock().is_empty());
    assert_eq!(report.metadata.total_tasks, 0);
    assert_eq!(report.summary.skipped, 2);
    assert!(report
        .branches
        .iter()
        .all(|b| b.status == BranchStatus::Skipped));
}

#[tokio::test]
async fn cancellation_still_yields_a_flagged_report() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let urls: Vec<String> = (0..20).map(|i| format!("https://x.example/{i}")).collect();
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    let branches = vec![create_branch("big", "Homepage", &url_refs)];
    let workers: Vec<Arc<dyn AgentWorker>> = vec![Arc::new(
        StubWorker::new(Arc::clone(&executed)).with_delay(Duration::from_millis(20)),
    )];

    let orchestrator = Arc::new(
        TestOrchestrator::new(EngineConfig::default(), branches, workers).unwrap(),
    );
    let canceller = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        canceller.cancel();
    });

    let report = orchestrator.run_branches(RunOptions::default()).await;

    assert!(report.metadata.cancelled);
    assert!(executed.lock().len() < 20, "loop stopped before the queue drained");
    // The partial branch never reached a terminal status.
    assert_eq!(report.summary.completed, 0);
}

#[tokio::test]
async fn all_branches_failing_still_produces_a_report() {
    let executed = Arc::new(Mutex::new(Vec::new()));
    let branches = vec![
        create_branch("a", "PDP", &["https://x.example/bad"]),
        create_branch("b", "PDP", &["https://x.example/bad"]),
    ];
    let workers: Vec<Arc<dyn AgentWorker>> = vec![Arc::new(
        StubWorker::new(Arc::clone(&executed)).failing_on("https://x.example/bad"),
    )];

    let orchestrator = TestOrchestrator::new(
        EngineConfig::default().with_continue_on_error(false),
        branches,
        workers,
    )
    .unwrap();
    let report = orchestrator.run_branches(RunOptions::default()).await;

    assert_eq!(report.summary.failed, 2);
    assert_eq!(report.summary.completed, 0);
    assert_eq!(report.branches.len(), 2);
}

#[test]
fn construction_rejects_empty_pools_and_zero_concurrency() {
    let branches = vec![create_branch("a", "PDP", &["https://x.example/p"])];
    assert!(TestOrchestrator::new(EngineConfig::default(), branches.clone(), Vec::new()).is_err());

    let executed = Arc::new(Mutex::new(Vec::new()));
    assert!(TestOrchestrator::new(
        EngineConfig::default().with_concurrency(0),
        branches,
        pool(1, &executed),
    )
    .is_err());
}
