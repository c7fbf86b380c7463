//! TagSentry execution engine
//!
//! The concurrency-coordinated half of the system:
//! - `TaskQueue`: priority-ordered, single-consumption task dispenser
//! - `ProgressTracker`: live run/branch/task/agent state with an event stream
//! - `AgentWorker`: the boundary owning one browser context and one
//!   prediction/fetch client, executing one task at a time
//! - `TestOrchestrator`: fans N worker loops out over the queue, folds
//!   results into per-branch aggregates and assembles the report
//!
//! # Example
//!
//! ```rust,ignore
//! use tagsentry_engine::{RunOptions, TestOrchestrator};
//! use tagsentry_model::EngineConfig;
//!
//! # async fn example(branches: Vec<tagsentry_model::BranchConfig>,
//! #                  workers: Vec<std::sync::Arc<dyn tagsentry_engine::AgentWorker>>)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new().with_concurrency(4);
//! let orchestrator = TestOrchestrator::new(config, branches, workers)?;
//! let report = orchestrator.run_branches(RunOptions::default()).await;
//! println!("overall accuracy {:.1}", report.summary.overall_accuracy);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod queue;
pub mod worker;

pub use error::OrchestratorError;
pub use orchestrator::{calculate_branch_accuracy, RunOptions, TestOrchestrator};
pub use progress::{
    AgentProgress, AgentState, OrchestratorProgress, ProgressEvent, ProgressTracker, RunStatus,
    TaskStatus,
};
pub use queue::TaskQueue;
pub use worker::{
    AgentWorker, AnalyticsFetcher, CollectError, DateRange, EventPrediction, PageDriver,
    PageHandle, Predictor, Screenshot, TagAgentWorker,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the TagSentry engine
    pub use crate::{
        AgentWorker, OrchestratorProgress, ProgressEvent, ProgressTracker, RunOptions, TaskQueue,
        TestOrchestrator,
    };
}
