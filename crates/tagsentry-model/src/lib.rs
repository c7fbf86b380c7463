//! TagSentry data model
//!
//! Shared types for the tagging verification engine:
//! - Branch configurations and the declarative parameter spec
//! - Tasks and task results flowing through the worker pool
//! - Collected event data (predicted, actual, spec)
//! - Comparison verdicts, issues and suggestions
//! - The final test report
//!
//! This crate is a leaf: no async, no I/O, no engine logic.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod branch;
pub mod comparison;
pub mod config;
pub mod event;
pub mod ids;
pub mod report;
pub mod task;

pub use branch::{BranchConfig, ExpectedEvent, SpecParameter};
pub use comparison::{
    BranchComparisonResult, ComparisonIssue, EventComparison, FiringVerdict, IssueKind,
    IssueSeverity, MatchDetail, ParameterComparison, ParameterVerdict, Suggestion,
    SuggestionPriority,
};
pub use config::EngineConfig;
pub use event::{
    is_meta_param, BranchEventData, FiringPrediction, Ga4Parameter, Occurrence,
    PredictedParameter, EVENT_OCCURRED_PARAM, EVENT_PREDICTION_PARAM,
};
pub use ids::{AgentId, BranchId, RunId, TaskId};
pub use report::{BranchStatus, BranchTestResult, ReportMetadata, ReportSummary, TestReport};
pub use task::{AgentTask, TaskError, TaskErrorKind, TaskResult};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the TagSentry model
    pub use crate::{
        AgentTask, BranchConfig, BranchEventData, BranchId, BranchStatus, BranchTestResult,
        EngineConfig, ExpectedEvent, FiringPrediction, Ga4Parameter, PredictedParameter,
        SpecParameter, TaskError, TaskId, TaskResult, TestReport,
    };
}
