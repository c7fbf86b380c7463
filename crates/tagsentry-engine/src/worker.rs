//! Agent worker boundary
//!
//! A worker exclusively owns one browser context and one prediction/fetch
//! client for its lifetime and processes at most one task at a time. The
//! collaborators behind it (page automation, vision prediction, analytics
//! fetch) are traits; their internals live outside this crate.
//!
//! A failed task degrades to `TaskResult { success: false, .. }` with a
//! typed error. The worker never panics and stays ready for its next
//! dequeue.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tagsentry_model::{
    AgentId, AgentTask, BranchEventData, ExpectedEvent, FiringPrediction, Ga4Parameter,
    PredictedParameter, TaskError, TaskResult,
};

/// Analytics query window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a date range
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

/// Result of opening a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle {
    pub final_url: String,
    pub title: String,
}

/// A captured screenshot
///
/// The driver owns persistence; `stored_at` is its artifact reference
/// when it saved the capture somewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub bytes: Vec<u8>,
    pub stored_at: Option<String>,
}

/// One event's prediction as returned by the vision collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct EventPrediction {
    pub event_name: String,
    pub firing: FiringPrediction,
    pub parameters: Vec<PredictedParameter>,
}

/// Collaborator failure, mapped onto the task error taxonomy
#[derive(Debug, Clone, thiserror::Error)]
pub enum CollectError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("vision API failure: {0}")]
    VisionApi(String),

    #[error("analytics API failure: {0}")]
    Ga4Api(String),

    #[error("payload parse failure: {0}")]
    Parse(String),
}

impl From<CollectError> for TaskError {
    fn from(err: CollectError) -> Self {
        match &err {
            CollectError::Network(_) => TaskError::network(err.to_string()),
            CollectError::Timeout { .. } => TaskError::timeout(err.to_string()),
            CollectError::VisionApi(_) => TaskError::vision_api(err.to_string()),
            CollectError::Ga4Api(_) => TaskError::ga4_api(err.to_string()),
            CollectError::Parse(_) => TaskError::parse(err.to_string()),
        }
    }
}

/// Page automation handle: open a URL, capture a screenshot
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    async fn open(&self, url: &str) -> Result<PageHandle, CollectError>;
    async fn capture_screenshot(&self, url: &str) -> Result<Screenshot, CollectError>;
}

/// Vision/LLM prediction collaborator
#[async_trait::async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(
        &self,
        url: &str,
        screenshot: &[u8],
        events: &[ExpectedEvent],
    ) -> Result<Vec<EventPrediction>, CollectError>;
}

/// Analytics API collaborator
///
/// The returned rows include the synthetic `_event_occurred` signal.
#[async_trait::async_trait]
pub trait AnalyticsFetcher: Send + Sync {
    async fn fetch_actual(
        &self,
        event_name: &str,
        url: &str,
        date_range: &DateRange,
    ) -> Result<Vec<Ga4Parameter>, CollectError>;
}

/// One worker in the pool: executes one task at a time
#[async_trait::async_trait]
pub trait AgentWorker: Send + Sync {
    /// Stable identifier for progress attribution
    fn id(&self) -> AgentId;

    /// Execute one task; failures degrade to a failed result
    async fn execute_task(&self, task: &AgentTask) -> TaskResult;
}

/// Default worker wiring the three collaborators together
pub struct TagAgentWorker {
    id: AgentId,
    page: Arc<dyn PageDriver>,
    predictor: Arc<dyn Predictor>,
    fetcher: Arc<dyn AnalyticsFetcher>,
    date_range: DateRange,
}

impl TagAgentWorker {
    /// Create a worker owning its collaborators
    #[must_use]
    pub fn new(
        page: Arc<dyn PageDriver>,
        predictor: Arc<dyn Predictor>,
        fetcher: Arc<dyn AnalyticsFetcher>,
        date_range: DateRange,
    ) -> Self {
        Self {
            id: AgentId::new(),
            page,
            predictor,
            fetcher,
            date_range,
        }
    }

    /// Collect event data for one task
    ///
    /// One screenshot and one prediction call per task, then one analytics
    /// fetch per expected event.
    async fn collect(
        &self,
        task: &AgentTask,
    ) -> Result<(Vec<BranchEventData>, Vec<String>), CollectError> {
        let page = self.page.open(&task.url).await?;
        tracing::debug!(url = %task.url, final_url = %page.final_url, "page opened");

        let screenshot = self.page.capture_screenshot(&task.url).await?;
        let predictions = self
            .predictor
            .predict(&task.url, &screenshot.bytes, &task.events)
            .await?;

        let mut collected = Vec::with_capacity(task.events.len());
        for event in &task.events {
            let actual = self
                .fetcher
                .fetch_actual(&event.name, &task.url, &self.date_range)
                .await?;

            let mut predicted = Vec::new();
            if let Some(prediction) = predictions.iter().find(|p| p.event_name == event.name) {
                predicted.push(PredictedParameter::firing_meta(prediction.firing));
                predicted.extend(prediction.parameters.iter().cloned());
            }

            collected.push(
                BranchEventData::new(event.name.clone())
                    .with_predicted(predicted)
                    .with_actual(actual)
                    .with_spec(event.spec_params.clone()),
            );
        }

        Ok((collected, screenshot.stored_at.into_iter().collect()))
    }
}

#[async_trait::async_trait]
impl AgentWorker for TagAgentWorker {
    fn id(&self) -> AgentId {
        self.id
    }

    async fn execute_task(&self, task: &AgentTask) -> TaskResult {
        let started = Instant::now();

        match self.collect(task).await {
            Ok((data, screenshots)) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::debug!(task = %task.task_id, events = data.len(), duration_ms, "task collected");
                TaskResult::ok(task, data, duration_ms).with_screenshots(screenshots)
            }
            Err(err) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(task = %task.task_id, error = %err, "task failed");
                TaskResult::failed(task, err.into(), duration_ms)
            }
        }
    }
}
