//! Engine error types

/// Errors surfaced by the orchestrator before a run starts
///
/// Once a run is underway it always produces a report; task and branch
/// failures are folded into the report, never raised as errors.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// No workers supplied
    #[error("no agent workers supplied")]
    NoWorkers,

    /// Concurrency configured to zero
    #[error("configured concurrency must be at least 1")]
    ZeroConcurrency,
}
