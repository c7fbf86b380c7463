//! Comparison verdicts, issues and suggestions
//!
//! Output types of the comparison engine. All of these are derived values:
//! pure functions of (predicted, actual, spec) and immutable once built.

use crate::branch::SpecParameter;
use crate::ids::BranchId;
use serde::{Deserialize, Serialize};

/// How a single parameter's predicted/actual/spec values relate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterVerdict {
    /// Values agree (or both legitimately absent)
    Match,
    /// Spec requires the parameter, nothing predicted or collected
    NotImplemented,
    /// Predicted but never collected
    ActualMissing,
    /// Collected below the noise threshold, not predicted
    Noise,
    /// Collected but neither predicted nor in the spec
    ExtraCollected,
    /// The prediction side was right where the spec side was not
    PredictedCorrect,
    /// Collected value violates the spec contract
    SpecViolation,
    /// Prediction disagrees with a spec-compliant collected value
    PredictionWrong,
}

/// How the value-matching sub-algorithm resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchDetail {
    BothNull,
    OneNull,
    Exact,
    Normalized,
    Partial,
    Mismatch,
}

/// One parameter's verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterComparison {
    pub parameter_name: String,
    pub predicted: Option<String>,
    pub actual: Option<String>,
    /// Occurrence count of the actual value, 0 when absent
    pub actual_count: u64,
    pub spec: Option<SpecParameter>,
    pub verdict: ParameterVerdict,
    pub matched: bool,
    pub match_detail: MatchDetail,
    /// Match confidence in [0, 1]: 1.0 exact, similarity for partial
    pub confidence: f64,
}

/// Verdict on the event-level firing prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FiringVerdict {
    /// AutoFire and it fired, or Forbidden and it stayed quiet
    Correct,
    /// AutoFire but the event never showed up
    FalsePositive,
    /// Forbidden but the event fired anyway
    ForbiddenViolated,
    /// Conditional predictions are not judged on occurrence
    Conditional,
    /// No prediction, yet the event fired
    FalseNegative,
    /// No prediction and no occurrence
    NotPredicted,
}

impl FiringVerdict {
    /// Headline accuracy score for the event
    #[must_use]
    pub fn accuracy_score(&self) -> f64 {
        match self {
            Self::Correct => 100.0,
            Self::NotPredicted => 80.0,
            Self::Conditional => 50.0,
            Self::FalseNegative => 30.0,
            Self::FalsePositive | Self::ForbiddenViolated => 0.0,
        }
    }
}

/// Issue severity, critical first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Critical,
    Warning,
    Info,
}

/// What kind of problem an issue reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Required spec parameter neither predicted nor collected
    MissingRequired,
    /// Collected value outside the spec contract
    SpecViolation,
    /// Prediction disagrees with compliant collected data
    WrongPrediction,
    /// Low-count collection treated as noise
    Noise,
}

/// One finding emitted during event comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonIssue {
    pub severity: IssueSeverity,
    pub kind: IssueKind,
    pub event_name: String,
    pub parameter_name: String,
    pub message: String,
}

/// Comparison outcome for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventComparison {
    pub event_name: String,
    pub parameters: Vec<ParameterComparison>,
    pub issues: Vec<ComparisonIssue>,
    pub firing_verdict: FiringVerdict,
    /// Headline accuracy: the firing verdict's score, in [0, 100]
    pub accuracy: f64,
    /// Raw fraction of matched parameters, in [0, 100]
    pub parameter_match_ratio: f64,
    /// Fraction of spec'd parameters that comply, in [0, 100]
    pub spec_compliance: f64,
}

/// Suggestion priority, high first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

/// Remediation hint derived from recurring issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub parameter_name: String,
    pub kind: IssueKind,
    pub message: String,
    /// How many issues this suggestion covers
    pub affected_count: usize,
    pub priority: SuggestionPriority,
}

/// Comparison outcome aggregated over one branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchComparisonResult {
    pub branch_id: BranchId,
    pub content_group: String,
    pub events: Vec<EventComparison>,
    /// Mean event accuracy, in [0, 100]
    pub accuracy: f64,
    /// Mean event spec compliance, in [0, 100]
    pub spec_compliance: f64,
    pub critical_issues: usize,
    pub warning_issues: usize,
    pub info_issues: usize,
    pub suggestions: Vec<Suggestion>,
}

impl BranchComparisonResult {
    /// Zeroed result for a branch with no collected events
    #[must_use]
    pub fn empty(branch_id: BranchId, content_group: impl Into<String>) -> Self {
        Self {
            branch_id,
            content_group: content_group.into(),
            events: Vec::new(),
            accuracy: 0.0,
            spec_compliance: 0.0,
            critical_issues: 0,
            warning_issues: 0,
            info_issues: 0,
            suggestions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firing_scores_cover_the_fixed_scale() {
        assert_eq!(FiringVerdict::Correct.accuracy_score(), 100.0);
        assert_eq!(FiringVerdict::NotPredicted.accuracy_score(), 80.0);
        assert_eq!(FiringVerdict::Conditional.accuracy_score(), 50.0);
        assert_eq!(FiringVerdict::FalseNegative.accuracy_score(), 30.0);
        assert_eq!(FiringVerdict::FalsePositive.accuracy_score(), 0.0);
        assert_eq!(FiringVerdict::ForbiddenViolated.accuracy_score(), 0.0);
    }

    #[test]
    fn verdicts_serialize_to_wire_format() {
        assert_eq!(
            serde_json::to_string(&ParameterVerdict::NotImplemented).unwrap(),
            "\"NOT_IMPLEMENTED\""
        );
        assert_eq!(
            serde_json::to_string(&FiringVerdict::ForbiddenViolated).unwrap(),
            "\"FORBIDDEN_VIOLATED\""
        );
        assert_eq!(
            serde_json::to_string(&IssueSeverity::Critical).unwrap(),
            "\"critical\""
        );
    }

    #[test]
    fn severity_orders_critical_first() {
        assert!(IssueSeverity::Critical < IssueSeverity::Warning);
        assert!(IssueSeverity::Warning < IssueSeverity::Info);
    }

    #[test]
    fn priority_orders_high_first() {
        assert!(SuggestionPriority::High < SuggestionPriority::Medium);
        assert!(SuggestionPriority::Medium < SuggestionPriority::Low);
    }
}
