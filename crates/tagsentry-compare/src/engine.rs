//! The comparison engine
//!
//! Turns (predicted, actual, spec) triples into parameter verdicts, event
//! firing verdicts, branch aggregates and remediation suggestions. Output
//! is a pure function of the inputs and the config; repeated calls with
//! identical input produce identical output.

use crate::normalize::normalize_value;
use crate::similarity::normalized_similarity;
use std::collections::{BTreeSet, HashMap};
use tagsentry_model::{
    is_meta_param, BranchComparisonResult, BranchEventData, BranchId, ComparisonIssue,
    EngineConfig, EventComparison, FiringPrediction, FiringVerdict, IssueKind, IssueSeverity,
    MatchDetail, ParameterComparison, ParameterVerdict, SpecParameter, Suggestion,
    SuggestionPriority,
};

/// A collected value together with its occurrence count
#[derive(Debug, Clone, PartialEq)]
pub struct ActualValue {
    pub value: String,
    pub count: u64,
}

impl ActualValue {
    /// Create an actual value
    pub fn new(value: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// Pure comparison engine
///
/// Holds a copy of the engine config; carries no other state.
#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    config: EngineConfig,
}

impl ComparisonEngine {
    /// Create an engine with the given config
    #[inline]
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Get the config
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compare one parameter across the three channels
    ///
    /// The verdict table is ordered; the first matching row wins.
    #[must_use]
    pub fn compare_parameter(
        &self,
        name: &str,
        predicted: Option<&str>,
        actual: Option<&ActualValue>,
        spec: Option<&SpecParameter>,
    ) -> ParameterComparison {
        let required = spec.is_some_and(|s| s.required);

        let (verdict, matched, detail, confidence) = match (predicted, actual) {
            (None, None) => {
                let verdict = if required {
                    ParameterVerdict::NotImplemented
                } else {
                    ParameterVerdict::Match
                };
                (verdict, true, MatchDetail::BothNull, 1.0)
            }
            (Some(_), None) => (
                ParameterVerdict::ActualMissing,
                false,
                MatchDetail::OneNull,
                0.0,
            ),
            (None, Some(a)) => {
                let verdict = if a.count < self.config.noise_count_threshold {
                    ParameterVerdict::Noise
                } else if spec.is_some() {
                    ParameterVerdict::PredictedCorrect
                } else {
                    ParameterVerdict::ExtraCollected
                };
                (verdict, false, MatchDetail::OneNull, 0.0)
            }
            (Some(p), Some(a)) => {
                let (matched, detail, confidence) = self.match_values(name, p, &a.value);
                let compliant = spec.map_or(true, |s| s.is_compliant(&a.value));
                let verdict = match (matched, compliant) {
                    (true, true) => ParameterVerdict::Match,
                    (true, false) => ParameterVerdict::PredictedCorrect,
                    (false, false) => ParameterVerdict::SpecViolation,
                    (false, true) => ParameterVerdict::PredictionWrong,
                };
                (verdict, matched, detail, confidence)
            }
        };

        ParameterComparison {
            parameter_name: name.to_string(),
            predicted: predicted.map(str::to_string),
            actual: actual.map(|a| a.value.clone()),
            actual_count: actual.map_or(0, |a| a.count),
            spec: spec.cloned(),
            verdict,
            matched,
            match_detail: detail,
            confidence,
        }
    }

    /// Value-matching sub-algorithm: exact, normalized, then partial
    fn match_values(&self, name: &str, predicted: &str, actual: &str) -> (bool, MatchDetail, f64) {
        let p = normalize_value(name, predicted, self.config.case_insensitive);
        let a = normalize_value(name, actual, self.config.case_insensitive);

        if p == a {
            let detail = if predicted == actual {
                MatchDetail::Exact
            } else {
                MatchDetail::Normalized
            };
            return (true, detail, 1.0);
        }

        if self.config.partial_matching {
            let similarity = normalized_similarity(&p, &a);
            if similarity > self.config.partial_match_threshold {
                return (true, MatchDetail::Partial, similarity);
            }
        }

        (false, MatchDetail::Mismatch, 0.0)
    }

    /// Compare one collected event across all its parameters
    ///
    /// Meta-parameters are excluded from the per-parameter loop; they feed
    /// the firing verdict instead, which becomes the event's headline
    /// accuracy.
    #[must_use]
    pub fn compare_event(&self, event: &BranchEventData) -> EventComparison {
        let mut names = BTreeSet::new();
        for p in &event.predicted_params {
            if !is_meta_param(&p.name) {
                names.insert(p.name.clone());
            }
        }
        for a in &event.actual_params {
            if !is_meta_param(&a.name) {
                names.insert(a.name.clone());
            }
        }
        for s in &event.spec_params {
            if !is_meta_param(&s.name) {
                names.insert(s.name.clone());
            }
        }

        let mut parameters = Vec::with_capacity(names.len());
        let mut issues = Vec::new();

        for name in &names {
            let predicted = event
                .predicted_params
                .iter()
                .find(|p| &p.name == name)
                .map(|p| p.value.as_str());
            let actual = event
                .actual_params
                .iter()
                .find(|a| &a.name == name)
                .map(|a| ActualValue::new(a.value.clone(), a.occurrence_count));
            let spec = event.spec_params.iter().find(|s| &s.name == name);

            let comparison = self.compare_parameter(name, predicted, actual.as_ref(), spec);

            if let Some(issue) = issue_for(&event.event_name, &comparison) {
                issues.push(issue);
            }
            parameters.push(comparison);
        }

        let matched = parameters.iter().filter(|p| p.matched).count();
        let parameter_match_ratio = if parameters.is_empty() {
            0.0
        } else {
            matched as f64 / parameters.len() as f64 * 100.0
        };

        let spec_compliance = self.spec_compliance(&parameters);

        let firing_verdict = self.firing_verdict(event);
        let accuracy = firing_verdict.accuracy_score();

        tracing::debug!(
            event = %event.event_name,
            ?firing_verdict,
            accuracy,
            params = parameters.len(),
            "event compared"
        );

        EventComparison {
            event_name: event.event_name.clone(),
            parameters,
            issues,
            firing_verdict,
            accuracy,
            parameter_match_ratio,
            spec_compliance,
        }
    }

    /// Fraction of spec'd parameters that comply, in [0, 100]
    fn spec_compliance(&self, parameters: &[ParameterComparison]) -> f64 {
        let spec_backed: Vec<_> = parameters.iter().filter(|p| p.spec.is_some()).collect();
        if spec_backed.is_empty() {
            return 100.0;
        }
        let violations = spec_backed
            .iter()
            .filter(|p| {
                matches!(
                    p.verdict,
                    ParameterVerdict::SpecViolation | ParameterVerdict::NotImplemented
                )
            })
            .count();
        (spec_backed.len() - violations) as f64 / spec_backed.len() as f64 * 100.0
    }

    /// Judge the event-level firing prediction against the occurrence signal
    ///
    /// Forbidden occurrences below the forbidden threshold are dampened to
    /// "did not occur" so a trickle of noise does not read as a violation.
    #[must_use]
    pub fn firing_verdict(&self, event: &BranchEventData) -> FiringVerdict {
        let occurrence = event.occurrence();

        match event.firing_prediction() {
            Some(FiringPrediction::AutoFire) => {
                if occurrence.occurred {
                    FiringVerdict::Correct
                } else {
                    FiringVerdict::FalsePositive
                }
            }
            Some(FiringPrediction::Forbidden) => {
                let loud = occurrence.occurred
                    && occurrence.count >= self.config.forbidden_count_threshold;
                if loud {
                    FiringVerdict::ForbiddenViolated
                } else {
                    FiringVerdict::Correct
                }
            }
            Some(FiringPrediction::Conditional) => FiringVerdict::Conditional,
            None => {
                if occurrence.occurred {
                    FiringVerdict::FalseNegative
                } else {
                    FiringVerdict::NotPredicted
                }
            }
        }
    }

    /// Compare all of a branch's collected events and aggregate
    ///
    /// Degenerate input (no events) yields zeroed stats, never an error.
    #[must_use]
    pub fn compare_branch(
        &self,
        branch_id: &BranchId,
        content_group: &str,
        events: &[BranchEventData],
    ) -> BranchComparisonResult {
        if events.is_empty() {
            return BranchComparisonResult::empty(branch_id.clone(), content_group);
        }

        let comparisons: Vec<EventComparison> =
            events.iter().map(|e| self.compare_event(e)).collect();

        let accuracy =
            comparisons.iter().map(|c| c.accuracy).sum::<f64>() / comparisons.len() as f64;
        let spec_compliance =
            comparisons.iter().map(|c| c.spec_compliance).sum::<f64>() / comparisons.len() as f64;

        let all_issues: Vec<&ComparisonIssue> =
            comparisons.iter().flat_map(|c| c.issues.iter()).collect();
        let critical_issues = count_severity(&all_issues, IssueSeverity::Critical);
        let warning_issues = count_severity(&all_issues, IssueSeverity::Warning);
        let info_issues = count_severity(&all_issues, IssueSeverity::Info);

        let suggestions = self.generate_suggestions(&all_issues);

        BranchComparisonResult {
            branch_id: branch_id.clone(),
            content_group: content_group.to_string(),
            events: comparisons,
            accuracy,
            spec_compliance,
            critical_issues,
            warning_issues,
            info_issues,
            suggestions,
        }
    }

    /// Derive remediation suggestions from recurring issues
    ///
    /// Issues are grouped by (parameter, kind); groups recurring at least
    /// twice yield one suggestion each, sorted high-priority first.
    #[must_use]
    pub fn generate_suggestions(&self, issues: &[&ComparisonIssue]) -> Vec<Suggestion> {
        let mut groups: HashMap<(String, IssueKind), usize> = HashMap::new();
        for issue in issues {
            *groups
                .entry((issue.parameter_name.clone(), issue.kind))
                .or_insert(0) += 1;
        }

        let mut suggestions: Vec<Suggestion> = groups
            .into_iter()
            .filter(|(_, count)| *count >= 2)
            .map(|((parameter_name, kind), affected_count)| {
                let priority = if affected_count >= 5 {
                    SuggestionPriority::High
                } else if affected_count >= 3 {
                    SuggestionPriority::Medium
                } else {
                    SuggestionPriority::Low
                };
                let message = suggestion_message(&parameter_name, kind, affected_count);
                Suggestion {
                    parameter_name,
                    kind,
                    message,
                    affected_count,
                    priority,
                }
            })
            .collect();

        suggestions.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(b.affected_count.cmp(&a.affected_count))
                .then(a.parameter_name.cmp(&b.parameter_name))
        });

        suggestions
    }
}

/// Map one parameter verdict onto the issue taxonomy, if any
fn issue_for(event_name: &str, comparison: &ParameterComparison) -> Option<ComparisonIssue> {
    let name = &comparison.parameter_name;
    match comparison.verdict {
        ParameterVerdict::NotImplemented => Some(ComparisonIssue {
            severity: IssueSeverity::Critical,
            kind: IssueKind::MissingRequired,
            event_name: event_name.to_string(),
            parameter_name: name.clone(),
            message: format!("required parameter '{name}' was neither predicted nor collected"),
        }),
        ParameterVerdict::SpecViolation => Some(ComparisonIssue {
            severity: IssueSeverity::Warning,
            kind: IssueKind::SpecViolation,
            event_name: event_name.to_string(),
            parameter_name: name.clone(),
            message: format!(
                "collected value {:?} for '{name}' violates the spec contract",
                comparison.actual.as_deref().unwrap_or_default()
            ),
        }),
        ParameterVerdict::PredictionWrong => Some(ComparisonIssue {
            severity: IssueSeverity::Warning,
            kind: IssueKind::WrongPrediction,
            event_name: event_name.to_string(),
            parameter_name: name.clone(),
            message: format!(
                "prediction {:?} disagrees with collected value {:?} for '{name}'",
                comparison.predicted.as_deref().unwrap_or_default(),
                comparison.actual.as_deref().unwrap_or_default()
            ),
        }),
        ParameterVerdict::Noise => Some(ComparisonIssue {
            severity: IssueSeverity::Info,
            kind: IssueKind::Noise,
            event_name: event_name.to_string(),
            parameter_name: name.clone(),
            message: format!(
                "'{name}' collected only {} times, treated as noise",
                comparison.actual_count
            ),
        }),
        _ => None,
    }
}

fn count_severity(issues: &[&ComparisonIssue], severity: IssueSeverity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

fn suggestion_message(parameter: &str, kind: IssueKind, count: usize) -> String {
    match kind {
        IssueKind::MissingRequired => format!(
            "'{parameter}' is required but missing in {count} events; add it to the tag configuration"
        ),
        IssueKind::SpecViolation => format!(
            "'{parameter}' violates its spec contract in {count} events; review the allowed values"
        ),
        IssueKind::WrongPrediction => format!(
            "predictions for '{parameter}' were wrong {count} times; review the prediction prompt"
        ),
        IssueKind::Noise => format!(
            "'{parameter}' shows low-count noise in {count} events; consider filtering the source"
        ),
    }
}
