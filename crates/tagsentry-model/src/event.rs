//! Collected event data
//!
//! One `BranchEventData` is produced per (task, expected event) and is
//! immutable after collection. It carries three parameter channels:
//! predicted (vision/LLM output), actual (analytics API rows) and spec
//! (the declarative contract copied from the branch config).
//!
//! Two meta-signals ride the same channels as real parameters, namespaced
//! with a leading underscore: the firing prediction and the occurrence
//! flag+count. The rest of the core never string-matches these names;
//! it goes through the typed accessors below.

use crate::branch::SpecParameter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the meta-parameter carrying the firing prediction
pub const EVENT_PREDICTION_PARAM: &str = "_event_prediction";

/// Name of the meta-parameter carrying the occurrence signal
pub const EVENT_OCCURRED_PARAM: &str = "_event_occurred";

/// True for underscore-namespaced meta-parameters
#[inline]
#[must_use]
pub fn is_meta_param(name: &str) -> bool {
    name.starts_with('_')
}

/// Prediction about whether an event fires on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FiringPrediction {
    /// Fires unconditionally on page load
    AutoFire,
    /// Fires only under some interaction or condition
    Conditional,
    /// Must not fire on this page
    Forbidden,
}

impl FiringPrediction {
    /// Parse the wire value of the `_event_prediction` meta-parameter
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AUTO_FIRE" => Some(Self::AutoFire),
            "CONDITIONAL" => Some(Self::Conditional),
            "FORBIDDEN" => Some(Self::Forbidden),
            _ => None,
        }
    }

    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoFire => "AUTO_FIRE",
            Self::Conditional => "CONDITIONAL",
            Self::Forbidden => "FORBIDDEN",
        }
    }
}

impl std::fmt::Display for FiringPrediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter claimed by the prediction collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedParameter {
    pub name: String,
    pub value: String,
    /// Collaborator confidence in [0, 1]
    pub confidence: f64,
}

impl PredictedParameter {
    /// Create a predicted parameter
    pub fn new(name: impl Into<String>, value: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            confidence,
        }
    }

    /// Build the `_event_prediction` meta-parameter
    #[must_use]
    pub fn firing_meta(prediction: FiringPrediction) -> Self {
        Self::new(EVENT_PREDICTION_PARAM, prediction.as_str(), 1.0)
    }
}

/// One parameter row fetched from the analytics API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ga4Parameter {
    pub name: String,
    pub value: String,
    /// How many times this (parameter, value) pair was collected
    pub occurrence_count: u64,
}

impl Ga4Parameter {
    /// Create an analytics parameter row
    pub fn new(name: impl Into<String>, value: impl Into<String>, occurrence_count: u64) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            occurrence_count,
        }
    }

    /// Build the synthetic `_event_occurred` signal
    #[must_use]
    pub fn occurred_meta(occurred: bool, count: u64) -> Self {
        Self::new(
            EVENT_OCCURRED_PARAM,
            if occurred { "true" } else { "false" },
            count,
        )
    }
}

/// Occurrence signal read out of the actual parameter channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub occurred: bool,
    pub count: u64,
}

impl Occurrence {
    /// The event never showed up in collected data
    #[must_use]
    pub fn absent() -> Self {
        Self {
            occurred: false,
            count: 0,
        }
    }
}

/// One event observed on one page, with all three parameter channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchEventData {
    pub event_name: String,
    pub predicted_params: Vec<PredictedParameter>,
    pub actual_params: Vec<Ga4Parameter>,
    pub spec_params: Vec<SpecParameter>,
    pub collected_at: DateTime<Utc>,
}

impl BranchEventData {
    /// Create event data collected now
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            predicted_params: Vec::new(),
            actual_params: Vec::new(),
            spec_params: Vec::new(),
            collected_at: Utc::now(),
        }
    }

    /// With predicted parameters
    #[inline]
    #[must_use]
    pub fn with_predicted(mut self, params: Vec<PredictedParameter>) -> Self {
        self.predicted_params = params;
        self
    }

    /// With actual parameters
    #[inline]
    #[must_use]
    pub fn with_actual(mut self, params: Vec<Ga4Parameter>) -> Self {
        self.actual_params = params;
        self
    }

    /// With spec parameters
    #[inline]
    #[must_use]
    pub fn with_spec(mut self, params: Vec<SpecParameter>) -> Self {
        self.spec_params = params;
        self
    }

    /// Firing prediction, if the prediction channel carried one
    #[must_use]
    pub fn firing_prediction(&self) -> Option<FiringPrediction> {
        self.predicted_params
            .iter()
            .find(|p| p.name == EVENT_PREDICTION_PARAM)
            .and_then(|p| FiringPrediction::parse(&p.value))
    }

    /// Occurrence signal; absent meta-parameter reads as "did not occur"
    #[must_use]
    pub fn occurrence(&self) -> Occurrence {
        self.actual_params
            .iter()
            .find(|p| p.name == EVENT_OCCURRED_PARAM)
            .map(|p| Occurrence {
                occurred: p.value.eq_ignore_ascii_case("true"),
                count: p.occurrence_count,
            })
            .unwrap_or_else(Occurrence::absent)
    }
}
