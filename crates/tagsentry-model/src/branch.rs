//! Branch configuration and the declarative parameter spec
//!
//! A branch is an independently testable partition scoped to one content
//! group, with its own test URLs and expected events. Branch configs are
//! external input and stay read-only for the duration of a run.

use crate::ids::BranchId;
use serde::{Deserialize, Serialize};

/// Declarative contract for one event parameter
///
/// Used for compliance checking: a value is compliant when it appears in
/// `allowed_values` (if the enumeration is non-empty) or, for required
/// parameters, when it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecParameter {
    /// Parameter name as it appears in the analytics payload
    pub name: String,
    /// Whether the parameter must be collected
    pub required: bool,
    /// Allowed value enumeration; empty means any value
    #[serde(default)]
    pub allowed_values: Vec<String>,
    /// Free-form description from the spec document
    #[serde(default)]
    pub description: Option<String>,
}

impl SpecParameter {
    /// Create a spec parameter with no value enumeration
    #[inline]
    pub fn new(name: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            allowed_values: Vec::new(),
            description: None,
        }
    }

    /// With an allowed-value enumeration
    #[inline]
    #[must_use]
    pub fn with_allowed_values(mut self, values: Vec<String>) -> Self {
        self.allowed_values = values;
        self
    }

    /// With a description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check a collected value against this spec entry
    #[must_use]
    pub fn is_compliant(&self, value: &str) -> bool {
        if !self.allowed_values.is_empty() {
            return self.allowed_values.iter().any(|v| v == value);
        }
        if self.required {
            return !value.trim().is_empty();
        }
        true
    }
}

/// One event a branch is expected to fire, with its parameter contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedEvent {
    /// Event name ("page_view", "purchase", ...)
    pub name: String,
    /// Parameter contract for this event
    #[serde(default)]
    pub spec_params: Vec<SpecParameter>,
}

impl ExpectedEvent {
    /// Create an expected event with no parameter contract
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec_params: Vec::new(),
        }
    }

    /// With spec parameters
    #[inline]
    #[must_use]
    pub fn with_spec_params(mut self, params: Vec<SpecParameter>) -> Self {
        self.spec_params = params;
        self
    }
}

/// One content-group test unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Branch identifier from the configuration
    pub id: BranchId,
    /// Content group this branch exercises
    pub content_group: String,
    /// URLs to visit; each becomes one task
    pub test_urls: Vec<String>,
    /// Scheduling priority, lower runs first
    pub priority: u32,
    /// Events the branch is expected to fire
    pub expected_events: Vec<ExpectedEvent>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
}

impl BranchConfig {
    /// Create a branch config
    pub fn new(id: impl Into<BranchId>, content_group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_group: content_group.into(),
            test_urls: Vec::new(),
            priority: 1,
            expected_events: Vec::new(),
            description: None,
        }
    }

    /// With test URLs
    #[inline]
    #[must_use]
    pub fn with_test_urls(mut self, urls: Vec<String>) -> Self {
        self.test_urls = urls;
        self
    }

    /// With scheduling priority (lower runs first)
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// With expected events
    #[inline]
    #[must_use]
    pub fn with_expected_events(mut self, events: Vec<ExpectedEvent>) -> Self {
        self.expected_events = events;
        self
    }
}
