//! Engine configuration
//!
//! One explicit config object, built once at process start and passed by
//! reference into the orchestrator and the comparison engine. There is no
//! process-wide mutable state anywhere in the core.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the engine and the comparison algorithm
///
/// The noise and forbidden thresholds are empirical cutoffs inherited from
/// observed analytics traffic, not statistical constants; treat them as
/// per-deployment tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of parallel worker loops
    pub concurrency: usize,
    /// When false, the first task failure fails the whole branch
    pub continue_on_error: bool,
    /// Occurrence counts below this are treated as noise
    pub noise_count_threshold: u64,
    /// Forbidden events occurring below this count still read as quiet
    pub forbidden_count_threshold: u64,
    /// Enable Levenshtein-based partial value matching
    pub partial_matching: bool,
    /// Similarity above this counts as a partial match
    pub partial_match_threshold: f64,
    /// Case-fold values during normalization
    pub case_insensitive: bool,
    /// Ring-buffer capacity for progress event history
    pub history_capacity: usize,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With worker concurrency
    #[inline]
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// With continue-on-error policy
    #[inline]
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// With noise threshold
    #[inline]
    #[must_use]
    pub fn with_noise_threshold(mut self, threshold: u64) -> Self {
        self.noise_count_threshold = threshold;
        self
    }

    /// With forbidden-occurrence dampening threshold
    #[inline]
    #[must_use]
    pub fn with_forbidden_threshold(mut self, threshold: u64) -> Self {
        self.forbidden_count_threshold = threshold;
        self
    }

    /// With partial matching enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_partial_matching(mut self, enabled: bool) -> Self {
        self.partial_matching = enabled;
        self
    }

    /// With case-insensitive normalization
    #[inline]
    #[must_use]
    pub fn with_case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            continue_on_error: true,
            noise_count_threshold: 10,
            forbidden_count_threshold: 1000,
            partial_matching: true,
            partial_match_threshold: 0.8,
            case_insensitive: true,
            history_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = EngineConfig::new();
        assert_eq!(config.noise_count_threshold, 10);
        assert_eq!(config.forbidden_count_threshold, 1000);
        assert_eq!(config.partial_match_threshold, 0.8);
        assert_eq!(config.concurrency, 4);
        assert!(config.continue_on_error);
    }

    #[test]
    fn builder_chain() {
        let config = EngineConfig::new()
            .with_concurrency(8)
            .with_continue_on_error(false)
            .with_noise_threshold(5);

        assert_eq!(config.concurrency, 8);
        assert!(!config.continue_on_error);
        assert_eq!(config.noise_count_threshold, 5);
    }
}
