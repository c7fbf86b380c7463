//! TagSentry comparison engine
//!
//! Pure functions from (predicted, actual, spec) triples to verdicts,
//! issues and accuracy scores. The engine never returns errors and never
//! panics on degenerate input; missing data yields zeroed statistics.
//!
//! # Example
//!
//! ```rust
//! use tagsentry_compare::ComparisonEngine;
//! use tagsentry_model::EngineConfig;
//!
//! let engine = ComparisonEngine::new(EngineConfig::default());
//! let comparison = engine.compare_parameter("page_type", Some("home"), None, None);
//! assert!(!comparison.matched);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod engine;
pub mod normalize;
pub mod similarity;

pub use engine::{ActualValue, ComparisonEngine};
pub use normalize::normalize_value;
pub use similarity::normalized_similarity;
