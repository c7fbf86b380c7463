//! Testing utilities for the TagSentry workspace
//!
//! Shared fixtures for branch configurations, spec parameters and
//! collected event data.

#![allow(missing_docs)]

use tagsentry_model::{
    BranchConfig, BranchEventData, ExpectedEvent, FiringPrediction, Ga4Parameter,
    PredictedParameter, SpecParameter,
};

pub fn create_spec_param(name: &str, required: bool) -> SpecParameter {
    SpecParameter::new(name, required)
}

pub fn create_enum_spec_param(name: &str, allowed: &[&str]) -> SpecParameter {
    SpecParameter::new(name, true)
        .with_allowed_values(allowed.iter().map(ToString::to_string).collect())
}

pub fn create_expected_event(name: &str, params: Vec<SpecParameter>) -> ExpectedEvent {
    ExpectedEvent::new(name).with_spec_params(params)
}

pub fn create_branch(id: &str, content_group: &str, urls: &[&str]) -> BranchConfig {
    BranchConfig::new(id, content_group)
        .with_test_urls(urls.iter().map(ToString::to_string).collect())
        .with_expected_events(vec![create_expected_event(
            "page_view",
            vec![create_spec_param("page_location", true)],
        )])
}

pub fn create_branch_with_priority(
    id: &str,
    content_group: &str,
    urls: &[&str],
    priority: u32,
) -> BranchConfig {
    create_branch(id, content_group, urls).with_priority(priority)
}

/// Event data carrying a firing prediction and an occurrence marker,
/// plus one predicted/actual parameter pair per supplied name.
pub fn create_event_data(
    event_name: &str,
    prediction: FiringPrediction,
    occurred: bool,
    count: u64,
    param_pairs: &[(&str, &str, &str)],
) -> BranchEventData {
    let mut predicted = vec![PredictedParameter::firing_meta(prediction)];
    let mut actual = vec![Ga4Parameter::occurred_meta(occurred, count)];
    for (name, predicted_value, actual_value) in param_pairs {
        predicted.push(PredictedParameter::new(*name, *predicted_value, 0.9));
        actual.push(Ga4Parameter::new(*name, *actual_value, count.max(1)));
    }
    BranchEventData::new(event_name)
        .with_predicted(predicted)
        .with_actual(actual)
}

pub fn create_matching_event(event_name: &str) -> BranchEventData {
    create_event_data(
        event_name,
        FiringPrediction::AutoFire,
        true,
        50,
        &[("page_location", "https://shop.example/p/1", "https://shop.example/p/1")],
    )
    .with_spec(vec![create_spec_param("page_location", true)])
}
