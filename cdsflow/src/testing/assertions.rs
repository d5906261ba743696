//! Test assertions for pipeline runs.

use crate::core::{Artifact, PipelineState};
use crate::errors::ErrorKind;
use crate::events::CollectingEventSink;
use crate::pipeline::PipelineResult;

/// Asserts that every stage succeeded.
pub fn assert_succeeded(result: &PipelineResult) {
    assert!(
        result.is_success(),
        "Expected success, got {}: {:?}",
        result.final_state(),
        result.failure().map(ToString::to_string)
    );
}

/// Asserts that the run failed at stage `index` with `kind`.
pub fn assert_failed_at(result: &PipelineResult, index: u8, kind: ErrorKind) {
    assert_eq!(
        result.final_state(),
        PipelineState::FailedAtStage {
            stage_index: index,
            kind
        },
        "Unexpected final state; failure: {:?}",
        result.failure().map(ToString::to_string)
    );
}

/// Asserts that an artifact exists on disk.
pub fn assert_artifact_present(artifact: &Artifact) {
    assert!(artifact.exists(), "Expected {artifact} to exist");
}

/// Asserts that an artifact does not exist on disk.
pub fn assert_artifact_absent(artifact: &Artifact) {
    assert!(!artifact.exists(), "Expected {artifact} to be absent");
}

/// Asserts that `expected` event names occur in this relative order.
/// Other events may appear in between.
pub fn assert_events_in_order(sink: &CollectingEventSink, expected: &[&str]) {
    let names = sink.names();
    let mut remaining = names.iter();
    for name in expected {
        assert!(
            remaining.any(|n| n == name),
            "Event '{name}' missing or out of order in {names:?}"
        );
    }
}
