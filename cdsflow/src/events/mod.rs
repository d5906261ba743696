//! Pipeline lifecycle events.
//!
//! The orchestrator reports its progress through an [`EventSink`] handed to
//! it at build time. Event names are fixed strings, listed in [`names`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Names of the events the orchestrator emits.
pub mod names {
    /// A run began.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// A stale artifact was deleted before its producer ran.
    pub const ARTIFACT_DELETED: &str = "artifact.deleted";
    /// A stage's preconditions held and its first step is about to launch.
    pub const STAGE_STARTED: &str = "stage.started";
    /// One step exited and passed validation.
    pub const STEP_COMPLETED: &str = "step.completed";
    /// A stage's postcondition held.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage failed; no further stages run.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// Every stage succeeded.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// The run ended in a failed state.
    pub const PIPELINE_FAILED: &str = "pipeline.failed";

    /// All event names in the order a successful run first emits them.
    pub const ALL: [&str; 8] = [
        PIPELINE_STARTED,
        ARTIFACT_DELETED,
        STAGE_STARTED,
        STEP_COMPLETED,
        STAGE_COMPLETED,
        STAGE_FAILED,
        PIPELINE_COMPLETED,
        PIPELINE_FAILED,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_dotted() {
        for name in names::ALL {
            let (scope, action) = name.split_once('.').unwrap();
            assert!(["pipeline", "artifact", "stage", "step"].contains(&scope));
            assert!(!action.is_empty());
        }
    }
}
