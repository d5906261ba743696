//! Aggregate results of a pipeline run.

use crate::core::{Artifact, PipelineState, StageId};
use crate::errors::PipelineFailure;
use crate::stages::StageOutcome;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// What one stage did.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// The stage.
    pub stage: StageId,
    /// Stale artifacts deleted before the first step.
    pub deleted: Vec<Artifact>,
    /// Outcomes of the steps that ran, in order.
    pub steps: Vec<StageOutcome>,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl StageReport {
    /// Creates an empty report for a stage that is about to start.
    #[must_use]
    pub fn new(stage: StageId) -> Self {
        Self {
            stage,
            deleted: Vec::new(),
            steps: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Returns the outcome of the named step, if it ran.
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StageOutcome> {
        self.steps.iter().find(|s| s.step == name)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("stage".to_string(), serde_json::json!(self.stage.name()));
        map.insert("index".to_string(), serde_json::json!(self.stage.index()));
        map.insert(
            "deleted".to_string(),
            serde_json::json!(self
                .deleted
                .iter()
                .map(|a| a.path.display().to_string())
                .collect::<Vec<_>>()),
        );
        map.insert(
            "steps".to_string(),
            serde_json::json!(self.steps.iter().map(StageOutcome::to_dict).collect::<Vec<_>>()),
        );
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum Terminal {
    /// Every stage succeeded.
    AllStagesSucceeded,
    /// A stage failed and no later stage ran.
    FailedAtStage(PipelineFailure),
}

/// The result of [`PipelineOrchestrator::run`](super::PipelineOrchestrator::run).
#[derive(Debug)]
pub struct PipelineResult {
    /// How the run ended.
    pub terminal: Terminal,
    /// Reports of the stages that started, including a failed one.
    pub stages: Vec<StageReport>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Returns true if every stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.terminal, Terminal::AllStagesSucceeded)
    }

    /// Returns the failure, if the run failed.
    #[must_use]
    pub fn failure(&self) -> Option<&PipelineFailure> {
        match self.terminal {
            Terminal::FailedAtStage(ref failure) => Some(failure),
            Terminal::AllStagesSucceeded => None,
        }
    }

    /// Returns the terminal state of the state machine.
    #[must_use]
    pub fn final_state(&self) -> PipelineState {
        match self.terminal {
            Terminal::AllStagesSucceeded => PipelineState::DynamicArchiveValidated,
            Terminal::FailedAtStage(ref failure) => PipelineState::FailedAtStage {
                stage_index: failure.stage_index,
                kind: failure.kind(),
            },
        }
    }

    /// Returns the report of a stage, if it started.
    #[must_use]
    pub fn stage(&self, id: StageId) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == id)
    }

    /// Returns true if the stage started at all.
    #[must_use]
    pub fn ran(&self, id: StageId) -> bool {
        self.stage(id).is_some()
    }

    /// Converts into a `Result`, keeping the stage reports on success.
    pub fn into_result(self) -> Result<Vec<StageReport>, PipelineFailure> {
        match self.terminal {
            Terminal::AllStagesSucceeded => Ok(self.stages),
            Terminal::FailedAtStage(failure) => Err(failure),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert(
            "state".to_string(),
            serde_json::json!(self.final_state().to_string()),
        );
        map.insert("success".to_string(), serde_json::json!(self.is_success()));
        map.insert(
            "stages".to_string(),
            serde_json::json!(self.stages.iter().map(StageReport::to_dict).collect::<Vec<_>>()),
        );
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        if let Some(failure) = self.failure() {
            map.insert("failure".to_string(), serde_json::json!(failure.to_dict()));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{CdsflowError, ErrorKind};

    #[test]
    fn test_failed_result_state() {
        let result = PipelineResult {
            terminal: Terminal::FailedAtStage(
                PipelineFailure::new(
                    StageId::StaticArchive,
                    CdsflowError::process_timeout("java", 120),
                )
                .with_step("dump-archive"),
            ),
            stages: vec![
                StageReport::new(StageId::ClassList),
                StageReport::new(StageId::StaticArchive),
            ],
            duration_ms: 5,
        };

        assert!(!result.is_success());
        assert!(result.ran(StageId::StaticArchive));
        assert!(!result.ran(StageId::DynamicArchive));
        assert_eq!(
            result.final_state(),
            PipelineState::FailedAtStage {
                stage_index: 2,
                kind: ErrorKind::ProcessTimeout
            }
        );

        let dict = result.to_dict();
        assert_eq!(dict.get("state").unwrap(), "failed_at_stage(2, ProcessTimeout)");
        assert_eq!(dict.get("failure").unwrap()["step"], "dump-archive");
        assert!(result.into_result().is_err());
    }

    #[test]
    fn test_successful_result_state() {
        let result = PipelineResult {
            terminal: Terminal::AllStagesSucceeded,
            stages: StageId::ALL.iter().map(|id| StageReport::new(*id)).collect(),
            duration_ms: 0,
        };
        assert_eq!(result.final_state(), PipelineState::DynamicArchiveValidated);
        assert_eq!(result.into_result().unwrap().len(), 4);
    }
}
