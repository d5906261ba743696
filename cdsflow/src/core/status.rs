//! Stage identities and the pipeline state machine.

use crate::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The stages of the archive pipeline, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Record the classes loaded by the module's main class.
    ClassList,
    /// Dump a static archive from the class list, then run with it.
    StaticArchive,
    /// Write a dynamic archive at process exit.
    DynamicArchive,
    /// Print the dynamic archive and check its contents.
    ValidateDynamicArchive,
}

impl StageId {
    /// All stages, in execution order.
    pub const ALL: [Self; 4] = [
        Self::ClassList,
        Self::StaticArchive,
        Self::DynamicArchive,
        Self::ValidateDynamicArchive,
    ];

    /// Returns the one-based stage index.
    #[must_use]
    pub fn index(&self) -> u8 {
        match self {
            Self::ClassList => 1,
            Self::StaticArchive => 2,
            Self::DynamicArchive => 3,
            Self::ValidateDynamicArchive => 4,
        }
    }

    /// Looks a stage up by its one-based index.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.index() == index)
    }

    /// Returns the stage name used in logs and events.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClassList => "class-list",
            Self::StaticArchive => "static-archive",
            Self::DynamicArchive => "dynamic-archive",
            Self::ValidateDynamicArchive => "validate-dynamic-archive",
        }
    }

    /// Returns the state the pipeline reaches when this stage succeeds.
    #[must_use]
    pub fn completed_state(&self) -> PipelineState {
        match self {
            Self::ClassList => PipelineState::ClassListGenerated,
            Self::StaticArchive => PipelineState::StaticArchiveBuiltAndUsed,
            Self::DynamicArchive => PipelineState::DynamicArchiveBuilt,
            Self::ValidateDynamicArchive => PipelineState::DynamicArchiveValidated,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The state of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing has run yet.
    #[default]
    Initial,
    /// The class list exists.
    ClassListGenerated,
    /// The static archive was dumped and used successfully.
    StaticArchiveBuiltAndUsed,
    /// The dynamic archive exists.
    DynamicArchiveBuilt,
    /// The dynamic archive was validated. Terminal.
    DynamicArchiveValidated,
    /// A stage failed. Terminal.
    FailedAtStage {
        /// One-based index of the failing stage.
        stage_index: u8,
        /// What went wrong.
        kind: ErrorKind,
    },
}

impl PipelineState {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DynamicArchiveValidated | Self::FailedAtStage { .. }
        )
    }

    /// Returns true if every stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::DynamicArchiveValidated)
    }

    /// Returns the next stage to run from this state, if any.
    #[must_use]
    pub fn next_stage(&self) -> Option<StageId> {
        match self {
            Self::Initial => Some(StageId::ClassList),
            Self::ClassListGenerated => Some(StageId::StaticArchive),
            Self::StaticArchiveBuiltAndUsed => Some(StageId::DynamicArchive),
            Self::DynamicArchiveBuilt => Some(StageId::ValidateDynamicArchive),
            Self::DynamicArchiveValidated | Self::FailedAtStage { .. } => None,
        }
    }

    /// Returns the failing stage index and kind for a failed state.
    #[must_use]
    pub fn failure(&self) -> Option<(u8, ErrorKind)> {
        match self {
            Self::FailedAtStage { stage_index, kind } => Some((*stage_index, *kind)),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::ClassListGenerated => write!(f, "class_list_generated"),
            Self::StaticArchiveBuiltAndUsed => write!(f, "static_archive_built_and_used"),
            Self::DynamicArchiveBuilt => write!(f, "dynamic_archive_built"),
            Self::DynamicArchiveValidated => write!(f, "dynamic_archive_validated"),
            Self::FailedAtStage { stage_index, kind } => {
                write!(f, "failed_at_stage({stage_index}, {kind})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_indices_are_sequential() {
        let indices: Vec<u8> = StageId::ALL.iter().map(StageId::index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(StageId::from_index(2), Some(StageId::StaticArchive));
        assert_eq!(StageId::from_index(0), None);
        assert_eq!(StageId::from_index(5), None);
    }

    #[test]
    fn test_state_machine_walks_all_stages() {
        let mut state = PipelineState::Initial;
        let mut visited = Vec::new();

        while let Some(stage) = state.next_stage() {
            visited.push(stage);
            state = stage.completed_state();
        }

        assert_eq!(visited, StageId::ALL.to_vec());
        assert!(state.is_success());
        assert!(state.is_terminal());
    }

    #[test]
    fn test_failed_state_is_terminal() {
        let state = PipelineState::FailedAtStage {
            stage_index: 2,
            kind: ErrorKind::UnexpectedExitCode,
        };

        assert!(state.is_terminal());
        assert!(!state.is_success());
        assert_eq!(state.next_stage(), None);
        assert_eq!(state.failure(), Some((2, ErrorKind::UnexpectedExitCode)));
        assert_eq!(state.to_string(), "failed_at_stage(2, UnexpectedExitCode)");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(StageId::ClassList.to_string(), "class-list");
        assert_eq!(
            StageId::ValidateDynamicArchive.to_string(),
            "validate-dynamic-archive"
        );
    }
}
