//! Error types for the cdsflow pipeline.
//!
//! Every error is fatal to a pipeline run. Stage-level failures are wrapped
//! into a [`PipelineFailure`] that names the stage and the step that failed.

use crate::core::{ArtifactKind, PipelineState, StageId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cdsflow operations.
#[derive(Debug, Error)]
pub enum CdsflowError {
    /// A directory that needs escaping could not be created.
    #[error("{0}")]
    PathConstruction(#[from] PathConstructionError),

    /// An artifact that should exist was not found.
    #[error("{0}")]
    MissingArtifact(#[from] MissingArtifactError),

    /// The process-spawning capability could not start the child.
    #[error("Failed to launch '{program}': {reason}")]
    ProcessLaunch {
        /// The program that was launched.
        program: String,
        /// Why the launch failed.
        reason: String,
    },

    /// The child process did not terminate within the configured bound.
    #[error("Process '{program}' did not exit within {timeout_secs}s")]
    ProcessTimeout {
        /// The program that was launched.
        program: String,
        /// The configured bound in seconds.
        timeout_secs: u64,
    },

    /// A stale artifact could not be deleted after clearing its protection.
    #[error("Could not delete {kind} at {}: {source}", .path.display())]
    ArtifactRemoval {
        /// Kind of the artifact.
        kind: ArtifactKind,
        /// Path of the artifact.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A stage was requested that cannot run from the current state.
    #[error("Stage '{stage}' cannot run from state {state}")]
    StageOrder {
        /// The requested stage.
        stage: StageId,
        /// The state the pipeline was in.
        state: PipelineState,
    },

    /// The captured output of a step violated its expectations.
    #[error("{0}")]
    Validation(#[from] StageValidationReport),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CdsflowError {
    /// Creates a process launch error.
    #[must_use]
    pub fn process_launch(program: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ProcessLaunch {
            program: program.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a process timeout error.
    #[must_use]
    pub fn process_timeout(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self::ProcessTimeout {
            program: program.into(),
            timeout_secs,
        }
    }

    /// Creates a stage order error.
    #[must_use]
    pub fn stage_order(stage: StageId, state: PipelineState) -> Self {
        Self::StageOrder { stage, state }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the primary kind of this error.
    ///
    /// For validation failures this is the kind of the first violation.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PathConstruction(_) => ErrorKind::PathConstruction,
            Self::MissingArtifact(_) => ErrorKind::MissingArtifact,
            Self::ProcessLaunch { .. } => ErrorKind::ProcessLaunch,
            Self::ProcessTimeout { .. } => ErrorKind::ProcessTimeout,
            Self::ArtifactRemoval { .. } => ErrorKind::ArtifactRemoval,
            Self::StageOrder { .. } => ErrorKind::StageOrder,
            Self::Validation(report) => report.primary_kind(),
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Flat classification of [`CdsflowError`], used in pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Directory creation failed.
    PathConstruction,
    /// Postcondition artifact absent.
    MissingArtifact,
    /// The child could not be spawned.
    ProcessLaunch,
    /// The child exceeded its time bound.
    ProcessTimeout,
    /// Deletion denied after clearing protection.
    ArtifactRemoval,
    /// Stage requested out of order or after a terminal state.
    StageOrder,
    /// Exit code differed from the expected one.
    UnexpectedExitCode,
    /// A required pattern was absent from the output.
    MissingExpectedOutput,
    /// A forbidden pattern was present in the output.
    UnexpectedOutput,
    /// Invalid configuration.
    Config,
    /// Other I/O failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathConstruction => write!(f, "PathConstructionError"),
            Self::MissingArtifact => write!(f, "MissingArtifact"),
            Self::ProcessLaunch => write!(f, "ProcessLaunchError"),
            Self::ProcessTimeout => write!(f, "ProcessTimeout"),
            Self::ArtifactRemoval => write!(f, "ArtifactRemoval"),
            Self::StageOrder => write!(f, "StageOrderError"),
            Self::UnexpectedExitCode => write!(f, "UnexpectedExitCode"),
            Self::MissingExpectedOutput => write!(f, "MissingExpectedOutput"),
            Self::UnexpectedOutput => write!(f, "UnexpectedOutput"),
            Self::Config => write!(f, "ConfigError"),
            Self::Io => write!(f, "IoError"),
        }
    }
}

/// Error raised when an escaped directory cannot be constructed.
#[derive(Debug, Error)]
#[error("Cannot create directory {}: {reason}", .path.display())]
pub struct PathConstructionError {
    /// The directory that was requested.
    pub path: PathBuf,
    /// Why creation failed.
    pub reason: String,
}

impl PathConstructionError {
    /// Creates a new path construction error.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Error raised when an artifact is absent where it must exist.
#[derive(Debug, Clone, Error)]
#[error("Missing {kind} at {}: expected to be produced by stage '{producer}'", .path.display())]
pub struct MissingArtifactError {
    /// Kind of the missing artifact.
    pub kind: ArtifactKind,
    /// Where it was expected.
    pub path: PathBuf,
    /// The stage (or step) that should have produced it.
    pub producer: String,
}

impl MissingArtifactError {
    /// Creates a new missing artifact error.
    #[must_use]
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>, producer: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            producer: producer.into(),
        }
    }
}

/// A single violated expectation on a step's captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationFailure {
    /// The child exited with a different code than expected.
    UnexpectedExitCode {
        /// Expected exit code.
        expected: i32,
        /// Actual exit code.
        actual: i32,
    },
    /// A required pattern was not found.
    MissingExpectedOutput {
        /// The pattern, as displayed.
        pattern: String,
    },
    /// A forbidden pattern was found.
    UnexpectedOutput {
        /// The pattern, as displayed.
        pattern: String,
    },
}

impl ValidationFailure {
    /// Returns the error kind of this failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnexpectedExitCode { .. } => ErrorKind::UnexpectedExitCode,
            Self::MissingExpectedOutput { .. } => ErrorKind::MissingExpectedOutput,
            Self::UnexpectedOutput { .. } => ErrorKind::UnexpectedOutput,
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedExitCode { expected, actual } => {
                write!(f, "expected exit code {expected}, got {actual}")
            }
            Self::MissingExpectedOutput { pattern } => {
                write!(f, "expected output not found: {pattern}")
            }
            Self::UnexpectedOutput { pattern } => {
                write!(f, "unexpected output found: {pattern}")
            }
        }
    }
}

/// All expectation violations collected for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageValidationReport {
    /// The step whose output was validated.
    pub step: String,
    /// Every violation, in check order.
    pub failures: Vec<ValidationFailure>,
}

impl StageValidationReport {
    /// Creates an empty report for a step.
    #[must_use]
    pub fn new(step: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            failures: Vec::new(),
        }
    }

    /// Records a violation.
    pub fn push(&mut self, failure: ValidationFailure) {
        self.failures.push(failure);
    }

    /// Returns true if no violations were recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the kind of the first violation.
    #[must_use]
    pub fn primary_kind(&self) -> ErrorKind {
        self.failures
            .first()
            .map_or(ErrorKind::UnexpectedOutput, ValidationFailure::kind)
    }

    /// Returns true if any violation has the given kind.
    #[must_use]
    pub fn contains_kind(&self, kind: ErrorKind) -> bool {
        self.failures.iter().any(|f| f.kind() == kind)
    }

    /// Converts the report into a result, failing if any violation was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for StageValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Step '{}' failed {} check(s): ",
            self.step,
            self.failures.len()
        )?;
        let parts: Vec<String> = self.failures.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for StageValidationReport {}

/// A pipeline run failure, naming the first failing stage and its cause.
#[derive(Debug, Error)]
#[error("Pipeline failed at stage {stage_index} ({stage}){}: {cause}", step_suffix(.step))]
pub struct PipelineFailure {
    /// One-based index of the failing stage.
    pub stage_index: u8,
    /// The failing stage.
    pub stage: StageId,
    /// The step within the stage, if the failure happened inside one.
    pub step: Option<String>,
    /// The underlying cause.
    #[source]
    pub cause: CdsflowError,
}

fn step_suffix(step: &Option<String>) -> String {
    step.as_ref()
        .map(|s| format!(", step '{s}'"))
        .unwrap_or_default()
}

impl PipelineFailure {
    /// Creates a new pipeline failure.
    #[must_use]
    pub fn new(stage: StageId, cause: CdsflowError) -> Self {
        Self {
            stage_index: stage.index(),
            stage,
            step: None,
            cause,
        }
    }

    /// Sets the failing step.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Returns the primary kind of the cause.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    /// Returns the validation report, if the cause was a validation failure.
    #[must_use]
    pub fn validation_report(&self) -> Option<&StageValidationReport> {
        match &self.cause {
            CdsflowError::Validation(report) => Some(report),
            _ => None,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("stage_index".to_string(), serde_json::json!(self.stage_index));
        map.insert("stage".to_string(), serde_json::json!(self.stage.name()));
        map.insert("kind".to_string(), serde_json::json!(self.kind().to_string()));
        map.insert("message".to_string(), serde_json::json!(self.cause.to_string()));

        if let Some(ref step) = self.step {
            map.insert("step".to_string(), serde_json::json!(step));
        }
        if let Some(report) = self.validation_report() {
            map.insert("failures".to_string(), serde_json::json!(report.failures));
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_collects_in_order() {
        let mut report = StageValidationReport::new("dump-archive");
        report.push(ValidationFailure::UnexpectedExitCode {
            expected: 0,
            actual: 1,
        });
        report.push(ValidationFailure::MissingExpectedOutput {
            pattern: "archive is valid".to_string(),
        });

        assert!(!report.is_clean());
        assert_eq!(report.primary_kind(), ErrorKind::UnexpectedExitCode);
        assert!(report.contains_kind(ErrorKind::MissingExpectedOutput));
        assert!(!report.contains_kind(ErrorKind::UnexpectedOutput));

        let message = report.to_string();
        assert!(message.contains("dump-archive"));
        assert!(message.contains("2 check(s)"));
        assert!(message.contains("expected exit code 0, got 1"));
    }

    #[test]
    fn test_clean_report_into_result() {
        assert!(StageValidationReport::new("use-archive").into_result().is_ok());
    }

    #[test]
    fn test_error_kind_from_validation() {
        let mut report = StageValidationReport::new("validate-dynamic");
        report.push(ValidationFailure::UnexpectedOutput {
            pattern: "Error".to_string(),
        });
        let err = CdsflowError::from(report);
        assert_eq!(err.kind(), ErrorKind::UnexpectedOutput);
    }

    #[test]
    fn test_missing_artifact_message_names_producer() {
        let err = MissingArtifactError::new(ArtifactKind::ClassList, "/tmp/list.txt", "class-list");
        let message = err.to_string();
        assert!(message.contains("class list"));
        assert!(message.contains("class-list"));
    }

    #[test]
    fn test_pipeline_failure_to_dict() {
        let failure = PipelineFailure::new(
            StageId::StaticArchive,
            CdsflowError::process_launch("java", "No such file or directory"),
        )
        .with_step("dump-archive");

        assert_eq!(failure.stage_index, 2);
        assert_eq!(failure.kind(), ErrorKind::ProcessLaunch);

        let dict = failure.to_dict();
        assert_eq!(dict.get("stage_index").unwrap(), 2);
        assert_eq!(dict.get("kind").unwrap(), "ProcessLaunchError");
        assert_eq!(dict.get("step").unwrap(), "dump-archive");
        assert!(failure.to_string().contains("step 'dump-archive'"));
    }

    #[test]
    fn test_validation_failure_serialize() {
        let failure = ValidationFailure::UnexpectedExitCode {
            expected: 0,
            actual: 134,
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["type"], "unexpected_exit_code");
        assert_eq!(json["actual"], 134);
    }
}
