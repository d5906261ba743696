//! The process-spawning capability.
//!
//! Stages never spawn processes directly. They hand an argument vector to a
//! [`ProcessLauncher`], which runs the child to completion and returns its
//! exit code and captured output.

mod java;
mod log;

pub use java::JavaLauncher;
pub use log::StageLog;

use crate::errors::CdsflowError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Exit code recorded when the child was terminated by a signal.
pub const SIGNALLED_EXIT_CODE: i32 = -1;

/// What a child process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// The exit code.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ProcessOutput {
    /// Creates a new process output.
    #[must_use]
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Creates a successful output with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self::new(0, stdout, "")
    }
}

/// Runs a child process to completion.
///
/// Implementations block (asynchronously) until the child has terminated.
/// A non-zero exit is returned as data, never as an error; errors are
/// reserved for children that could not be started or did not finish.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Returns a short name for the launched program, used in diagnostics.
    fn program(&self) -> String;

    /// Launches the program with `args` and waits for it to exit.
    async fn launch(&self, args: &[String]) -> Result<ProcessOutput, CdsflowError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_output() {
        let output = ProcessOutput::success("archive is valid");
        assert_eq!(output.exit_code, 0);
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_mock_launcher_returns_scripted_output() {
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .withf(|args| args.iter().any(|a| a == "-Xshare:dump"))
            .times(1)
            .returning(|_| Ok(ProcessOutput::new(1, "", "Error occurred during initialization")));

        let output = launcher
            .launch(&["-Xshare:dump".to_string()])
            .await
            .unwrap();
        assert_eq!(output.exit_code, 1);
    }
}
