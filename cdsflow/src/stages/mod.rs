//! Stage runner: launches one step and captures what it printed.

mod invocation;
mod outcome;

pub use invocation::{join_args, Expectations, OutputPattern, StageInvocation};
pub use outcome::StageOutcome;

use crate::errors::CdsflowError;
use crate::process::{ProcessLauncher, StageLog};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Runs invocations through a [`ProcessLauncher`], one at a time.
///
/// The runner never retries and never interprets output; that is the
/// validator's job.
#[derive(Clone)]
pub struct StageRunner {
    launcher: Arc<dyn ProcessLauncher>,
    log: Option<Arc<StageLog>>,
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner")
            .field("program", &self.launcher.program())
            .field("log", &self.log)
            .finish()
    }
}

impl StageRunner {
    /// Creates a runner without output logging.
    #[must_use]
    pub fn new(launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            launcher,
            log: None,
        }
    }

    /// Writes each step's output through `log`.
    #[must_use]
    pub fn with_log(mut self, log: StageLog) -> Self {
        self.log = Some(Arc::new(log));
        self
    }

    /// Returns the launched program, for diagnostics.
    #[must_use]
    pub fn program(&self) -> String {
        self.launcher.program()
    }

    /// Restarts step log numbering for a new run.
    pub fn start_run(&self) {
        if let Some(ref log) = self.log {
            log.reset();
        }
    }

    /// Launches the invocation and waits for the child to exit.
    pub async fn run(&self, invocation: &StageInvocation) -> Result<StageOutcome, CdsflowError> {
        debug!(
            step = %invocation.step,
            args = %invocation.command_line(),
            "Running step"
        );

        let started_at = Utc::now();
        let start = Instant::now();
        let output = self.launcher.launch(&invocation.args).await?;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let log_path = match self.log {
            Some(ref log) => match log.record(&invocation.step, &output).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(step = %invocation.step, error = %e, "Could not write step log");
                    None
                }
            },
            None => None,
        };

        let mut outcome =
            StageOutcome::from_output(&invocation.step, output, started_at, duration_ms);
        if let Some(path) = log_path {
            outcome = outcome.with_log_path(path);
        }

        debug!(
            step = %invocation.step,
            exit_code = outcome.exit_code,
            duration_ms,
            "Step exited"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::process::{MockProcessLauncher, ProcessOutput};

    #[tokio::test]
    async fn test_run_passes_args_verbatim() {
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .withf(|args| args == ["--module-path", "/w/dir with space/mymodule.jar"])
            .times(1)
            .returning(|_| Ok(ProcessOutput::new(0, "hello", "warn")));

        let runner = StageRunner::new(Arc::new(launcher));
        let invocation = StageInvocation::new(
            "use-archive",
            vec![
                "--module-path".to_string(),
                "/w/dir with space/mymodule.jar".to_string(),
            ],
        );

        let outcome = runner.run(&invocation).await.unwrap();
        assert_eq!(outcome.step, "use-archive");
        assert_eq!(outcome.stdout, "hello");
        assert_eq!(outcome.stderr, "warn");
        assert!(outcome.log_path.is_none());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .returning(|_| Ok(ProcessOutput::new(1, "", "")));

        let runner = StageRunner::new(Arc::new(launcher));
        let outcome = runner
            .run(&StageInvocation::new("dump-archive", Vec::new()))
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 1);
    }

    #[tokio::test]
    async fn test_launch_error_propagates() {
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .returning(|_| Err(CdsflowError::process_launch("java", "not found")));

        let runner = StageRunner::new(Arc::new(launcher));
        let err = runner
            .run(&StageInvocation::new("create-list", Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessLaunch);
    }

    #[tokio::test]
    async fn test_run_writes_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .returning(|_| Ok(ProcessOutput::success("archive is valid")));

        let runner =
            StageRunner::new(Arc::new(launcher)).with_log(StageLog::new(dir.path().join("logs")));
        let outcome = runner
            .run(&StageInvocation::new("validate-dynamic", Vec::new()))
            .await
            .unwrap();

        let log_path = outcome.log_path.unwrap();
        assert!(log_path.ends_with("validate-dynamic-0.stdout"));
        assert_eq!(std::fs::read_to_string(log_path).unwrap(), "archive is valid");
    }
}
