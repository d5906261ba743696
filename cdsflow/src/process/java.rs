//! Tokio-backed launcher for the Java runtime.

use super::{ProcessLauncher, ProcessOutput, SIGNALLED_EXIT_CODE};
use crate::errors::CdsflowError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Launches the configured `java` executable.
///
/// Configured VM options are placed before each stage's own arguments.
/// Every child is bounded by `timeout`; a child that outlives it is killed.
#[derive(Debug, Clone)]
pub struct JavaLauncher {
    program: PathBuf,
    vm_options: Vec<String>,
    timeout: Duration,
}

impl JavaLauncher {
    /// Creates a launcher for the given executable with a 120s bound.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            vm_options: Vec::new(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Sets the VM options placed before every argument vector.
    #[must_use]
    pub fn with_vm_options(mut self, options: Vec<String>) -> Self {
        self.vm_options = options;
        self
    }

    /// Sets the bound on each child.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the full argument vector passed to the executable.
    #[must_use]
    pub fn full_args(&self, args: &[String]) -> Vec<String> {
        self.vm_options.iter().chain(args).cloned().collect()
    }
}

#[async_trait]
impl ProcessLauncher for JavaLauncher {
    fn program(&self) -> String {
        self.program.display().to_string()
    }

    async fn launch(&self, args: &[String]) -> Result<ProcessOutput, CdsflowError> {
        let full_args = self.full_args(args);
        debug!(program = %self.program.display(), args = ?full_args, "Launching child");

        let mut cmd = Command::new(&self.program);
        cmd.args(&full_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| CdsflowError::process_launch(self.program(), e))?;

        // Dropping the wait future on timeout drops the child, which kills it.
        match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ProcessOutput {
                exit_code: output.status.code().unwrap_or(SIGNALLED_EXIT_CODE),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(e)) => Err(CdsflowError::process_launch(self.program(), e)),
            Err(_) => {
                warn!(
                    program = %self.program.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "Child did not exit in time; killed"
                );
                Err(CdsflowError::process_timeout(
                    self.program(),
                    self.timeout.as_secs(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_vm_options_come_first() {
        let launcher = JavaLauncher::new("java").with_vm_options(vec!["-Xlog:cds".to_string()]);
        let args = launcher.full_args(&["-Xshare:dump".to_string()]);
        assert_eq!(args, vec!["-Xlog:cds", "-Xshare:dump"]);
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_error() {
        let launcher = JavaLauncher::new("/nonexistent/bin/java");
        let err = launcher.launch(&["-version".to_string()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessLaunch);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_exit_code_and_streams() {
        let launcher = JavaLauncher::new("sh");
        let output = launcher
            .launch(&[
                "-c".to_string(),
                "echo 'archive is valid'; echo oops >&2; exit 3".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout.trim(), "archive is valid");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_argument_with_space_is_one_token() {
        let launcher = JavaLauncher::new("sh");
        let output = launcher
            .launch(&[
                "-c".to_string(),
                r#"printf '%s\n' "$0""#.to_string(),
                "/work/dir with space/mymodule.jar".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(output.stdout.trim_end(), "/work/dir with space/mymodule.jar");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_child() {
        let launcher = JavaLauncher::new("sh").with_timeout(Duration::from_millis(200));
        let err = launcher
            .launch(&["-c".to_string(), "sleep 5".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProcessTimeout);
    }
}
