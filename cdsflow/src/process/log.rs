//! Per-step output logs.

use super::ProcessOutput;
use crate::errors::CdsflowError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Writes each step's captured output to `<dir>/<step>-<n>.stdout|stderr`.
///
/// `n` counts launches within a run, starting at 0, so repeated step names
/// never overwrite each other. [`StageLog::reset`] starts a new run.
#[derive(Debug)]
pub struct StageLog {
    dir: PathBuf,
    counter: AtomicUsize,
}

impl StageLog {
    /// Creates a log rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicUsize::new(0),
        }
    }

    /// Returns the log directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Restarts numbering at 0.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::SeqCst);
    }

    /// Writes the output of one launch and returns the stdout log path.
    pub async fn record(&self, step: &str, output: &ProcessOutput) -> Result<PathBuf, CdsflowError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        tokio::fs::create_dir_all(&self.dir).await?;

        let stdout_path = self.dir.join(format!("{step}-{n}.stdout"));
        let stderr_path = self.dir.join(format!("{step}-{n}.stderr"));
        tokio::fs::write(&stdout_path, &output.stdout).await?;
        tokio::fs::write(&stderr_path, &output.stderr).await?;

        debug!(step, path = %stdout_path.display(), "Wrote step log");
        Ok(stdout_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logs_are_numbered_per_launch() {
        let dir = tempfile::tempdir().unwrap();
        let log = StageLog::new(dir.path().join("logs"));

        let first = log
            .record("dynamic-archive", &ProcessOutput::new(0, "out", "err"))
            .await
            .unwrap();
        let second = log
            .record("dynamic-archive", &ProcessOutput::success("again"))
            .await
            .unwrap();

        assert!(first.ends_with("dynamic-archive-0.stdout"));
        assert!(second.ends_with("dynamic-archive-1.stdout"));
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "out");

        log.reset();
        let third = log
            .record("create-list", &ProcessOutput::success("next run"))
            .await
            .unwrap();
        assert!(third.ends_with("create-list-0.stdout"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("logs/dynamic-archive-0.stderr")).unwrap(),
            "err"
        );
    }
}
