//! Captured result of one step.

use crate::process::ProcessOutput;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// What a step left behind: exit code, both streams, and timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Step name.
    pub step: String,
    /// The child's exit code.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// When the child was launched.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Where stdout was logged, if logging is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl StageOutcome {
    /// Creates an outcome from a process output.
    #[must_use]
    pub fn from_output(
        step: impl Into<String>,
        output: ProcessOutput,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            step: step.into(),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            started_at,
            duration_ms,
            log_path: None,
        }
    }

    /// Sets the log path.
    #[must_use]
    pub fn with_log_path(mut self, path: PathBuf) -> Self {
        self.log_path = Some(path);
        self
    }

    /// Returns stdout followed by stderr, the text patterns are matched against.
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        combined.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&self.stderr);
        combined
    }

    /// Converts to a dictionary representation, without the captured streams.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("step".to_string(), serde_json::json!(self.step));
        map.insert("exit_code".to_string(), serde_json::json!(self.exit_code));
        map.insert(
            "started_at".to_string(),
            serde_json::json!(self.started_at.to_rfc3339()),
        );
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        if let Some(ref path) = self.log_path {
            map.insert(
                "log_path".to_string(),
                serde_json::json!(path.display().to_string()),
            );
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output_separates_streams() {
        let outcome = StageOutcome::from_output(
            "dump-archive",
            ProcessOutput::new(1, "Loading classes", "Error: bad list"),
            Utc::now(),
            12,
        );
        assert_eq!(outcome.combined_output(), "Loading classes\nError: bad list");
    }

    #[test]
    fn test_combined_output_without_stderr() {
        let outcome =
            StageOutcome::from_output("use-archive", ProcessOutput::success("ok\n"), Utc::now(), 3);
        assert_eq!(outcome.combined_output(), "ok\n");
    }

    #[test]
    fn test_to_dict_omits_streams() {
        let outcome =
            StageOutcome::from_output("create-list", ProcessOutput::success("x"), Utc::now(), 7);
        let dict = outcome.to_dict();
        assert_eq!(dict.get("exit_code").unwrap(), 0);
        assert_eq!(dict.get("duration_ms").unwrap(), 7);
        assert!(!dict.contains_key("stdout"));
    }
}
