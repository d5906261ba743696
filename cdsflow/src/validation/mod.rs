//! Output validation for a finished step.
//!
//! Validation is a pure function of a [`StageOutcome`] and its
//! [`Expectations`]. Every violation is collected before the step is failed,
//! in a fixed order: exit code, then required patterns, then forbidden ones.

mod archive;

pub use archive::{archive_content_expectations, VALIDITY_MARKER};

use crate::errors::{StageValidationReport, ValidationFailure};
use crate::stages::{Expectations, StageOutcome};

/// Checks captured output against expectations.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputValidator;

impl OutputValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates one step's outcome, returning every violation on failure.
    pub fn validate(
        &self,
        outcome: &StageOutcome,
        expectations: &Expectations,
    ) -> Result<(), StageValidationReport> {
        let mut report = StageValidationReport::new(&outcome.step);

        if outcome.exit_code != expectations.exit_code {
            report.push(ValidationFailure::UnexpectedExitCode {
                expected: expectations.exit_code,
                actual: outcome.exit_code,
            });
        }

        let text = outcome.combined_output();
        for pattern in &expectations.required {
            if !pattern.matches(&text) {
                report.push(ValidationFailure::MissingExpectedOutput {
                    pattern: pattern.to_string(),
                });
            }
        }
        for pattern in &expectations.forbidden {
            if pattern.matches(&text) {
                report.push(ValidationFailure::UnexpectedOutput {
                    pattern: pattern.to_string(),
                });
            }
        }

        report.into_result()
    }
}
