//! Expectations for an archive content listing.

use crate::core::ModuleDescriptor;
use crate::stages::{Expectations, OutputPattern};

/// Printed by the runtime when an archive passes its own checks.
pub const VALIDITY_MARKER: &str = "archive is valid";

/// Returns what a listing of an archive built from `module` must contain.
///
/// The listing must carry the validity marker and attribute every declared
/// class to its declared loader.
#[must_use]
pub fn archive_content_expectations(module: &ModuleDescriptor) -> Expectations {
    module.classes().iter().fold(
        Expectations::success().require(OutputPattern::literal(VALIDITY_MARKER)),
        |expectations, class| {
            expectations.require(OutputPattern::loader_attribution(&class.name, class.loader))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, ValidationFailure};
    use crate::process::ProcessOutput;
    use crate::stages::StageOutcome;
    use crate::validation::OutputValidator;
    use chrono::Utc;

    fn module() -> ModuleDescriptor {
        ModuleDescriptor::new("mymodule", "mypackage.Main", "mymodule.jar")
            .with_class("mypackage.Another")
    }

    fn listing(stdout: &str) -> StageOutcome {
        StageOutcome::from_output(
            "validate-dynamic",
            ProcessOutput::success(stdout),
            Utc::now(),
            0,
        )
    }

    #[test]
    fn test_listing_with_both_loaders_passes() {
        let outcome = listing(
            "Shared archive is valid\n\
             0x0000000800001000: mypackage.Main app_loader\n\
             0x0000000800001200: mypackage.Another unregistered_loader\n",
        );
        let expectations = archive_content_expectations(&module());
        assert_eq!(expectations.required.len(), 3);
        assert!(OutputValidator::new().validate(&outcome, &expectations).is_ok());
    }

    #[test]
    fn test_wrong_loader_is_missing_output() {
        let outcome = listing(
            "archive is valid\n\
             0: mypackage.Main app_loader\n\
             1: mypackage.Another app_loader\n",
        );
        let report = OutputValidator::new()
            .validate(&outcome, &archive_content_expectations(&module()))
            .unwrap_err();

        assert_eq!(report.primary_kind(), ErrorKind::MissingExpectedOutput);
        assert_eq!(
            report.failures,
            vec![ValidationFailure::MissingExpectedOutput {
                pattern: "\": mypackage.Another unregistered_loader\"".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_marker_is_reported() {
        let outcome = listing("0: mypackage.Main app_loader\n1: mypackage.Another unregistered_loader");
        let report = OutputValidator::new()
            .validate(&outcome, &archive_content_expectations(&module()))
            .unwrap_err();
        assert_eq!(report.failures.len(), 1);
        assert!(report.to_string().contains(VALIDITY_MARKER));
    }
}
