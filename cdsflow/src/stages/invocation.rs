//! A single child invocation and what its output must look like.

use crate::core::{Artifact, LoaderKind};
use regex::Regex;
use std::fmt;

/// A pattern matched against a step's combined output.
#[derive(Debug, Clone)]
pub enum OutputPattern {
    /// A literal substring.
    Literal(String),
    /// A regular expression.
    Regex(Regex),
    /// A listing line `: <class> <loader>` attributing a class to a loader.
    LoaderAttribution {
        /// Binary class name.
        class: String,
        /// Expected loader.
        loader: LoaderKind,
    },
}

impl OutputPattern {
    /// Creates a literal pattern.
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Creates a regex pattern.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Regex)
    }

    /// Creates a loader attribution pattern for a class.
    #[must_use]
    pub fn loader_attribution(class: impl Into<String>, loader: LoaderKind) -> Self {
        Self::LoaderAttribution {
            class: class.into(),
            loader,
        }
    }

    /// Returns true if the pattern occurs in `text`.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Literal(s) => text.contains(s.as_str()),
            Self::Regex(re) => re.is_match(text),
            Self::LoaderAttribution { class, loader } => text
                .lines()
                .any(|line| attributes(line, class, loader.as_str())),
        }
    }
}

/// Matches a listing line whose tokens contain `<..:> <class> <loader>`.
fn attributes(line: &str, class: &str, loader: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens
        .windows(3)
        .any(|w| w[0].ends_with(':') && w[1] == class && w[2] == loader)
}

impl fmt::Display for OutputPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "\"{s}\""),
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
            Self::LoaderAttribution { class, loader, .. } => write!(f, "\": {class} {loader}\""),
        }
    }
}

/// Expected exit code and output patterns for one step.
#[derive(Debug, Clone)]
pub struct Expectations {
    /// The exit code the child must return.
    pub exit_code: i32,
    /// Patterns that must occur in the output.
    pub required: Vec<OutputPattern>,
    /// Patterns that must not occur in the output.
    pub forbidden: Vec<OutputPattern>,
}

impl Default for Expectations {
    fn default() -> Self {
        Self::success()
    }
}

impl Expectations {
    /// Expects exit code 0 and nothing else.
    #[must_use]
    pub fn success() -> Self {
        Self::exit_code(0)
    }

    /// Expects the given exit code.
    #[must_use]
    pub fn exit_code(code: i32) -> Self {
        Self {
            exit_code: code,
            required: Vec::new(),
            forbidden: Vec::new(),
        }
    }

    /// Adds a required pattern.
    #[must_use]
    pub fn require(mut self, pattern: OutputPattern) -> Self {
        self.required.push(pattern);
        self
    }

    /// Adds a forbidden pattern.
    #[must_use]
    pub fn forbid(mut self, pattern: OutputPattern) -> Self {
        self.forbidden.push(pattern);
        self
    }

    /// Appends all patterns of `other`, keeping this exit code.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.required.extend(other.required);
        self.forbidden.extend(other.forbidden);
        self
    }
}

/// One child invocation within a stage.
#[derive(Debug, Clone)]
pub struct StageInvocation {
    /// Step name, e.g. `dump-archive`.
    pub step: String,
    /// Arguments after the launcher and VM options.
    pub args: Vec<String>,
    /// What the output must look like.
    pub expectations: Expectations,
    /// Artifacts that must exist before launch.
    pub consumes: Vec<Artifact>,
    /// Artifact that must exist after a successful launch.
    pub produces: Option<Artifact>,
}

impl StageInvocation {
    /// Creates an invocation expecting a clean exit.
    #[must_use]
    pub fn new(step: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            step: step.into(),
            args,
            expectations: Expectations::success(),
            consumes: Vec::new(),
            produces: None,
        }
    }

    /// Sets the expectations.
    #[must_use]
    pub fn with_expectations(mut self, expectations: Expectations) -> Self {
        self.expectations = expectations;
        self
    }

    /// Adds a consumed artifact.
    #[must_use]
    pub fn consuming(mut self, artifact: Artifact) -> Self {
        self.consumes.push(artifact);
        self
    }

    /// Sets the produced artifact.
    #[must_use]
    pub fn producing(mut self, artifact: Artifact) -> Self {
        self.produces = Some(artifact);
        self
    }

    /// Returns the argument vector as a single display string.
    #[must_use]
    pub fn command_line(&self) -> String {
        join_args(&self.args)
    }
}

/// Joins arguments for display, single-quoting any that contain whitespace.
pub fn join_args<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter()
        .map(|a| {
            let a = a.as_ref();
            if a.contains(char::is_whitespace) {
                format!("'{a}'")
            } else {
                a.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Shared archive is valid
  0: mypackage.Main app_loader
  1: mypackage.Another unregistered_loader
";

    #[test]
    fn test_loader_attribution_matches_listing_line() {
        let main = OutputPattern::loader_attribution("mypackage.Main", LoaderKind::AppLoader);
        let another =
            OutputPattern::loader_attribution("mypackage.Another", LoaderKind::UnregisteredLoader);
        let wrong = OutputPattern::loader_attribution("mypackage.Another", LoaderKind::AppLoader);

        assert!(main.matches(LISTING));
        assert!(another.matches(LISTING));
        assert!(!wrong.matches(LISTING));
    }

    #[test]
    fn test_loader_attribution_does_not_match_prefix() {
        let pattern = OutputPattern::loader_attribution("mypackage.Main", LoaderKind::AppLoader);
        assert!(!pattern.matches(": mypackage.MainHelper app_loader"));
        assert!(!pattern.matches(": mypackageXMain app_loader"));
    }

    #[test]
    fn test_literal_and_regex() {
        assert!(OutputPattern::literal("archive is valid").matches(LISTING));
        let re = OutputPattern::regex(r"\d+: mypackage\.\w+").unwrap();
        assert!(re.matches(LISTING));
        assert_eq!(re.to_string(), r"/\d+: mypackage\.\w+/");
    }

    #[test]
    fn test_command_line_quotes_spaces() {
        let invocation = StageInvocation::new(
            "use-archive",
            vec![
                "--module-path".to_string(),
                "/w/dir with space/mymodule.jar".to_string(),
            ],
        );
        assert_eq!(
            invocation.command_line(),
            "--module-path '/w/dir with space/mymodule.jar'"
        );
    }

    #[test]
    fn test_join_args_keeps_plain_arguments() {
        assert_eq!(
            join_args(["/opt/jdk/bin/java", "-Xshare:on", "a b"]),
            "/opt/jdk/bin/java -Xshare:on 'a b'"
        );
        assert_eq!(join_args(Vec::<String>::new()), "");
    }
}
