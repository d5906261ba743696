//! Configuration for an archive pipeline run.

use crate::artifacts::Platform;
use crate::core::{Artifact, LoaderKind, ModuleDescriptor};
use crate::errors::CdsflowError;
use crate::pipeline::ArtifactSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A class to bundle into the test module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Binary name, e.g. `mypackage.Another`.
    pub name: String,
    /// Expected loader attribution.
    #[serde(default = "default_loader")]
    pub loader: LoaderKind,
}

fn default_loader() -> LoaderKind {
    LoaderKind::UnregisteredLoader
}

/// Configuration for a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory all relative artifact names are resolved against.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// Name of the subdirectory the module jar is moved into.
    #[serde(default = "default_escaped_dir_name")]
    pub escaped_dir_name: String,
    /// File name of the class list.
    #[serde(default = "default_class_list_name")]
    pub class_list_name: String,
    /// File name shared by the static and dynamic archives.
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
    /// Module name.
    #[serde(default = "default_module_name")]
    pub module_name: String,
    /// Main class binary name.
    #[serde(default = "default_main_class")]
    pub main_class: String,
    /// Additional classes bundled in the module.
    #[serde(default = "default_classes")]
    pub classes: Vec<ClassConfig>,
    /// A prebuilt module jar to relocate into the escaped directory.
    #[serde(default)]
    pub module_jar: Option<PathBuf>,
    /// The Java launcher to invoke.
    #[serde(default = "default_java_launcher")]
    pub java_launcher: PathBuf,
    /// Options placed before every stage's own arguments.
    #[serde(default)]
    pub vm_options: Vec<String>,
    /// Upper bound on each child process, in seconds.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
    /// Where stage stdout/stderr logs are written, relative to `work_dir`.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Platform override; detected at runtime when absent.
    #[serde(default)]
    pub platform: Option<Platform>,
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_escaped_dir_name() -> String {
    "dir with space".to_string()
}

fn default_class_list_name() -> String {
    "test-classlist.txt".to_string()
}

fn default_archive_name() -> String {
    "test-dynamic.jsa".to_string()
}

fn default_module_name() -> String {
    "mymodule".to_string()
}

fn default_main_class() -> String {
    "mypackage.Main".to_string()
}

fn default_classes() -> Vec<ClassConfig> {
    vec![ClassConfig {
        name: "mypackage.Another".to_string(),
        loader: LoaderKind::UnregisteredLoader,
    }]
}

fn default_java_launcher() -> PathBuf {
    std::env::var_os("JAVA_HOME").map_or_else(
        || PathBuf::from("java"),
        |home| PathBuf::from(home).join("bin").join("java"),
    )
}

fn default_stage_timeout_secs() -> u64 {
    120
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            escaped_dir_name: default_escaped_dir_name(),
            class_list_name: default_class_list_name(),
            archive_name: default_archive_name(),
            module_name: default_module_name(),
            main_class: default_main_class(),
            classes: default_classes(),
            module_jar: None,
            java_launcher: default_java_launcher(),
            vm_options: Vec::new(),
            stage_timeout_secs: default_stage_timeout_secs(),
            log_dir: default_log_dir(),
            platform: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON, filling omitted fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CdsflowError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CdsflowError::config(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, CdsflowError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CdsflowError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Sets the Java launcher.
    #[must_use]
    pub fn with_java_launcher(mut self, launcher: impl Into<PathBuf>) -> Self {
        self.java_launcher = launcher.into();
        self
    }

    /// Sets the prebuilt module jar.
    #[must_use]
    pub fn with_module_jar(mut self, jar: impl Into<PathBuf>) -> Self {
        self.module_jar = Some(jar.into());
        self
    }

    /// Sets the per-child timeout, rounded up to whole seconds.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout_secs = timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0);
        self
    }

    /// Sets the platform override.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<(), CdsflowError> {
        for (field, value) in [
            ("escaped_dir_name", &self.escaped_dir_name),
            ("class_list_name", &self.class_list_name),
            ("archive_name", &self.archive_name),
            ("module_name", &self.module_name),
            ("main_class", &self.main_class),
        ] {
            if value.trim().is_empty() {
                return Err(CdsflowError::config(format!("{field} cannot be empty")));
            }
        }
        if self.escaped_dir_name.contains(['/', '\\']) {
            return Err(CdsflowError::config(
                "escaped_dir_name must be a single path component",
            ));
        }
        if self.stage_timeout_secs == 0 {
            return Err(CdsflowError::config("stage_timeout_secs must be positive"));
        }
        Ok(())
    }

    /// Returns the per-child timeout.
    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Returns the platform, detecting it when not overridden.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    /// Returns the resolved log directory.
    #[must_use]
    pub fn resolved_log_dir(&self) -> PathBuf {
        self.work_dir.join(&self.log_dir)
    }

    /// Returns the directory the module jar is relocated into.
    #[must_use]
    pub fn escaped_dir(&self) -> PathBuf {
        self.work_dir.join(&self.escaped_dir_name)
    }

    /// Returns the module descriptor declared by this configuration.
    ///
    /// The jar path is where the module builder is expected to leave the jar,
    /// before relocation.
    #[must_use]
    pub fn module_descriptor(&self) -> ModuleDescriptor {
        let jar = self
            .work_dir
            .join(format!("{}.jar", self.module_name));
        self.classes.iter().fold(
            ModuleDescriptor::new(&self.module_name, &self.main_class, jar),
            |module, class| module.with_class_loader(&class.name, class.loader),
        )
    }

    /// Returns the artifacts of a run for the given (relocated) module.
    #[must_use]
    pub fn artifact_set(&self, module: &ModuleDescriptor) -> ArtifactSet {
        let archive = self.work_dir.join(&self.archive_name);
        ArtifactSet {
            module_jar: Artifact::module_jar(module.jar_path()),
            class_list: Artifact::class_list(self.work_dir.join(&self.class_list_name)),
            static_archive: Artifact::static_archive(&archive),
            dynamic_archive: Artifact::dynamic_archive(archive),
        }
    }
}
