//! Orchestrator builder.

use super::{ArtifactSet, PipelineOrchestrator, StageDefinition};
use crate::artifacts::{ArtifactStore, FileProtection, Platform};
use crate::config::PipelineConfig;
use crate::core::ModuleDescriptor;
use crate::errors::CdsflowError;
use crate::events::{EventSink, NoOpEventSink};
use crate::process::{JavaLauncher, ProcessLauncher, StageLog};
use crate::stages::StageRunner;
use std::path::PathBuf;
use std::sync::Arc;

/// Assembles a [`PipelineOrchestrator`] from its collaborators.
///
/// Only the launcher is mandatory. The artifact store defaults to the
/// running platform's, events are discarded and step logs are not written
/// unless configured.
pub struct OrchestratorBuilder {
    artifacts: ArtifactSet,
    module: ModuleDescriptor,
    launcher: Option<Arc<dyn ProcessLauncher>>,
    store: ArtifactStore,
    events: Arc<dyn EventSink>,
    log_dir: Option<PathBuf>,
    config_error: Option<CdsflowError>,
}

impl OrchestratorBuilder {
    /// Creates a builder for the given artifacts and (relocated) module.
    #[must_use]
    pub fn new(artifacts: ArtifactSet, module: ModuleDescriptor) -> Self {
        Self {
            artifacts,
            module,
            launcher: None,
            store: ArtifactStore::default(),
            events: Arc::new(NoOpEventSink),
            log_dir: None,
            config_error: None,
        }
    }

    /// Creates a builder wired from configuration: a [`JavaLauncher`] with
    /// the configured VM options and timeout, the configured platform's
    /// store, and step logs under the configured log directory. An invalid
    /// configuration is reported by [`build`](Self::build).
    #[must_use]
    pub fn from_config(config: &PipelineConfig, module: ModuleDescriptor) -> Self {
        let launcher = JavaLauncher::new(&config.java_launcher)
            .with_vm_options(config.vm_options.clone())
            .with_timeout(config.stage_timeout());

        let mut builder = Self::new(config.artifact_set(&module), module)
            .with_launcher(Arc::new(launcher))
            .with_platform(config.platform())
            .with_log_dir(config.resolved_log_dir());
        builder.config_error = config.validate().err();
        builder
    }

    /// Sets the process launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Uses the deletion capability of `platform`.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.store = ArtifactStore::for_platform(platform);
        self
    }

    /// Uses a specific deletion capability.
    #[must_use]
    pub fn with_protection(mut self, protection: Arc<dyn FileProtection>) -> Self {
        self.store = ArtifactStore::new(protection);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Writes step output logs under `dir`.
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Replaces the artifact set.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: ArtifactSet) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration given to
    /// [`from_config`](Self::from_config) is invalid, if no launcher was
    /// set, or if the module jar artifact does not point at the module's jar.
    pub fn build(self) -> Result<PipelineOrchestrator, CdsflowError> {
        if let Some(err) = self.config_error {
            return Err(err);
        }
        let launcher = self
            .launcher
            .ok_or_else(|| CdsflowError::config("no process launcher configured"))?;

        if self.artifacts.module_jar.path() != self.module.jar_path() {
            return Err(CdsflowError::config(format!(
                "module jar artifact {} does not match module jar {}",
                self.artifacts.module_jar.path().display(),
                self.module.jar_path().display()
            )));
        }

        let mut runner = StageRunner::new(launcher);
        if let Some(dir) = self.log_dir {
            runner = runner.with_log(StageLog::new(dir));
        }

        let definitions = StageDefinition::all(&self.artifacts, &self.module);
        Ok(PipelineOrchestrator::new(
            definitions,
            self.artifacts,
            self.module,
            runner,
            self.store,
            self.events,
        ))
    }
}
