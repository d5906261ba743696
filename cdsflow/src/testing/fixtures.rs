//! Test fixtures for pipeline runs.

use crate::config::PipelineConfig;
use crate::core::{ModuleClass, ModuleDescriptor};
use crate::errors::CdsflowError;
use crate::events::EventSink;
use crate::pipeline::{prepare_module, ModuleBuilder, OrchestratorBuilder, PipelineOrchestrator};
use crate::process::ProcessLauncher;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An empty zip archive: just the end-of-central-directory record.
const EMPTY_JAR: [u8; 22] = [
    0x50, 0x4b, 0x05, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Writes an empty jar for the module. Enough for a scripted launcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderJar;

impl ModuleBuilder for PlaceholderJar {
    fn build(
        &self,
        name: &str,
        _classes: &[ModuleClass],
        out_dir: &Path,
    ) -> Result<PathBuf, CdsflowError> {
        fs::create_dir_all(out_dir)?;
        let jar = out_dir.join(format!("{name}.jar"));
        fs::write(&jar, EMPTY_JAR)?;
        Ok(jar)
    }
}

/// A scratch directory configured for a pipeline run.
#[derive(Debug, Clone)]
pub struct TestWorkspace {
    config: PipelineConfig,
}

impl TestWorkspace {
    /// Creates a workspace rooted at `root` with default names.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            config: PipelineConfig::new()
                .with_work_dir(root)
                .with_java_launcher("scripted-java"),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the configuration for modification.
    pub fn config_mut(&mut self) -> &mut PipelineConfig {
        &mut self.config
    }

    /// Builds a placeholder jar and relocates it into the escaped directory.
    pub fn prepare(&self) -> Result<ModuleDescriptor, CdsflowError> {
        prepare_module(&PlaceholderJar, &self.config)
    }

    /// Returns a builder for an orchestrator over this workspace.
    #[must_use]
    pub fn builder(
        &self,
        module: ModuleDescriptor,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder::from_config(&self.config, module).with_launcher(launcher)
    }

    /// Builds an orchestrator with the given launcher and event sink.
    pub fn orchestrator(
        &self,
        module: ModuleDescriptor,
        launcher: Arc<dyn ProcessLauncher>,
        events: Arc<dyn EventSink>,
    ) -> Result<PipelineOrchestrator, CdsflowError> {
        self.builder(module, launcher).with_event_sink(events).build()
    }

    /// Writes a stale file at the archive path, optionally read-only.
    pub fn plant_stale_archive(&self, read_only: bool) -> Result<PathBuf, CdsflowError> {
        let path = self.config.work_dir.join(&self.config.archive_name);
        fs::write(&path, b"stale archive")?;
        if read_only {
            let mut permissions = fs::metadata(&path)?.permissions();
            permissions.set_readonly(true);
            fs::set_permissions(&path, permissions)?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_jar_is_empty_zip() {
        let dir = tempfile::tempdir().unwrap();
        let jar = PlaceholderJar.build("mymodule", &[], dir.path()).unwrap();
        let bytes = fs::read(jar).unwrap();
        assert_eq!(&bytes[..4], b"PK\x05\x06");
    }

    #[test]
    fn test_plant_read_only_archive() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = TestWorkspace::new(dir.path());
        let path = workspace.plant_stale_archive(true).unwrap();
        assert!(fs::metadata(&path).unwrap().permissions().readonly());
    }
}
