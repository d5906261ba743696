//! Module preparation: build the jar, then move it somewhere awkward.

use crate::config::PipelineConfig;
use crate::core::{ArtifactKind, ModuleClass, ModuleDescriptor};
use crate::errors::{CdsflowError, MissingArtifactError};
use crate::paths::{create_escaped_dir, relocate_module};
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Produces the module jar.
pub trait ModuleBuilder: Send + Sync + Debug {
    /// Builds a jar for module `name` containing `classes` into `out_dir`
    /// and returns its path.
    fn build(
        &self,
        name: &str,
        classes: &[ModuleClass],
        out_dir: &Path,
    ) -> Result<PathBuf, CdsflowError>;
}

/// Copies a jar that was built elsewhere.
#[derive(Debug, Clone)]
pub struct PrebuiltJar {
    source: PathBuf,
}

impl PrebuiltJar {
    /// Creates a builder that copies `source`.
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl ModuleBuilder for PrebuiltJar {
    fn build(
        &self,
        name: &str,
        _classes: &[ModuleClass],
        out_dir: &Path,
    ) -> Result<PathBuf, CdsflowError> {
        if !self.source.is_file() {
            return Err(
                MissingArtifactError::new(ArtifactKind::ModuleJar, &self.source, "module-builder")
                    .into(),
            );
        }
        fs::create_dir_all(out_dir)?;
        let target = out_dir.join(format!("{name}.jar"));
        if target != self.source {
            fs::copy(&self.source, &target)?;
        }
        Ok(target)
    }
}

/// Builds the configured module and relocates it into the escaped directory.
///
/// Returns the descriptor pointing at the relocated jar.
pub fn prepare_module(
    builder: &dyn ModuleBuilder,
    config: &PipelineConfig,
) -> Result<ModuleDescriptor, CdsflowError> {
    let declared = config.module_descriptor();
    let jar = builder.build(declared.name(), declared.classes(), &config.work_dir)?;
    let built = declared.relocated(jar);

    let dir = create_escaped_dir(&config.work_dir, &config.escaped_dir_name)?;
    let module = relocate_module(&built, &dir)?;
    info!(
        module = %module.name(),
        jar = %module.jar_path().display(),
        "Module prepared"
    );
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_prepare_module_moves_jar_under_escaped_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("built.jar");
        fs::write(&source, b"PK").unwrap();

        let config = PipelineConfig::new().with_work_dir(dir.path());
        let module = prepare_module(&PrebuiltJar::new(&source), &config).unwrap();

        assert_eq!(
            module.jar_path(),
            dir.path().join("dir with space").join("mymodule.jar")
        );
        assert!(module.jar_path().is_file());
        assert!(!dir.path().join("mymodule.jar").exists());
        assert!(source.exists());
        assert_eq!(module.classes().len(), 2);
    }

    #[test]
    fn test_missing_prebuilt_jar() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new().with_work_dir(dir.path());
        let err = prepare_module(&PrebuiltJar::new(dir.path().join("nope.jar")), &config)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArtifact);
    }

    #[test]
    fn test_escaped_dir_blocked_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("built.jar");
        fs::write(&source, b"PK").unwrap();
        fs::write(dir.path().join("dir with space"), b"").unwrap();

        let config = PipelineConfig::new().with_work_dir(dir.path());
        let err = prepare_module(&PrebuiltJar::new(&source), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathConstruction);
    }
}
