//! Artifact store: existence checks and idempotent deletion.

mod protection;

pub use protection::{FileProtection, Platform, PlainRemoval, ReadOnlyClearing};

use crate::core::Artifact;
use crate::errors::{CdsflowError, MissingArtifactError};
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tracks stage artifacts on disk.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    protection: Arc<dyn FileProtection>,
}

impl ArtifactStore {
    /// Creates a store using the given deletion capability.
    #[must_use]
    pub fn new(protection: Arc<dyn FileProtection>) -> Self {
        Self { protection }
    }

    /// Creates a store for a platform.
    #[must_use]
    pub fn for_platform(platform: Platform) -> Self {
        Self::new(platform.protection())
    }

    /// Deletes the artifact if it exists.
    ///
    /// Returns `true` if a file was deleted. Succeeds silently when the
    /// artifact is already absent, so calling it twice never fails.
    pub fn ensure_absent(&self, artifact: &Artifact) -> Result<bool, CdsflowError> {
        if !artifact.exists() {
            debug!(artifact = %artifact, "Artifact already absent");
            return Ok(false);
        }

        if let Err(e) = self.protection.clear_protection(artifact.path()) {
            // Only a failed removal is fatal.
            warn!(artifact = %artifact, error = %e, "Could not clear protection");
        }

        match self.protection.remove(artifact.path()) {
            Ok(()) => {
                debug!(artifact = %artifact, "Deleted stale artifact");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CdsflowError::ArtifactRemoval {
                kind: artifact.kind,
                path: artifact.path.clone(),
                source,
            }),
        }
    }

    /// Fails with [`MissingArtifactError`] if the artifact does not exist.
    ///
    /// `producer` names the stage or step that should have created it.
    pub fn assert_present(
        &self,
        artifact: &Artifact,
        producer: &str,
    ) -> Result<(), MissingArtifactError> {
        if artifact.exists() {
            Ok(())
        } else {
            Err(MissingArtifactError::new(
                artifact.kind,
                artifact.path.clone(),
                producer,
            ))
        }
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::for_platform(Platform::current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArtifactKind;
    use crate::errors::ErrorKind;
    use parking_lot::Mutex;
    use std::fs;
    use std::path::{Path, PathBuf};

    #[derive(Debug, Default)]
    struct RecordingProtection {
        calls: Mutex<Vec<String>>,
        deny_removal: bool,
    }

    impl FileProtection for RecordingProtection {
        fn clear_protection(&self, _path: &Path) -> io::Result<()> {
            self.calls.lock().push("clear".to_string());
            Ok(())
        }

        fn remove(&self, path: &Path) -> io::Result<()> {
            self.calls.lock().push("remove".to_string());
            if self.deny_removal {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            fs::remove_file(path)
        }
    }

    fn stale_archive(dir: &Path) -> PathBuf {
        let path = dir.join("test-dynamic.jsa");
        fs::write(&path, b"stale").unwrap();
        path
    }

    #[test]
    fn test_ensure_absent_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact::static_archive(stale_archive(dir.path()));
        let store = ArtifactStore::default();

        assert!(store.ensure_absent(&artifact).unwrap());
        assert!(!artifact.exists());
        assert!(!store.ensure_absent(&artifact).unwrap());
    }

    #[test]
    fn test_ensure_absent_clears_before_removing() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact::dynamic_archive(stale_archive(dir.path()));
        let protection = Arc::new(RecordingProtection::default());
        let store = ArtifactStore::new(protection.clone());

        store.ensure_absent(&artifact).unwrap();
        assert_eq!(*protection.calls.lock(), vec!["clear", "remove"]);
    }

    #[test]
    fn test_ensure_absent_skips_capability_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact::class_list(dir.path().join("missing.txt"));
        let protection = Arc::new(RecordingProtection::default());
        let store = ArtifactStore::new(protection.clone());

        assert!(!store.ensure_absent(&artifact).unwrap());
        assert!(protection.calls.lock().is_empty());
    }

    #[test]
    fn test_ensure_absent_reports_denied_removal() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact::static_archive(stale_archive(dir.path()));
        let store = ArtifactStore::new(Arc::new(RecordingProtection {
            deny_removal: true,
            ..Default::default()
        }));

        let err = store.ensure_absent(&artifact).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactRemoval);
        assert!(artifact.exists());
    }

    #[test]
    fn test_read_only_stale_archive_is_removed() {
        let dir = tempfile::tempdir().unwrap();

        for platform in [Platform::current(), Platform::Windows] {
            let path = stale_archive(dir.path());
            let mut permissions = fs::metadata(&path).unwrap().permissions();
            permissions.set_readonly(true);
            fs::set_permissions(&path, permissions).unwrap();

            let artifact = Artifact::static_archive(&path);
            let store = ArtifactStore::for_platform(platform);
            store.ensure_absent(&artifact).unwrap();
            assert!(!artifact.exists(), "not removed on {platform}");
        }
    }

    #[test]
    fn test_assert_present_names_producer() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact::class_list(dir.path().join("test-classlist.txt"));
        let store = ArtifactStore::default();

        let err = store.assert_present(&artifact, "class-list").unwrap_err();
        assert_eq!(err.kind, ArtifactKind::ClassList);
        assert_eq!(err.producer, "class-list");

        fs::write(artifact.path(), b"java/lang/Object").unwrap();
        assert!(store.assert_present(&artifact, "class-list").is_ok());
    }
}
