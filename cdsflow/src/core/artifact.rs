//! Filesystem artifacts produced and consumed by pipeline stages.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The logical kind of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The packaged test module.
    ModuleJar,
    /// The recorded list of loaded classes.
    ClassList,
    /// An archive dumped explicitly from a class list.
    StaticArchive,
    /// An archive written at process exit.
    DynamicArchive,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleJar => write!(f, "module jar"),
            Self::ClassList => write!(f, "class list"),
            Self::StaticArchive => write!(f, "static archive"),
            Self::DynamicArchive => write!(f, "dynamic archive"),
        }
    }
}

/// A named filesystem entity whose presence is a stage pre- or postcondition.
///
/// Existence is not stored; [`Artifact::exists`] reads the filesystem on every call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artifact {
    /// The kind of artifact.
    pub kind: ArtifactKind,
    /// Where the artifact lives.
    pub path: PathBuf,
}

impl Artifact {
    /// Creates a new artifact.
    #[must_use]
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Creates a module jar artifact.
    #[must_use]
    pub fn module_jar(path: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactKind::ModuleJar, path)
    }

    /// Creates a class list artifact.
    #[must_use]
    pub fn class_list(path: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactKind::ClassList, path)
    }

    /// Creates a static archive artifact.
    #[must_use]
    pub fn static_archive(path: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactKind::StaticArchive, path)
    }

    /// Creates a dynamic archive artifact.
    #[must_use]
    pub fn dynamic_archive(path: impl Into<PathBuf>) -> Self {
        Self::new(ArtifactKind::DynamicArchive, path)
    }

    /// Returns the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the artifact currently exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.symlink_metadata().is_ok()
    }

    /// Returns true if both artifacts refer to the same on-disk name.
    #[must_use]
    pub fn shares_path_with(&self, other: &Self) -> bool {
        self.path == other.path
    }

    /// Converts the artifact to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("kind".to_string(), serde_json::json!(self.kind));
        map.insert(
            "path".to_string(),
            serde_json::json!(self.path.display().to_string()),
        );
        map.insert("exists".to_string(), serde_json::json!(self.exists()));
        map
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.path.display())
    }
}
