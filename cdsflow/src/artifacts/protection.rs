//! Platform-conditional file protection handling.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// The platform the pipeline is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Windows, where a read-only attribute blocks deletion.
    Windows,
    /// Linux.
    Linux,
    /// macOS.
    MacOs,
    /// Any other Unix-like platform.
    Other,
}

impl Platform {
    /// Detects the running platform.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }

    /// Returns true if a read-only attribute must be cleared before deletion.
    #[must_use]
    pub fn enforces_read_only(&self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Returns the protection capability for this platform.
    #[must_use]
    pub fn protection(&self) -> Arc<dyn FileProtection> {
        if self.enforces_read_only() {
            Arc::new(ReadOnlyClearing)
        } else {
            Arc::new(PlainRemoval)
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "macos"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Capability used by the artifact store to delete files.
pub trait FileProtection: Send + Sync + Debug {
    /// Clears any protection that would make deletion fail.
    fn clear_protection(&self, path: &Path) -> io::Result<()>;

    /// Removes the file.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Removes files without touching their attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRemoval;

impl FileProtection for PlainRemoval {
    fn clear_protection(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Clears the read-only attribute before removing a file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyClearing;

impl FileProtection for ReadOnlyClearing {
    #[allow(clippy::permissions_set_readonly_false)]
    fn clear_protection(&self, path: &Path) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_only_file(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("test-dynamic.jsa");
        fs::write(&path, b"archive").unwrap();
        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).unwrap();
        path
    }

    #[test]
    fn test_only_windows_enforces_read_only() {
        assert!(Platform::Windows.enforces_read_only());
        assert!(!Platform::Linux.enforces_read_only());
        assert!(!Platform::MacOs.enforces_read_only());
    }

    #[test]
    fn test_read_only_clearing() {
        let dir = tempfile::tempdir().unwrap();
        let path = read_only_file(dir.path());

        ReadOnlyClearing.clear_protection(&path).unwrap();
        assert!(!fs::metadata(&path).unwrap().permissions().readonly());

        ReadOnlyClearing.remove(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_platform_serialize() {
        let json = serde_json::to_string(&Platform::MacOs).unwrap();
        assert_eq!(json, r#""mac_os""#);
        let parsed: Platform = serde_json::from_str(r#""windows""#).unwrap();
        assert_eq!(parsed, Platform::Windows);
    }
}
