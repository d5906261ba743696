//! Paths whose names need escaping.
//!
//! The module jar is deliberately placed under a directory whose name
//! contains characters that must be escaped inside a URI or a shell token.
//! This module creates that directory, moves the jar into it, and provides
//! the argument and URI forms the consuming runtime will see.

use crate::core::ModuleDescriptor;
use crate::errors::{CdsflowError, PathConstructionError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Characters that change meaning inside a URI path or an unquoted shell token.
const ESCAPE_SENSITIVE: &[char] = &[' ', '%', '#', '?', '&', '[', ']', '\'', '"', '\t'];

/// Returns true if `name` contains a character that needs escaping.
#[must_use]
pub fn needs_escaping(name: &str) -> bool {
    name.contains(ESCAPE_SENSITIVE) || !name.is_ascii()
}

/// Creates `base/name` as a real directory.
///
/// An existing directory is accepted. A non-directory entry at that path, or
/// any I/O failure, is a [`PathConstructionError`].
pub fn create_escaped_dir(base: &Path, name: &str) -> Result<PathBuf, PathConstructionError> {
    let dir = base.join(name);

    match fs::symlink_metadata(&dir) {
        Ok(meta) if meta.is_dir() => {
            debug!(path = %dir.display(), "Escaped directory already exists");
            return Ok(dir);
        }
        Ok(_) => {
            return Err(PathConstructionError::new(
                &dir,
                "a non-directory entry already exists at this path",
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(PathConstructionError::new(&dir, e.to_string())),
    }

    fs::create_dir_all(&dir).map_err(|e| PathConstructionError::new(&dir, e.to_string()))?;
    debug!(
        path = %dir.display(),
        needs_escaping = needs_escaping(name),
        "Created escaped directory"
    );
    Ok(dir)
}

/// Moves the module jar into `dir` as `<module>.jar`.
///
/// Falls back to copy-and-delete when a rename crosses filesystems.
pub fn relocate_module(
    module: &ModuleDescriptor,
    dir: &Path,
) -> Result<ModuleDescriptor, CdsflowError> {
    let target = dir.join(format!("{}.jar", module.name()));
    if module.jar_path() == target {
        return Ok(module.clone());
    }

    if fs::rename(module.jar_path(), &target).is_err() {
        fs::copy(module.jar_path(), &target)?;
        fs::remove_file(module.jar_path())?;
    }

    debug!(
        from = %module.jar_path().display(),
        to = %target.display(),
        "Relocated module jar"
    );
    Ok(module.relocated(target))
}

/// Returns the `--module-path` value for a jar.
///
/// The value is a single argv element; it is never split on whitespace and
/// never quoted, since no shell sits between the launcher and the child.
#[must_use]
pub fn module_path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Converts a path into a percent-encoded `file:` URI.
///
/// Relative paths are resolved against the current directory first.
pub fn to_file_uri(path: &Path) -> Result<Url, CdsflowError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute).map_err(|()| {
        CdsflowError::config(format!(
            "cannot express {} as a file URI",
            absolute.display()
        ))
    })
}

/// Decodes a `file:` URI back into a filesystem path.
pub fn from_file_uri(uri: &Url) -> Result<PathBuf, CdsflowError> {
    uri.to_file_path()
        .map_err(|()| CdsflowError::config(format!("not a local file URI: {uri}")))
}
