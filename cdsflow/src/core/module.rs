//! The packaged test module and its declared class composition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The loader a class is expected to be attributed to in an archive listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderKind {
    /// The application loader, for classes launched directly.
    AppLoader,
    /// A custom loader that is not registered with the runtime.
    UnregisteredLoader,
}

impl LoaderKind {
    /// Returns the identity the runtime prints for this loader.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppLoader => "app_loader",
            Self::UnregisteredLoader => "unregistered_loader",
        }
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A class bundled in the module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleClass {
    /// Binary name, e.g. `mypackage.Main`.
    pub name: String,
    /// Expected loader attribution.
    pub loader: LoaderKind,
}

impl ModuleClass {
    /// Creates a new module class.
    #[must_use]
    pub fn new(name: impl Into<String>, loader: LoaderKind) -> Self {
        Self {
            name: name.into(),
            loader,
        }
    }

    /// Returns the internal (slash separated) name, e.g. `mypackage/Main`.
    #[must_use]
    pub fn internal_name(&self) -> String {
        self.name.replace('.', "/")
    }
}

/// The packaged test module. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    name: String,
    main_class: String,
    classes: Vec<ModuleClass>,
    jar_path: PathBuf,
}

impl ModuleDescriptor {
    /// Creates a descriptor whose main class is attributed to the app loader.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        main_class: impl Into<String>,
        jar_path: impl Into<PathBuf>,
    ) -> Self {
        let main_class = main_class.into();
        Self {
            name: name.into(),
            classes: vec![ModuleClass::new(&main_class, LoaderKind::AppLoader)],
            main_class,
            jar_path: jar_path.into(),
        }
    }

    /// Adds a class loaded transitively through a custom loader.
    #[must_use]
    pub fn with_class(self, name: impl Into<String>) -> Self {
        self.with_class_loader(name, LoaderKind::UnregisteredLoader)
    }

    /// Adds a class with an explicit loader attribution.
    ///
    /// Re-declaring a class replaces its loader rather than duplicating it.
    #[must_use]
    pub fn with_class_loader(mut self, name: impl Into<String>, loader: LoaderKind) -> Self {
        let name = name.into();
        if let Some(existing) = self.classes.iter_mut().find(|c| c.name == name) {
            existing.loader = loader;
        } else {
            self.classes.push(ModuleClass::new(name, loader));
        }
        self
    }

    /// Returns a copy of this descriptor pointing at a different jar.
    #[must_use]
    pub fn relocated(&self, jar_path: impl Into<PathBuf>) -> Self {
        Self {
            jar_path: jar_path.into(),
            ..self.clone()
        }
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the main class binary name.
    #[must_use]
    pub fn main_class(&self) -> &str {
        &self.main_class
    }

    /// Returns the bundled classes in declaration order.
    #[must_use]
    pub fn classes(&self) -> &[ModuleClass] {
        &self.classes
    }

    /// Returns the jar path.
    #[must_use]
    pub fn jar_path(&self) -> &Path {
        &self.jar_path
    }

    /// Returns the `--module` launch target, `<module>/<main class>`.
    #[must_use]
    pub fn launch_target(&self) -> String {
        format!("{}/{}", self.name, self.main_class)
    }
}
