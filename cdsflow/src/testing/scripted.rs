//! A launcher that imitates the runtime's class-data-sharing flags.

use crate::core::{LoaderKind, ModuleDescriptor};
use crate::errors::CdsflowError;
use crate::process::{ProcessLauncher, ProcessOutput};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BOOT_LAYER_ERROR: &str = "Error occurred during initialization of boot layer";

/// Names the step an argument vector belongs to, by its flags.
#[must_use]
pub fn step_of(args: &[String]) -> &'static str {
    let has = |prefix: &str| args.iter().any(|a| a.starts_with(prefix));
    if has("-XX:DumpLoadedClassList=") {
        "create-list"
    } else if has("-Xshare:dump") {
        "dump-archive"
    } else if has("-XX:ArchiveClassesAtExit=") {
        "dynamic-archive"
    } else if has("-XX:+PrintSharedArchiveAndExit") {
        "validate-dynamic"
    } else if has("-Xshare:on") {
        "use-archive"
    } else {
        "run"
    }
}

/// Simulates the runtime: writes class lists and archives where the flags
/// say, and prints an archive listing on request.
///
/// Every argument vector is recorded. Steps can be told to exit with a
/// given code instead of doing their work.
#[derive(Debug)]
pub struct ScriptedLauncher {
    module: ModuleDescriptor,
    failures: HashMap<String, i32>,
    loader_overrides: HashMap<String, LoaderKind>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedLauncher {
    /// Creates a launcher simulating runs of `module`.
    #[must_use]
    pub fn new(module: ModuleDescriptor) -> Self {
        Self {
            module,
            failures: HashMap::new(),
            loader_overrides: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes `step` exit with `exit_code` without writing anything.
    #[must_use]
    pub fn fail_step(mut self, step: impl Into<String>, exit_code: i32) -> Self {
        self.failures.insert(step.into(), exit_code);
        self
    }

    /// Makes archives attribute `class` to `loader` instead of its declared one.
    #[must_use]
    pub fn misattribute(mut self, class: impl Into<String>, loader: LoaderKind) -> Self {
        self.loader_overrides.insert(class.into(), loader);
        self
    }

    /// Returns every argument vector launched, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    /// Returns the step names launched, in order.
    #[must_use]
    pub fn steps(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(|a| step_of(a)).collect()
    }

    fn simulate(&self, args: &[String]) -> ProcessOutput {
        let step = step_of(args);
        if let Some(&code) = self.failures.get(step) {
            return ProcessOutput::new(code, "", format!("{step}: simulated failure\n"));
        }

        match value_after(args, "--module-path") {
            Some(jar) if Path::new(jar).is_file() => {}
            Some(jar) => {
                return ProcessOutput::new(
                    1,
                    "",
                    format!(
                        "{BOOT_LAYER_ERROR}\njava.lang.module.FindException: Module {} not found ({jar})\n",
                        self.module.name()
                    ),
                );
            }
            None => return ProcessOutput::new(1, "", "--module-path is required\n"),
        }

        match step {
            "create-list" => self.write(flag_value(args, "-XX:DumpLoadedClassList="), &self.class_list()),
            "dump-archive" => {
                let list = flag_value(args, "-XX:SharedClassListFile=");
                if !list.is_some_and(|l| Path::new(l).is_file()) {
                    return ProcessOutput::new(1, "", "Cannot open class list file\n");
                }
                self.write(flag_value(args, "-XX:SharedArchiveFile="), &self.listing())
            }
            "use-archive" => match flag_value(args, "-XX:SharedArchiveFile=") {
                Some(a) if Path::new(a).is_file() => ProcessOutput::success("Hello from Main\n"),
                _ => ProcessOutput::new(1, "", "Specified shared archive not found\n"),
            },
            "dynamic-archive" => {
                self.write(flag_value(args, "-XX:ArchiveClassesAtExit="), &self.listing())
            }
            "validate-dynamic" => match flag_value(args, "-XX:SharedArchiveFile=")
                .and_then(|a| fs::read_to_string(a).ok())
            {
                Some(contents) => ProcessOutput::success(format!(
                    "Base archive is valid\nDynamic archive is valid\n{contents}"
                )),
                None => ProcessOutput::new(1, "", "Specified shared archive not found\n"),
            },
            _ => ProcessOutput::success("Hello from Main\n"),
        }
    }

    fn write(&self, path: Option<&str>, contents: &str) -> ProcessOutput {
        let Some(path) = path else {
            return ProcessOutput::new(1, "", "missing output path\n");
        };
        match fs::write(path, contents) {
            Ok(()) => ProcessOutput::success(format!("Wrote {path}\n")),
            Err(e) => ProcessOutput::new(1, "", format!("Unable to write {path}: {e}\n")),
        }
    }

    fn class_list(&self) -> String {
        let mut list = String::from("java/lang/Object\n");
        for class in self.module.classes() {
            list.push_str(&class.internal_name());
            list.push('\n');
        }
        list
    }

    fn listing(&self) -> String {
        self.module
            .classes()
            .iter()
            .enumerate()
            .map(|(i, class)| {
                let loader = self
                    .loader_overrides
                    .get(&class.name)
                    .copied()
                    .unwrap_or(class.loader);
                format!("{i:>4}: {} {loader}\n", class.name)
            })
            .collect()
    }
}

#[async_trait]
impl ProcessLauncher for ScriptedLauncher {
    fn program(&self) -> String {
        "scripted-java".to_string()
    }

    async fn launch(&self, args: &[String]) -> Result<ProcessOutput, CdsflowError> {
        self.calls.lock().push(args.to_vec());
        Ok(self.simulate(args))
    }
}

fn flag_value<'a>(args: &'a [String], prefix: &str) -> Option<&'a str> {
    args.iter().find_map(|a| a.strip_prefix(prefix))
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_step_of() {
        assert_eq!(step_of(&args(&["-Xshare:dump"])), "dump-archive");
        assert_eq!(
            step_of(&args(&["-XX:SharedArchiveFile=a.jsa", "-Xshare:on"])),
            "use-archive"
        );
        assert_eq!(
            step_of(&args(&["-XX:SharedArchiveFile=a.jsa", "-XX:+PrintSharedArchiveAndExit"])),
            "validate-dynamic"
        );
    }

    #[tokio::test]
    async fn test_missing_module_path_fails_like_the_runtime() {
        let module = ModuleDescriptor::new("mymodule", "mypackage.Main", "/nope/dir with/m.jar");
        let launcher = ScriptedLauncher::new(module);
        let output = launcher
            .launch(&args(&["--module-path", "/nope/dir", "--module", "mymodule/mypackage.Main"]))
            .await
            .unwrap();
        assert_eq!(output.exit_code, 1);
        assert!(output.stderr.contains(BOOT_LAYER_ERROR));
        assert_eq!(launcher.steps(), vec!["run"]);
    }

    #[tokio::test]
    async fn test_dynamic_archive_listing_uses_declared_loaders() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("mymodule.jar");
        fs::write(&jar, b"PK").unwrap();
        let module = ModuleDescriptor::new("mymodule", "mypackage.Main", &jar)
            .with_class("mypackage.Another");
        let launcher = ScriptedLauncher::new(module);
        let archive = dir.path().join("test-dynamic.jsa");
        let jar_arg = jar.display().to_string();

        let dump = args(&[
            format!("-XX:ArchiveClassesAtExit={}", archive.display()).as_str(),
            "--module-path",
            jar_arg.as_str(),
        ]);
        assert_eq!(launcher.launch(&dump).await.unwrap().exit_code, 0);

        let validate = args(&[
            format!("-XX:SharedArchiveFile={}", archive.display()).as_str(),
            "-XX:+PrintSharedArchiveAndExit",
            "--module-path",
            jar_arg.as_str(),
        ]);
        let output = launcher.launch(&validate).await.unwrap();
        assert!(output.stdout.contains("archive is valid"));
        assert!(output.stdout.contains(": mypackage.Main app_loader"));
        assert!(output.stdout.contains(": mypackage.Another unregistered_loader"));
    }
}
