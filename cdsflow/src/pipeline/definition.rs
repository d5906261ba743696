//! Per-stage definitions: which steps run and which artifacts they touch.

use crate::core::{Artifact, ArtifactKind, ModuleDescriptor, StageId};
use crate::paths::module_path_arg;
use crate::stages::StageInvocation;
use crate::validation::archive_content_expectations;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The artifacts of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
    /// The relocated module jar.
    pub module_jar: Artifact,
    /// The class list written by stage 1.
    pub class_list: Artifact,
    /// The archive dumped by stage 2.
    pub static_archive: Artifact,
    /// The archive written at exit by stage 3. Shares its path with the
    /// static archive.
    pub dynamic_archive: Artifact,
}

impl ArtifactSet {
    /// Returns every artifact, jar first.
    #[must_use]
    pub fn all(&self) -> [&Artifact; 4] {
        [
            &self.module_jar,
            &self.class_list,
            &self.static_archive,
            &self.dynamic_archive,
        ]
    }

    /// Converts to a dictionary of kind name to path.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        self.all()
            .into_iter()
            .map(|a| (a.kind.to_string(), serde_json::json!(a.path.display().to_string())))
            .collect()
    }
}

/// Returns the name of whatever produces artifacts of `kind`.
#[must_use]
pub fn producer_of(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::ModuleJar => "module-builder",
        ArtifactKind::ClassList => StageId::ClassList.name(),
        ArtifactKind::StaticArchive => StageId::StaticArchive.name(),
        ArtifactKind::DynamicArchive => StageId::DynamicArchive.name(),
    }
}

/// One stage: its steps plus the artifacts checked around them.
#[derive(Debug, Clone)]
pub struct StageDefinition {
    /// Which stage this is.
    pub id: StageId,
    /// Steps, run in order.
    pub steps: Vec<StageInvocation>,
    /// Artifacts that must exist before the stage starts.
    pub consumes: Vec<Artifact>,
    /// The artifact the stage leaves behind, if any.
    pub produces: Option<Artifact>,
    /// Artifacts deleted before the stage starts because the produced one
    /// replaces them.
    pub supersedes: Vec<Artifact>,
}

impl StageDefinition {
    /// Builds the definition of `id` for the given artifacts and module.
    #[must_use]
    pub fn for_stage(id: StageId, artifacts: &ArtifactSet, module: &ModuleDescriptor) -> Self {
        let jar = &artifacts.module_jar;
        let list = &artifacts.class_list;
        let archive = &artifacts.static_archive;
        let dynamic = &artifacts.dynamic_archive;

        match id {
            StageId::ClassList => Self {
                id,
                steps: vec![StageInvocation::new(
                    "create-list",
                    launch_args(module, [format!("-XX:DumpLoadedClassList={}", arg(list))]),
                )
                .consuming(jar.clone())
                .producing(list.clone())],
                consumes: vec![jar.clone()],
                produces: Some(list.clone()),
                supersedes: Vec::new(),
            },
            StageId::StaticArchive => Self {
                id,
                steps: vec![
                    StageInvocation::new(
                        "dump-archive",
                        launch_args(
                            module,
                            [
                                "-Xshare:dump".to_string(),
                                format!("-XX:SharedClassListFile={}", arg(list)),
                                format!("-XX:SharedArchiveFile={}", arg(archive)),
                            ],
                        ),
                    )
                    .consuming(jar.clone())
                    .consuming(list.clone())
                    .producing(archive.clone()),
                    StageInvocation::new(
                        "use-archive",
                        launch_args(
                            module,
                            [
                                "-Xshare:on".to_string(),
                                format!("-XX:SharedArchiveFile={}", arg(archive)),
                            ],
                        ),
                    )
                    .consuming(jar.clone())
                    .consuming(archive.clone()),
                ],
                consumes: vec![jar.clone(), list.clone()],
                produces: Some(archive.clone()),
                supersedes: Vec::new(),
            },
            StageId::DynamicArchive => Self {
                id,
                steps: vec![StageInvocation::new(
                    "dynamic-archive",
                    launch_args(module, [format!("-XX:ArchiveClassesAtExit={}", arg(dynamic))]),
                )
                .consuming(jar.clone())
                .producing(dynamic.clone())],
                consumes: vec![jar.clone()],
                produces: Some(dynamic.clone()),
                supersedes: vec![archive.clone()],
            },
            StageId::ValidateDynamicArchive => Self {
                id,
                steps: vec![StageInvocation::new(
                    "validate-dynamic",
                    launch_args(
                        module,
                        [
                            format!("-XX:SharedArchiveFile={}", arg(dynamic)),
                            "-XX:+PrintSharedArchiveAndExit".to_string(),
                        ],
                    ),
                )
                .with_expectations(archive_content_expectations(module))
                .consuming(jar.clone())
                .consuming(dynamic.clone())],
                consumes: vec![jar.clone(), dynamic.clone()],
                produces: None,
                supersedes: Vec::new(),
            },
        }
    }

    /// Builds all four definitions in pipeline order.
    #[must_use]
    pub fn all(artifacts: &ArtifactSet, module: &ModuleDescriptor) -> Vec<Self> {
        StageId::ALL
            .iter()
            .map(|id| Self::for_stage(*id, artifacts, module))
            .collect()
    }

    /// Returns the artifacts to delete before the stage starts: superseded
    /// ones first, then the produced one.
    #[must_use]
    pub fn stale_artifacts(&self) -> Vec<&Artifact> {
        self.supersedes.iter().chain(self.produces.as_ref()).collect()
    }
}

fn arg(artifact: &Artifact) -> String {
    module_path_arg(artifact.path())
}

/// Appends `--module-path <jar> --module <module>/<main>` to stage flags.
fn launch_args<const N: usize>(module: &ModuleDescriptor, flags: [String; N]) -> Vec<String> {
    let mut args: Vec<String> = flags.into();
    args.extend([
        "--module-path".to_string(),
        module_path_arg(module.jar_path()),
        "--module".to_string(),
        module.launch_target(),
    ]);
    args
}
