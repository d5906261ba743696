//! # cdsflow
//!
//! A staged build-and-validate pipeline for class-data-sharing archives.
//!
//! A run packages a test module under a directory whose name needs
//! escaping, then drives the runtime through four stages:
//!
//! - **Class list**: record the classes loaded by a plain run
//! - **Static archive**: dump an archive from the list, then run with it
//! - **Dynamic archive**: write an archive at process exit
//! - **Validation**: list the dynamic archive and check loader attribution
//!
//! Every stage deletes its stale output first and checks that its inputs
//! exist, so no stage ever reads what an earlier run left behind.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cdsflow::prelude::*;
//!
//! let config = PipelineConfig::from_json_file(path)?;
//! let module = prepare_module(&PrebuiltJar::new(jar), &config)?;
//! let mut orchestrator = OrchestratorBuilder::from_config(&config, module).build()?;
//!
//! let result = orchestrator.run().await;
//! assert!(result.is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifacts;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod stages;
pub mod testing;
pub mod validation;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifacts::{ArtifactStore, FileProtection, Platform};
    pub use crate::config::{ClassConfig, PipelineConfig};
    pub use crate::core::{
        Artifact, ArtifactKind, LoaderKind, ModuleClass, ModuleDescriptor, PipelineState,
        StageId,
    };
    pub use crate::errors::{
        CdsflowError, ErrorKind, MissingArtifactError, PathConstructionError, PipelineFailure,
        StageValidationReport, ValidationFailure,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{
        prepare_module, ArtifactSet, ModuleBuilder, OrchestratorBuilder, PipelineOrchestrator,
        PipelineResult, PrebuiltJar, StageReport, Terminal,
    };
    pub use crate::process::{JavaLauncher, ProcessLauncher, ProcessOutput};
    pub use crate::stages::{Expectations, OutputPattern, StageInvocation, StageOutcome};
    pub use crate::validation::OutputValidator;
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
