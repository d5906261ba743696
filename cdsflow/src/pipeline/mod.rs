//! Pipeline orchestration.
//!
//! This module provides:
//! - Stage definitions and the artifacts they touch
//! - Module preparation
//! - The orchestrator and its builder
//! - Run results

mod builder;
mod definition;
mod orchestrator;
mod prepare;
mod result;

pub use builder::OrchestratorBuilder;
pub use definition::{producer_of, ArtifactSet, StageDefinition};
pub use orchestrator::{PipelineOrchestrator, PlannedStep};
pub use prepare::{prepare_module, ModuleBuilder, PrebuiltJar};
pub use result::{PipelineResult, StageReport, Terminal};
