//! Core domain model types for cdsflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Artifacts and their kinds
//! - The module descriptor and loader attributions
//! - Stage identities and the pipeline state machine

mod artifact;
mod module;
mod status;

pub use artifact::{Artifact, ArtifactKind};
pub use module::{LoaderKind, ModuleClass, ModuleDescriptor};
pub use status::{PipelineState, StageId};
