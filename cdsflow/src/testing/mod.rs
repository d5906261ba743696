//! Testing utilities for archive pipelines.
//!
//! This module provides:
//! - A scripted launcher that simulates the runtime's archive behaviour
//! - A placeholder module builder and a scratch workspace fixture
//! - Assertions over pipeline results, artifacts and events

mod assertions;
mod fixtures;
mod scripted;

pub use assertions::{
    assert_artifact_absent, assert_artifact_present, assert_events_in_order, assert_failed_at,
    assert_succeeded,
};
pub use fixtures::{PlaceholderJar, TestWorkspace};
pub use scripted::{step_of, ScriptedLauncher};
