//! The archive pipeline state machine.

use super::{producer_of, ArtifactSet, PipelineResult, StageDefinition, StageReport, Terminal};
use crate::artifacts::ArtifactStore;
use crate::core::{Artifact, ModuleDescriptor, PipelineState, StageId};
use crate::errors::{CdsflowError, MissingArtifactError, PipelineFailure};
use crate::events::{names, EventSink};
use crate::stages::{StageInvocation, StageRunner};
use crate::validation::OutputValidator;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One step as it would be launched, without running it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    /// The stage the step belongs to.
    pub stage: StageId,
    /// Step name.
    pub step: String,
    /// Arguments after the launcher and VM options.
    pub args: Vec<String>,
}

impl fmt::Display for PlannedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}/{}", self.stage.index(), self.stage, self.step)
    }
}

/// Drives the four stages in order, checking artifacts around every step.
///
/// Stages run strictly one after another. A stage starts only once its
/// consumed artifacts exist and its output has been deleted or confirmed
/// absent; it completes only once its output exists again. The first
/// failure ends the run.
pub struct PipelineOrchestrator {
    definitions: Vec<StageDefinition>,
    artifacts: ArtifactSet,
    module: ModuleDescriptor,
    runner: StageRunner,
    validator: OutputValidator,
    store: ArtifactStore,
    events: Arc<dyn EventSink>,
    state: PipelineState,
    run_id: Uuid,
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("module", &self.module.name())
            .field("state", &self.state)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    pub(super) fn new(
        definitions: Vec<StageDefinition>,
        artifacts: ArtifactSet,
        module: ModuleDescriptor,
        runner: StageRunner,
        store: ArtifactStore,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            definitions,
            artifacts,
            module,
            runner,
            validator: OutputValidator::new(),
            store,
            events,
            state: PipelineState::Initial,
            run_id: Uuid::now_v7(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns the id of the current (or last) run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the artifacts of this pipeline.
    #[must_use]
    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// Returns the module under test.
    #[must_use]
    pub fn module(&self) -> &ModuleDescriptor {
        &self.module
    }

    /// Returns the launched program.
    #[must_use]
    pub fn program(&self) -> String {
        self.runner.program()
    }

    /// Returns the definition of a stage.
    #[must_use]
    pub fn definition(&self, id: StageId) -> Option<&StageDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Returns every step in launch order without running anything.
    #[must_use]
    pub fn plan(&self) -> Vec<PlannedStep> {
        self.definitions
            .iter()
            .flat_map(|def| {
                def.steps.iter().map(|step| PlannedStep {
                    stage: def.id,
                    step: step.step.clone(),
                    args: step.args.clone(),
                })
            })
            .collect()
    }

    /// Runs every stage from the initial state.
    ///
    /// Each call is a fresh run with a new run id. The result names the
    /// first failing stage, and no stage after it is started.
    pub async fn run(&mut self) -> PipelineResult {
        self.state = PipelineState::Initial;
        self.run_id = Uuid::now_v7();
        self.runner.start_run();
        let start = Instant::now();

        info!(run_id = %self.run_id, module = %self.module.name(), "Pipeline started");
        self.emit(
            names::PIPELINE_STARTED,
            serde_json::json!({
                "module": self.module.name(),
                "jar": self.module.jar_path().display().to_string(),
            }),
        )
        .await;

        let mut stages = Vec::with_capacity(self.definitions.len());
        while let Some(id) = self.state.next_stage() {
            let (report, result) = self.run_stage_inner(id).await;
            stages.push(report);

            if let Err(failure) = result {
                let duration_ms = elapsed_ms(start);
                warn!(run_id = %self.run_id, state = %self.state, "Pipeline failed");
                self.emit(
                    names::PIPELINE_FAILED,
                    serde_json::json!({
                        "state": self.state.to_string(),
                        "duration_ms": duration_ms,
                    }),
                )
                .await;
                return PipelineResult {
                    terminal: Terminal::FailedAtStage(failure),
                    stages,
                    duration_ms,
                };
            }
        }

        let duration_ms = elapsed_ms(start);
        info!(run_id = %self.run_id, duration_ms, "Pipeline completed");
        self.emit(
            names::PIPELINE_COMPLETED,
            serde_json::json!({ "duration_ms": duration_ms }),
        )
        .await;

        PipelineResult {
            terminal: Terminal::AllStagesSucceeded,
            stages,
            duration_ms,
        }
    }

    /// Runs a single stage as the next step of the current run.
    ///
    /// A stage later than the one the state expects fails with
    /// `MissingArtifact` for the output of the skipped stage before
    /// anything is launched. Files left on disk by other runs never satisfy
    /// it. A terminal state, or a stage that already ran, is rejected
    /// with `StageOrder` and leaves the state untouched; only [`run`]
    /// starts over.
    ///
    /// [`run`]: Self::run
    pub async fn run_stage(&mut self, id: StageId) -> Result<StageReport, PipelineFailure> {
        if self.state.next_stage().map_or(true, |next| id < next) {
            warn!(stage = %id, state = %self.state, "Stage rejected");
            return Err(PipelineFailure::new(
                id,
                CdsflowError::stage_order(id, self.state),
            ));
        }
        let (report, result) = self.run_stage_inner(id).await;
        result.map(|()| report)
    }

    async fn run_stage_inner(
        &mut self,
        id: StageId,
    ) -> (StageReport, Result<(), PipelineFailure>) {
        let mut report = StageReport::new(id);
        let start = Instant::now();

        let result = match self.definition(id) {
            Some(def) => match self.require_predecessor(id) {
                Ok(()) => self.execute(def, &mut report).await,
                Err(e) => Err(PipelineFailure::new(id, e)),
            },
            None => Err(PipelineFailure::new(
                id,
                CdsflowError::config(format!("stage '{id}' is not defined")),
            )),
        };
        report.duration_ms = elapsed_ms(start);

        match result {
            Ok(()) => {
                self.state = id.completed_state();
                info!(stage = %id, state = %self.state, duration_ms = report.duration_ms, "Stage completed");
                self.emit(
                    names::STAGE_COMPLETED,
                    serde_json::json!({
                        "stage": id.name(),
                        "index": id.index(),
                        "duration_ms": report.duration_ms,
                    }),
                )
                .await;
                (report, Ok(()))
            }
            Err(failure) => {
                self.state = PipelineState::FailedAtStage {
                    stage_index: failure.stage_index,
                    kind: failure.kind(),
                };
                warn!(
                    stage = %id,
                    step = failure.step.as_deref().unwrap_or("-"),
                    kind = %failure.kind(),
                    error = %failure.cause,
                    "Stage failed"
                );
                self.emit(names::STAGE_FAILED, serde_json::json!(failure.to_dict()))
                    .await;
                (report, Err(failure))
            }
        }
    }

    async fn execute(
        &self,
        def: &StageDefinition,
        report: &mut StageReport,
    ) -> Result<(), PipelineFailure> {
        let id = def.id;

        for artifact in &def.consumes {
            self.require(artifact)
                .map_err(|e| PipelineFailure::new(id, e))?;
        }

        for artifact in def.stale_artifacts() {
            let deleted = self
                .store
                .ensure_absent(artifact)
                .map_err(|e| PipelineFailure::new(id, e))?;
            if deleted {
                report.deleted.push(artifact.clone());
                self.emit(
                    names::ARTIFACT_DELETED,
                    serde_json::json!({
                        "stage": id.name(),
                        "kind": artifact.kind,
                        "path": artifact.path.display().to_string(),
                    }),
                )
                .await;
            }
        }

        info!(stage = %id, index = id.index(), steps = def.steps.len(), "Stage started");
        self.emit(
            names::STAGE_STARTED,
            serde_json::json!({
                "stage": id.name(),
                "index": id.index(),
                "steps": def.steps.iter().map(|s| s.step.clone()).collect::<Vec<_>>(),
            }),
        )
        .await;

        for step in &def.steps {
            self.execute_step(id, step, report)
                .await
                .map_err(|e| PipelineFailure::new(id, e).with_step(&step.step))?;
        }

        if let Some(ref produced) = def.produces {
            self.store
                .assert_present(produced, id.name())
                .map_err(|e| PipelineFailure::new(id, e.into()))?;
        }
        Ok(())
    }

    async fn execute_step(
        &self,
        stage: StageId,
        step: &StageInvocation,
        report: &mut StageReport,
    ) -> Result<(), CdsflowError> {
        for artifact in &step.consumes {
            self.require(artifact)?;
        }

        let outcome = self.runner.run(step).await?;
        let exit_code = outcome.exit_code;
        let duration_ms = outcome.duration_ms;
        let validation = self.validator.validate(&outcome, &step.expectations);
        report.steps.push(outcome);
        validation?;

        if let Some(ref produced) = step.produces {
            self.store.assert_present(produced, stage.name())?;
        }

        debug!(stage = %stage, step = %step.step, exit_code, "Step passed validation");
        self.emit(
            names::STEP_COMPLETED,
            serde_json::json!({
                "stage": stage.name(),
                "step": step.step,
                "exit_code": exit_code,
                "duration_ms": duration_ms,
            }),
        )
        .await;
        Ok(())
    }

    /// Fails when the stage before `id` has not completed in this run.
    fn require_predecessor(&self, id: StageId) -> Result<(), CdsflowError> {
        if self.state.next_stage().is_some_and(|next| next >= id) {
            return Ok(());
        }
        let skipped = StageId::from_index(id.index().saturating_sub(1));
        let produced = skipped
            .and_then(|stage| self.definition(stage))
            .and_then(|def| def.produces.as_ref());

        match (skipped, produced) {
            (Some(stage), Some(artifact)) => Err(MissingArtifactError::new(
                artifact.kind,
                artifact.path.clone(),
                stage.name(),
            )
            .into()),
            _ => Err(CdsflowError::stage_order(id, self.state)),
        }
    }

    fn require(&self, artifact: &Artifact) -> Result<(), CdsflowError> {
        debug!(artifact = %artifact, "Checking consumed artifact");
        self.store
            .assert_present(artifact, producer_of(artifact.kind))
            .map_err(Into::into)
    }

    async fn emit(&self, event_type: &str, mut data: serde_json::Value) {
        if let Some(map) = data.as_object_mut() {
            map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        }
        self.events.emit(event_type, Some(data)).await;
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
