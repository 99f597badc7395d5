//! One request/response cycle against the engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use om_classify::ErrorClassifier;
use om_core::{ErrorCategory, ErrorReport, SimulationRequest, SimulationSetup, WorkspaceId};
use om_engine::{
    EngineEnvironment, EnvironmentResolver, HealthStatus, ProcessRunner, SolverRunner,
    health_status,
};
use om_results::{ArchiveStore, Extraction, ResultsError, extract};
use om_workspace::{Workspace, WorkspaceManager};
use tracing::{info, warn};

use crate::config::OrchestratorConfig;
use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage};
use crate::response::SimulationResult;

/// Deadline for the `--version` check behind [`SimulationOrchestrator::health`].
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub type ProgressCallback<'a> = &'a mut (dyn FnMut(RunProgressEvent) + Send);

/// Coordinates provisioning, the engine run, extraction, archiving and
/// classification.
///
/// The engine environment is resolved once, when the orchestrator is built,
/// and shared read-only by every request. Share the orchestrator itself
/// through an `Arc` to serve concurrent requests.
pub struct SimulationOrchestrator<R: SolverRunner = ProcessRunner> {
    env: Arc<EngineEnvironment>,
    workspaces: WorkspaceManager,
    store: ArchiveStore,
    classifier: ErrorClassifier,
    runner: R,
    setup: SimulationSetup,
}

impl SimulationOrchestrator<ProcessRunner> {
    /// Resolve the engine and build an orchestrator running the real `omc`.
    pub fn from_config(config: &OrchestratorConfig) -> AppResult<Self> {
        let env = EnvironmentResolver::new(config.resolver_settings()).resolve();
        Self::with_runner(config, env, ProcessRunner::new(config.timeout()))
    }
}

impl<R: SolverRunner> SimulationOrchestrator<R> {
    pub fn with_runner(
        config: &OrchestratorConfig,
        env: EngineEnvironment,
        runner: R,
    ) -> AppResult<Self> {
        config.validate()?;
        let workspaces = WorkspaceManager::new(config.workspace_settings()?);
        let store = config.archive_store()?;

        info!(
            available = env.available,
            engine = ?env.binary,
            work_root = %workspaces.work_root().display(),
            results_root = %workspaces.results_root().display(),
            retention = ?workspaces.retention(),
            "orchestrator ready"
        );
        Ok(Self {
            env: Arc::new(env),
            workspaces,
            store,
            classifier: ErrorClassifier::new(),
            runner,
            setup: config.setup.clone(),
        })
    }

    pub fn environment(&self) -> &EngineEnvironment {
        &self.env
    }

    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub async fn health(&self) -> HealthStatus {
        health_status(&self.env, VERSION_CHECK_TIMEOUT).await
    }

    pub async fn simulate(&self, request: &SimulationRequest) -> AppResult<SimulationResult> {
        self.simulate_with_progress(request, None).await
    }

    /// Run one request, reporting each stage transition to `progress_cb`.
    ///
    /// Engine failures (unavailable, load, compile, simulation, timeout,
    /// unreadable artifact) are `Ok(SimulationResult::Failure)`. `Err` is
    /// reserved for infrastructure problems such as an unwritable workspace
    /// or archive. Retention still applies to a provisioned workspace when
    /// the run ends in `Err`; it counts as a failed run.
    pub async fn simulate_with_progress(
        &self,
        request: &SimulationRequest,
        mut progress_cb: Option<ProgressCallback<'_>>,
    ) -> AppResult<SimulationResult> {
        let started = Instant::now();

        emit_progress(
            &mut progress_cb,
            RunStage::CheckingEngine,
            started,
            None,
            Some("Checking engine availability".to_string()),
        );
        if !self.env.available {
            info!(model = %request.model, "engine unavailable; request rejected");
            return Ok(SimulationResult::Failure {
                run_id: None,
                error: ErrorReport::new(
                    ErrorCategory::Unavailable,
                    self.env.status_message.clone(),
                    "",
                ),
            });
        }

        emit_progress(
            &mut progress_cb,
            RunStage::Provisioning,
            started,
            None,
            Some("Provisioning workspace".to_string()),
        );
        let workspace = self.workspaces.provision(request)?;
        let run_id = Some(workspace.id.clone());

        let result = match self.execute(&workspace, started, &mut progress_cb).await {
            Ok(result) => result,
            Err(e) => {
                warn!(run = %workspace.id, error = %e, "run aborted");
                self.apply_retention(&workspace, false);
                return Err(e);
            }
        };

        emit_progress(
            &mut progress_cb,
            RunStage::ApplyingRetention,
            started,
            run_id.clone(),
            None,
        );
        self.apply_retention(&workspace, result.is_success());

        log_result(&workspace.id, &result, started);
        emit_progress(
            &mut progress_cb,
            RunStage::Completed,
            started,
            run_id,
            Some(match result.category() {
                None => "Simulation succeeded".to_string(),
                Some(category) => format!("Simulation failed: {}", category),
            }),
        );
        Ok(result)
    }

    /// Engine run, extraction and archiving inside a provisioned workspace.
    async fn execute(
        &self,
        workspace: &Workspace,
        started: Instant,
        progress_cb: &mut Option<ProgressCallback<'_>>,
    ) -> AppResult<SimulationResult> {
        let run_id = Some(workspace.id.clone());

        emit_progress(
            progress_cb,
            RunStage::RunningEngine,
            started,
            run_id.clone(),
            Some("Running engine".to_string()),
        );
        let outcome = self.runner.run(workspace, &self.env).await?;

        let result = if outcome.timed_out {
            emit_progress(
                progress_cb,
                RunStage::ClassifyingFailure,
                started,
                run_id.clone(),
                Some("Engine timed out".to_string()),
            );
            SimulationResult::Failure {
                run_id: run_id.clone(),
                error: ErrorReport::new(
                    ErrorCategory::Timeout,
                    format!(
                        "engine exceeded its deadline and was stopped after {:.1}s",
                        outcome.elapsed.as_secs_f64()
                    ),
                    outcome.combined_output(),
                ),
            }
        } else {
            emit_progress(
                progress_cb,
                RunStage::ExtractingResults,
                started,
                run_id.clone(),
                Some("Extracting results".to_string()),
            );
            match extract(&outcome, workspace) {
                Ok(Extraction::Found {
                    artifact,
                    performance,
                }) => {
                    emit_progress(
                        progress_cb,
                        RunStage::Archiving,
                        started,
                        run_id.clone(),
                        Some("Archiving artifact".to_string()),
                    );
                    let archived =
                        self.store
                            .archive(workspace, &artifact, &self.setup, performance)?;
                    SimulationResult::Success {
                        run_id: workspace.id.clone(),
                        setup: self.setup.clone(),
                        artifact,
                        performance,
                        archived,
                    }
                }
                Ok(Extraction::NotFound) => {
                    emit_progress(
                        progress_cb,
                        RunStage::ClassifyingFailure,
                        started,
                        run_id.clone(),
                        Some("Classifying engine output".to_string()),
                    );
                    SimulationResult::Failure {
                        run_id: run_id.clone(),
                        error: self.classifier.classify(&outcome.stdout, &outcome.stderr),
                    }
                }
                Err(ResultsError::FileProcessing { path, reason }) => SimulationResult::Failure {
                    run_id: run_id.clone(),
                    error: ErrorReport::new(
                        ErrorCategory::FileProcessingError,
                        format!("{}: {}", path.display(), reason),
                        outcome.combined_output(),
                    ),
                },
                Err(e) => return Err(e.into()),
            }
        };
        Ok(result)
    }

    /// A failed cleanup never masks the run's result.
    fn apply_retention(&self, workspace: &Workspace, succeeded: bool) {
        if let Err(e) = self.workspaces.finish(workspace, succeeded) {
            warn!(run = %workspace.id, error = %e, "workspace cleanup failed");
        }
    }
}

fn emit_progress(
    progress_cb: &mut Option<ProgressCallback<'_>>,
    stage: RunStage,
    started: Instant,
    run_id: Option<WorkspaceId>,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            run_id,
            message,
        ));
    }
}

fn log_result(run_id: &WorkspaceId, result: &SimulationResult, started: Instant) {
    let elapsed_s = started.elapsed().as_secs_f64();
    match result {
        SimulationResult::Success { artifact, .. } => info!(
            run = %run_id,
            samples = artifact.sample_count(),
            elapsed_s,
            "simulation succeeded"
        ),
        SimulationResult::Failure { error, .. } => warn!(
            run = %run_id,
            category = %error.category,
            message = %error.message,
            elapsed_s,
            "simulation failed"
        ),
    }
}
