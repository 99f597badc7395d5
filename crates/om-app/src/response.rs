//! Outcome of one simulation and its wire representation.

use indexmap::IndexMap;
use om_core::{ErrorCategory, ErrorReport, SimulationSetup, WorkspaceId};
use om_results::{ArchivedRun, PerformanceStats, ResultArtifact};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const SUCCESS_STATUS: &str = "success";
pub const INTERNAL_ERROR_STATUS: &str = "internal_error";

/// What the orchestrator hands back for a request that got past validation.
#[derive(Debug, Clone)]
pub enum SimulationResult {
    Success {
        run_id: WorkspaceId,
        setup: SimulationSetup,
        artifact: ResultArtifact,
        performance: Option<PerformanceStats>,
        archived: ArchivedRun,
    },
    /// `run_id` is `None` when no workspace was provisioned.
    Failure {
        run_id: Option<WorkspaceId>,
        error: ErrorReport,
    },
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn run_id(&self) -> Option<&WorkspaceId> {
        match self {
            Self::Success { run_id, .. } => Some(run_id),
            Self::Failure { run_id, .. } => run_id.as_ref(),
        }
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        self.error().map(|e| e.category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData {
    pub time: Vec<f64>,
    pub values: IndexMap<String, Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody {
    pub status: String,
    pub setup: SimulationSetup,
    pub variables: Vec<String>,
    pub data: SeriesData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceStats>,
    pub run_id: WorkspaceId,
    pub archived_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
    /// Snake-case failure category, or `internal_error`.
    pub status: String,
    pub error: String,
    pub info: String,
}

/// JSON body returned to callers.
///
/// Success: `{status:"success", setup, variables, data:{time, values},
/// performance?, runId, archivedPath}`. Failure: `{status, error, info}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SimulationResponse {
    Success(SuccessBody),
    Failure(FailureBody),
}

impl SimulationResponse {
    pub fn status(&self) -> &str {
        match self {
            Self::Success(body) => &body.status,
            Self::Failure(body) => &body.status,
        }
    }

    pub fn internal_error(err: &AppError) -> Self {
        Self::Failure(FailureBody {
            status: INTERNAL_ERROR_STATUS.to_string(),
            error: err.to_string(),
            info: String::new(),
        })
    }

    pub fn from_outcome(outcome: &Result<SimulationResult, AppError>) -> Self {
        match outcome {
            Ok(result) => Self::from(result),
            Err(err) => Self::internal_error(err),
        }
    }
}

impl From<&SimulationResult> for SimulationResponse {
    fn from(result: &SimulationResult) -> Self {
        match result {
            SimulationResult::Success {
                run_id,
                setup,
                artifact,
                performance,
                archived,
            } => Self::Success(SuccessBody {
                status: SUCCESS_STATUS.to_string(),
                setup: setup.clone(),
                variables: artifact.variables().to_vec(),
                data: SeriesData {
                    time: artifact.time().to_vec(),
                    values: artifact.series_map().clone(),
                },
                performance: *performance,
                run_id: run_id.clone(),
                archived_path: archived.artifact_path.display().to_string(),
            }),
            SimulationResult::Failure { error, .. } => Self::Failure(FailureBody {
                status: error.category.label().to_string(),
                error: error.message.clone(),
                info: error.raw_output.clone(),
            }),
        }
    }
}
