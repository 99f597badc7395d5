//! Error types for the om-app service layer.

use std::path::PathBuf;

/// Infrastructure failures. Engine failures are not errors here; they come
/// back as `SimulationResult::Failure`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read config file: {}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Classifier error: {0}")]
    Classify(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for om-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<om_core::CoreError> for AppError {
    fn from(err: om_core::CoreError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<om_workspace::WorkspaceError> for AppError {
    fn from(err: om_workspace::WorkspaceError) -> Self {
        AppError::Workspace(err.to_string())
    }
}

impl From<om_engine::EngineError> for AppError {
    fn from(err: om_engine::EngineError) -> Self {
        AppError::Engine(err.to_string())
    }
}

impl From<om_results::ResultsError> for AppError {
    fn from(err: om_results::ResultsError) -> Self {
        match err {
            om_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}

impl From<om_classify::ClassifyError> for AppError {
    fn from(err: om_classify::ClassifyError) -> Self {
        AppError::Classify(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
