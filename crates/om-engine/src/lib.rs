//! om-engine: locating the OpenModelica installation and driving `omc`.

pub mod environment;
pub mod health;
pub mod runner;

pub use environment::{
    DEFAULT_CANDIDATE_ROOTS, DEFAULT_ENGINE_BINARY, EngineEnvironment, EnvironmentResolver,
    ResolutionSource, ResolverSettings,
};
pub use health::{DirectoryStatus, HealthDetails, HealthDirectories, HealthStatus, health_status};
pub use runner::{ProcessOutcome, ProcessRunner, SolverRunner};

use std::path::PathBuf;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Engine unavailable: {message}")]
    Unavailable { message: String },

    #[error("Failed to launch engine {}: {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        source: std::io::Error,
    },

    #[error("Output capture failed: {message}")]
    Capture { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
