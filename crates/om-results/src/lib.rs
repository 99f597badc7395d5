//! om-results: artifact parsing, performance markers and the run archive.

pub mod extract;
pub mod hash;
pub mod perf;
pub mod store;
pub mod types;

pub use extract::{Extraction, extract, parse_artifact};
pub use hash::artifact_digest;
pub use perf::parse_performance;
pub use store::ArchiveStore;
pub use types::*;

use std::path::PathBuf;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Result file {} is unreadable: {reason}", path.display())]
    FileProcessing { path: PathBuf, reason: String },

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid run id: {0}")]
    InvalidRunId(#[from] om_core::CoreError),
}
