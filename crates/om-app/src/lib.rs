//! Service layer for omsim.
//!
//! Wires engine resolution, workspace provisioning, the engine run, result
//! extraction, archiving and failure classification into one request/response
//! cycle that both the CLI and an HTTP front end can drive.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod query;
pub mod response;

pub use config::OrchestratorConfig;
pub use error::{AppError, AppResult};
pub use orchestrator::SimulationOrchestrator;
pub use progress::{RunProgressEvent, RunStage};
pub use query::{RunSummary, export_series_csv, get_run_summary, list_runs};
pub use response::{SeriesData, SimulationResponse, SimulationResult};
