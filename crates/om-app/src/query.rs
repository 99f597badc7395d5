//! Query helpers over archived runs.

use std::fmt::Write as _;

use om_core::{ModelIdentifier, SimulationSetup, WorkspaceId};
use om_results::{ArchiveManifest, ArchiveStore, PerformanceStats};

use crate::error::{AppError, AppResult};

/// Summary of an archived run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: WorkspaceId,
    pub model: ModelIdentifier,
    pub timestamp: String,
    pub time_range: (f64, f64),
    pub sample_count: usize,
    pub variables: Vec<String>,
    pub setup: SimulationSetup,
    pub performance: Option<PerformanceStats>,
    pub artifact_sha256: String,
}

/// Archived runs, oldest first, optionally for one model.
pub fn list_runs(store: &ArchiveStore, model: Option<&str>) -> AppResult<Vec<ArchiveManifest>> {
    let model = model.map(ModelIdentifier::new).transpose()?;
    Ok(store.list_runs(model.as_ref())?)
}

/// Load a run's manifest and artifact and summarize them.
pub fn get_run_summary(store: &ArchiveStore, run_id: &str) -> AppResult<RunSummary> {
    let manifest = store.load_manifest(run_id)?;
    let artifact = store.load_artifact(run_id)?;
    let time_range = artifact
        .time_range()
        .ok_or_else(|| AppError::Results(format!("run {} has no samples", run_id)))?;

    Ok(RunSummary {
        run_id: manifest.run_id,
        model: manifest.model,
        timestamp: manifest.timestamp,
        time_range,
        sample_count: artifact.sample_count(),
        variables: artifact.variables().to_vec(),
        setup: manifest.setup,
        performance: manifest.performance,
        artifact_sha256: manifest.artifact_sha256,
    })
}

/// Two-column `time,<variable>` CSV for one series of an archived run.
pub fn export_series_csv(store: &ArchiveStore, run_id: &str, variable: &str) -> AppResult<String> {
    let artifact = store.load_artifact(run_id)?;
    let values = artifact.series(variable).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "variable '{}' not in run {} (available: {})",
            variable,
            run_id,
            artifact.variables().join(", ")
        ))
    })?;

    let mut csv = format!("time,{}\n", quote_field(variable));
    for (t, v) in artifact.time().iter().zip(values) {
        let _ = writeln!(csv, "{},{}", t, v);
    }
    Ok(csv)
}

fn quote_field(name: &str) -> String {
    if name.contains([',', '"']) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}
