//! Result data types.

use std::path::PathBuf;

use indexmap::IndexMap;
use om_core::{ModelIdentifier, SimulationSetup, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Parsed engine output: one time axis and a series per variable.
///
/// Every series has exactly `time().len()` samples; the constructor is the
/// only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultArtifact {
    variables: Vec<String>,
    time: Vec<f64>,
    series: IndexMap<String, Vec<f64>>,
}

impl ResultArtifact {
    pub fn new(time: Vec<f64>, columns: Vec<(String, Vec<f64>)>) -> Result<Self, String> {
        let mut series = IndexMap::with_capacity(columns.len());
        let mut variables = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            if values.len() != time.len() {
                return Err(format!(
                    "series '{}' has {} samples, time has {}",
                    name,
                    values.len(),
                    time.len()
                ));
            }
            if series.contains_key(&name) {
                return Err(format!("duplicate column '{}'", name));
            }
            variables.push(name.clone());
            series.insert(name, values);
        }
        Ok(Self {
            variables,
            time,
            series,
        })
    }

    /// Variable names in column order, excluding `time`.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn series(&self, variable: &str) -> Option<&[f64]> {
        self.series.get(variable).map(Vec::as_slice)
    }

    pub fn series_map(&self) -> &IndexMap<String, Vec<f64>> {
        &self.series
    }

    pub fn sample_count(&self) -> usize {
        self.time.len()
    }

    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((*self.time.first()?, *self.time.last()?))
    }
}

/// Wall-clock figures the engine prints after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    #[serde(rename = "timeSimulation")]
    pub simulation_time_s: Option<f64>,
    #[serde(rename = "timeTotal")]
    pub total_time_s: Option<f64>,
}

/// Written as `manifest.json` beside every archived artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub run_id: WorkspaceId,
    pub model: ModelIdentifier,
    pub timestamp: String,
    pub artifact_file: String,
    pub artifact_sha256: String,
    pub sample_count: usize,
    pub variables: Vec<String>,
    pub setup: SimulationSetup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceStats>,
}

/// Where a successful run's artifact was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedRun {
    pub run_id: WorkspaceId,
    pub artifact_path: PathBuf,
    pub manifest_path: PathBuf,
}
