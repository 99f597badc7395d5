//! Simulation request and setup parameters.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::ModelIdentifier;

/// One call into the orchestrator: model source plus the class to simulate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub model_source: String,
    #[serde(rename = "modelIdentifier")]
    pub model: ModelIdentifier,
}

impl SimulationRequest {
    /// Validates `model` before any workspace exists for it.
    pub fn new(model_source: impl Into<String>, model: &str) -> CoreResult<Self> {
        Ok(Self {
            model_source: model_source.into(),
            model: ModelIdentifier::new(model)?,
        })
    }
}

/// Integration settings the run script asks the engine for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSetup {
    pub start_time: f64,
    pub stop_time: f64,
    pub number_of_intervals: usize,
    pub tolerance: f64,
    pub method: String,
}

impl Default for SimulationSetup {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 10.0,
            number_of_intervals: 500,
            tolerance: 1e-6,
            method: "dassl".to_string(),
        }
    }
}

impl SimulationSetup {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.start_time.is_finite() || !self.stop_time.is_finite() {
            return Err(CoreError::InvalidArg {
                what: "start/stop time must be finite",
            });
        }
        if self.stop_time <= self.start_time {
            return Err(CoreError::InvalidArg {
                what: "stop time must be greater than start time",
            });
        }
        if self.number_of_intervals == 0 {
            return Err(CoreError::InvalidArg {
                what: "number of intervals must be positive",
            });
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(CoreError::InvalidArg {
                what: "tolerance must be positive",
            });
        }
        Ok(())
    }

    /// Output interval between consecutive samples.
    pub fn step(&self) -> f64 {
        (self.stop_time - self.start_time) / self.number_of_intervals as f64
    }

    /// Samples the engine emits, including both endpoints.
    pub fn expected_samples(&self) -> usize {
        self.number_of_intervals + 1
    }
}
