//! Failure taxonomy shared by the classifier, the orchestrator and the
//! response layer.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Engine not installed or not usable; no subprocess was spawned.
    Unavailable,
    LoadFailure,
    CompileError,
    SimulationFailure,
    /// Artifact present but unreadable.
    FileProcessingError,
    /// Engine exceeded its deadline and was killed.
    Timeout,
    Unknown,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::LoadFailure => "load_failure",
            Self::CompileError => "compile_error",
            Self::SimulationFailure => "simulation_failure",
            Self::FileProcessingError => "file_processing_error",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified failure with the raw engine text preserved for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub category: ErrorCategory,
    pub message: String,
    pub raw_output: String,
}

impl ErrorReport {
    pub fn new(
        category: ErrorCategory,
        message: impl Into<String>,
        raw_output: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            raw_output: raw_output.into(),
        }
    }
}
