use om_core::WorkspaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    CheckingEngine,
    Provisioning,
    RunningEngine,
    ExtractingResults,
    Archiving,
    ClassifyingFailure,
    ApplyingRetention,
    Completed,
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::CheckingEngine => "checking-engine",
            Self::Provisioning => "provisioning",
            Self::RunningEngine => "running-engine",
            Self::ExtractingResults => "extracting",
            Self::Archiving => "archiving",
            Self::ClassifyingFailure => "classifying",
            Self::ApplyingRetention => "cleanup",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    /// Set once a workspace exists.
    pub run_id: Option<WorkspaceId>,
    pub message: Option<String>,
}

impl RunProgressEvent {
    pub fn stage(
        stage: RunStage,
        elapsed_wall_s: f64,
        run_id: Option<WorkspaceId>,
        message: Option<String>,
    ) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            run_id,
            message,
        }
    }
}
