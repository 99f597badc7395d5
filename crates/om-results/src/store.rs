//! Long-lived archive of successful runs.
//!
//! Layout: `<root>/<run_id>/<model>_res.csv` plus `<root>/<run_id>/manifest.json`.
//! Runs are keyed by workspace id, so two runs of the same model never
//! overwrite each other. The manifest is written last; a run directory
//! without one is incomplete and ignored.

use std::fs;
use std::path::{Path, PathBuf};

use om_core::{ModelIdentifier, SimulationSetup, WorkspaceId};
use om_workspace::Workspace;
use tracing::{info, warn};

use crate::extract::parse_artifact;
use crate::hash::artifact_digest;
use crate::types::{ArchiveManifest, ArchivedRun, PerformanceStats, ResultArtifact};
use crate::{ResultsError, ResultsResult};

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root_dir: PathBuf,
}

impl ArchiveStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &WorkspaceId) -> PathBuf {
        self.root_dir.join(run_id.as_str())
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        WorkspaceId::parse(run_id)
            .map(|id| self.run_dir(&id).join(MANIFEST_FILE).is_file())
            .unwrap_or(false)
    }

    /// Copy the workspace artifact into the archive and record its manifest.
    pub fn archive(
        &self,
        workspace: &Workspace,
        artifact: &ResultArtifact,
        setup: &SimulationSetup,
        performance: Option<PerformanceStats>,
    ) -> ResultsResult<ArchivedRun> {
        let run_dir = self.run_dir(&workspace.id);
        fs::create_dir_all(&run_dir)?;

        let file_name = workspace.model.artifact_file_name();
        let bytes = fs::read(workspace.artifact_path())?;
        let artifact_path = run_dir.join(&file_name);
        fs::write(&artifact_path, &bytes)?;

        let manifest = ArchiveManifest {
            run_id: workspace.id.clone(),
            model: workspace.model.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            artifact_file: file_name,
            artifact_sha256: artifact_digest(&bytes),
            sample_count: artifact.sample_count(),
            variables: artifact.variables().to_vec(),
            setup: setup.clone(),
            performance,
        };
        let manifest_path = run_dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

        info!(run = %workspace.id, path = %artifact_path.display(), "artifact archived");
        Ok(ArchivedRun {
            run_id: workspace.id.clone(),
            artifact_path,
            manifest_path,
        })
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<ArchiveManifest> {
        let id = WorkspaceId::parse(run_id)?;
        let manifest_path = self.run_dir(&id).join(MANIFEST_FILE);

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn artifact_path(&self, run_id: &str) -> ResultsResult<PathBuf> {
        let manifest = self.load_manifest(run_id)?;
        Ok(self.run_dir(&manifest.run_id).join(manifest.artifact_file))
    }

    /// Re-parse an archived artifact.
    pub fn load_artifact(&self, run_id: &str) -> ResultsResult<ResultArtifact> {
        let path = self.artifact_path(run_id)?;
        let text = fs::read_to_string(&path).map_err(|e| ResultsError::FileProcessing {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        parse_artifact(&text).map_err(|reason| ResultsError::FileProcessing { path, reason })
    }

    /// Manifests of archived runs, oldest first; all models when `model` is
    /// `None`.
    pub fn list_runs(&self, model: Option<&ModelIdentifier>) -> ResultsResult<Vec<ArchiveManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let run_id = entry.file_name().to_string_lossy().to_string();
            if !self.has_run(&run_id) {
                continue;
            }
            match self.load_manifest(&run_id) {
                Ok(manifest) if model.is_none_or(|m| &manifest.model == m) => runs.push(manifest),
                Ok(_) => {}
                Err(e) => warn!(run = %run_id, error = %e, "skipping unreadable manifest"),
            }
        }

        runs.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.run_id.cmp(&b.run_id))
        });
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let id = WorkspaceId::parse(run_id)?;
        let run_dir = self.run_dir(&id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
