//! Per-run workspace provisioning and retention.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use om_core::{ModelIdentifier, SimulationRequest, WorkspaceId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::template::{RenderParams, ScriptTemplate};
use crate::{WorkspaceError, WorkspaceResult};

pub const SCRIPT_FILE_NAME: &str = "run.mos";

/// What happens to a workspace directory once its run has finished.
///
/// A run that ends in an infrastructure error after provisioning counts as
/// failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep every workspace for post-mortem inspection.
    #[default]
    RetainAll,
    /// Keep failed runs only; successful artifacts live on in the archive.
    DeleteOnSuccess,
    DeleteAll,
}

impl RetentionPolicy {
    pub fn should_delete(self, succeeded: bool) -> bool {
        match self {
            Self::RetainAll => false,
            Self::DeleteOnSuccess => succeeded,
            Self::DeleteAll => true,
        }
    }
}

impl FromStr for RetentionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "retain_all" => Ok(Self::RetainAll),
            "delete_on_success" => Ok(Self::DeleteOnSuccess),
            "delete_all" => Ok(Self::DeleteAll),
            other => Err(format!("unknown retention policy '{}'", other)),
        }
    }
}

/// Handle to one provisioned run directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub model: ModelIdentifier,
    pub dir: PathBuf,
    pub model_file: PathBuf,
    pub script_file: PathBuf,
}

impl Workspace {
    /// Where the engine writes its CSV result for this run.
    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(self.model.artifact_file_name())
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    pub work_root: PathBuf,
    pub results_root: PathBuf,
    pub model_extension: String,
    pub template: ScriptTemplate,
    pub retention: RetentionPolicy,
}

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    settings: WorkspaceSettings,
}

impl WorkspaceManager {
    pub fn new(settings: WorkspaceSettings) -> Self {
        Self { settings }
    }

    pub fn work_root(&self) -> &Path {
        &self.settings.work_root
    }

    pub fn results_root(&self) -> &Path {
        &self.settings.results_root
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.settings.retention
    }

    /// Create `<work_root>/<id>/` holding the model source and run script.
    ///
    /// The directory is never reused: an existing directory with the same id
    /// is a `Collision`. Nothing is cleaned up on failure; see [`Self::finish`].
    pub fn provision(&self, request: &SimulationRequest) -> WorkspaceResult<Workspace> {
        let work_root = std::path::absolute(&self.settings.work_root)?;
        fs::create_dir_all(&work_root)?;
        fs::create_dir_all(&self.settings.results_root)?;

        let discriminator = uuid::Uuid::new_v4().simple().to_string();
        let id = WorkspaceId::new(
            &request.model,
            chrono::Utc::now().timestamp_millis(),
            &discriminator[..8],
        )?;

        let dir = work_root.join(id.as_str());
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(WorkspaceError::Collision { path: dir });
            }
            Err(e) => return Err(e.into()),
        }

        let model_file = dir.join(format!(
            "{}.{}",
            request.model, self.settings.model_extension
        ));
        write_file(&model_file, &request.model_source)?;

        let script = self.settings.template.render(&RenderParams {
            workspace_dir: &dir,
            model_file: &model_file,
            model: &request.model,
        })?;
        let script_file = dir.join(SCRIPT_FILE_NAME);
        write_file(&script_file, &script)?;

        info!(run = %id, dir = %dir.display(), "workspace provisioned");

        Ok(Workspace {
            id,
            model: request.model.clone(),
            dir,
            model_file,
            script_file,
        })
    }

    /// Apply the retention policy; returns whether the directory was removed.
    pub fn finish(&self, workspace: &Workspace, succeeded: bool) -> WorkspaceResult<bool> {
        if !self.settings.retention.should_delete(succeeded) {
            debug!(run = %workspace.id, "workspace retained");
            return Ok(false);
        }
        if workspace.dir.exists() {
            fs::remove_dir_all(&workspace.dir)?;
        }
        debug!(run = %workspace.id, "workspace removed");
        Ok(true)
    }
}

fn write_file(path: &Path, contents: &str) -> WorkspaceResult<()> {
    fs::write(path, contents).map_err(|source| WorkspaceError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_matrix() {
        assert!(!RetentionPolicy::RetainAll.should_delete(true));
        assert!(!RetentionPolicy::RetainAll.should_delete(false));
        assert!(RetentionPolicy::DeleteOnSuccess.should_delete(true));
        assert!(!RetentionPolicy::DeleteOnSuccess.should_delete(false));
        assert!(RetentionPolicy::DeleteAll.should_delete(true));
        assert!(RetentionPolicy::DeleteAll.should_delete(false));
    }

    #[test]
    fn retention_parses_loose_spelling() {
        assert_eq!(
            "delete-on-success".parse::<RetentionPolicy>().unwrap(),
            RetentionPolicy::DeleteOnSuccess
        );
        assert_eq!(
            " RETAIN_ALL ".parse::<RetentionPolicy>().unwrap(),
            RetentionPolicy::RetainAll
        );
        assert!("forever".parse::<RetentionPolicy>().is_err());
    }
}
