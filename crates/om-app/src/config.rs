//! Orchestrator configuration: YAML file plus environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use om_core::SimulationSetup;
use om_engine::{DEFAULT_CANDIDATE_ROOTS, DEFAULT_ENGINE_BINARY, ResolverSettings};
use om_results::ArchiveStore;
use om_workspace::{RetentionPolicy, ScriptTemplate, WorkspaceSettings};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const HOME_ENV: &str = "OPENMODELICAHOME";
pub const WORK_ROOT_ENV: &str = "OMSIM_WORK_ROOT";
pub const RESULTS_ROOT_ENV: &str = "OMSIM_RESULTS_ROOT";
pub const TIMEOUT_ENV: &str = "OMSIM_TIMEOUT_S";
pub const RETENTION_ENV: &str = "OMSIM_RETENTION";

pub const DEFAULT_TIMEOUT_S: u64 = 600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub engine_binary: String,
    /// Explicit installation root; wins over the candidate roots.
    pub home: Option<PathBuf>,
    pub candidate_roots: Vec<PathBuf>,
    pub work_root: PathBuf,
    pub results_root: PathBuf,
    pub timeout_s: u64,
    pub retention: RetentionPolicy,
    /// Run-script template; the built-in one when unset.
    pub template_path: Option<PathBuf>,
    pub model_extension: String,
    /// What the run template asks the engine for. Reported with every
    /// successful result and recorded in the archive manifest. Only a custom
    /// template may change it; the built-in one hard-codes the defaults.
    pub setup: SimulationSetup,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let scratch = env::temp_dir().join("omsim");
        Self {
            engine_binary: DEFAULT_ENGINE_BINARY.to_string(),
            home: None,
            candidate_roots: DEFAULT_CANDIDATE_ROOTS.iter().map(PathBuf::from).collect(),
            work_root: scratch.join("runs"),
            results_root: scratch.join("results"),
            timeout_s: DEFAULT_TIMEOUT_S,
            retention: RetentionPolicy::default(),
            template_path: None,
            model_extension: "mo".to_string(),
            setup: SimulationSetup::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `OPENMODELICAHOME` and the `OMSIM_*` variables of this process.
    pub fn with_env_overrides(self) -> AppResult<Self> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Overlay values from `lookup`; empty values are ignored.
    pub fn apply_overrides<F>(mut self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(home) = get(HOME_ENV) {
            self.home = Some(PathBuf::from(home));
        }
        if let Some(dir) = get(WORK_ROOT_ENV) {
            self.work_root = PathBuf::from(dir);
        }
        if let Some(dir) = get(RESULTS_ROOT_ENV) {
            self.results_root = PathBuf::from(dir);
        }
        if let Some(raw) = get(TIMEOUT_ENV) {
            self.timeout_s = raw.trim().parse().map_err(|_| {
                AppError::Config(format!("{} must be a whole number of seconds, got '{}'", TIMEOUT_ENV, raw))
            })?;
        }
        if let Some(raw) = get(RETENTION_ENV) {
            self.retention = raw
                .parse()
                .map_err(|e| AppError::Config(format!("{}: {}", RETENTION_ENV, e)))?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.engine_binary.trim().is_empty() {
            return Err(AppError::Config("engine_binary is empty".to_string()));
        }
        if self.timeout_s == 0 {
            return Err(AppError::Config("timeout_s must be positive".to_string()));
        }
        if self.model_extension.is_empty() || self.model_extension.contains(['/', '\\', '.']) {
            return Err(AppError::Config(format!(
                "model_extension '{}' is not a plain file extension",
                self.model_extension
            )));
        }
        self.setup
            .validate()
            .map_err(|e| AppError::Config(format!("setup: {}", e)))?;
        if self.template_path.is_none() && self.setup != SimulationSetup::default() {
            return Err(AppError::Config(
                "setup differs from the built-in template's settings; \
                 set template_path to a template that requests it"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s)
    }

    pub fn resolver_settings(&self) -> ResolverSettings {
        ResolverSettings {
            engine_binary: self.engine_binary.clone(),
            configured_home: self.home.clone(),
            candidate_roots: self.candidate_roots.clone(),
            search_path: env::var_os("PATH"),
        }
    }

    /// Open (creating if needed) the archive under `results_root`.
    pub fn archive_store(&self) -> AppResult<ArchiveStore> {
        Ok(ArchiveStore::new(self.results_root.clone())?)
    }

    pub fn workspace_settings(&self) -> AppResult<WorkspaceSettings> {
        let template = match &self.template_path {
            Some(path) => ScriptTemplate::from_file(path)?,
            None => ScriptTemplate::builtin(),
        };
        Ok(WorkspaceSettings {
            work_root: self.work_root.clone(),
            results_root: self.results_root.clone(),
            model_extension: self.model_extension.clone(),
            template,
            retention: self.retention,
        })
    }
}
