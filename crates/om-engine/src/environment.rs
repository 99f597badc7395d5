//! Engine installation discovery.
//!
//! Resolution runs once at start-up and yields an immutable
//! [`EngineEnvironment`]. The variables the engine needs (`OPENMODELICAHOME`,
//! `OPENMODELICALIBRARY`, `MODELICAUSERCFLAGS`, `PATH`) are carried on that
//! value and applied to each child process; the parent's environment is
//! never modified.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const DEFAULT_ENGINE_BINARY: &str = "omc";

/// Searched in order when no home is configured.
pub const DEFAULT_CANDIDATE_ROOTS: &[&str] = &[
    "/Applications/OpenModelica.app/Contents/Resources",
    "/opt/openmodelica",
];

pub const HOME_VAR: &str = "OPENMODELICAHOME";
pub const LIBRARY_VAR: &str = "OPENMODELICALIBRARY";
pub const CFLAGS_VAR: &str = "MODELICAUSERCFLAGS";

/// Which resolution step located the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    ConfiguredHome,
    CandidateRoot,
    SearchPath,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub engine_binary: String,
    /// Explicit home, typically from `OPENMODELICAHOME` or the config file.
    pub configured_home: Option<PathBuf>,
    pub candidate_roots: Vec<PathBuf>,
    /// Executable search path; `None` skips the search-path step.
    pub search_path: Option<OsString>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            engine_binary: DEFAULT_ENGINE_BINARY.to_string(),
            configured_home: None,
            candidate_roots: DEFAULT_CANDIDATE_ROOTS.iter().map(PathBuf::from).collect(),
            search_path: None,
        }
    }
}

/// Resolved engine installation; read-only after start-up.
#[derive(Debug, Clone)]
pub struct EngineEnvironment {
    pub available: bool,
    pub status_message: String,
    pub home: Option<PathBuf>,
    pub binary: Option<PathBuf>,
    pub source: ResolutionSource,
    child_vars: Vec<(String, OsString)>,
}

impl EngineEnvironment {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            available: false,
            status_message: message.into(),
            home: None,
            binary: None,
            source: ResolutionSource::NotFound,
            child_vars: Vec::new(),
        }
    }

    /// Build the environment for an installation rooted at `home`.
    pub fn from_home(
        home: &Path,
        binary: PathBuf,
        source: ResolutionSource,
        search_path: Option<&OsString>,
    ) -> Self {
        let bin_dir = home.join("bin");
        let lib_dir = home.join("lib");

        let mut path_entries = vec![bin_dir.clone()];
        if let Some(existing) = search_path {
            path_entries.extend(env::split_paths(existing).filter(|p| p != &bin_dir));
        }
        let path_var = env::join_paths(&path_entries).unwrap_or_else(|_| bin_dir.clone().into());

        let cflags = format!(
            "-L{} -L{}",
            lib_dir.join("omc").display(),
            lib_dir.display()
        );

        let status_message = match source {
            ResolutionSource::ConfiguredHome => {
                format!("Using configured OpenModelica home: {}", home.display())
            }
            ResolutionSource::CandidateRoot => {
                format!("Found OpenModelica: {}", binary.display())
            }
            ResolutionSource::SearchPath => {
                format!("Found OpenModelica on PATH: {}", binary.display())
            }
            ResolutionSource::NotFound => String::new(),
        };

        Self {
            available: true,
            status_message,
            home: Some(home.to_path_buf()),
            binary: Some(binary),
            source,
            child_vars: vec![
                (HOME_VAR.to_string(), home.as_os_str().to_os_string()),
                (
                    LIBRARY_VAR.to_string(),
                    lib_dir.join("omlibrary").into_os_string(),
                ),
                (CFLAGS_VAR.to_string(), cflags.into()),
                ("PATH".to_string(), path_var),
            ],
        }
    }

    /// Variables set on every engine child process.
    pub fn child_env(&self) -> &[(String, OsString)] {
        &self.child_vars
    }

    pub fn bin_dir(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|h| h.join("bin"))
    }

    pub fn lib_dir(&self) -> Option<PathBuf> {
        self.home.as_ref().map(|h| h.join("lib"))
    }
}

pub struct EnvironmentResolver {
    settings: ResolverSettings,
}

impl EnvironmentResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self { settings }
    }

    /// Configured home, then candidate roots, then the search path.
    pub fn resolve(&self) -> EngineEnvironment {
        let s = &self.settings;
        let search_path = s.search_path.as_ref();

        if let Some(home) = &s.configured_home {
            let binary = binary_under(home, &s.engine_binary);
            if is_executable(&binary) {
                info!(home = %home.display(), "engine resolved from configured home");
                return EngineEnvironment::from_home(
                    home,
                    binary,
                    ResolutionSource::ConfiguredHome,
                    search_path,
                );
            }
            warn!(
                home = %home.display(),
                "configured engine home has no executable {}", s.engine_binary
            );
        }

        for root in &s.candidate_roots {
            let binary = binary_under(root, &s.engine_binary);
            if is_executable(&binary) {
                info!(root = %root.display(), "engine resolved from candidate root");
                return EngineEnvironment::from_home(
                    root,
                    binary,
                    ResolutionSource::CandidateRoot,
                    search_path,
                );
            }
            debug!(root = %root.display(), "candidate root rejected");
        }

        if let Some(binary) = search_path.and_then(|p| find_on_path(p, &s.engine_binary)) {
            // <home>/bin/<binary>
            if let Some(home) = binary.parent().and_then(Path::parent) {
                info!(binary = %binary.display(), "engine resolved from search path");
                let home = home.to_path_buf();
                return EngineEnvironment::from_home(
                    &home,
                    binary,
                    ResolutionSource::SearchPath,
                    search_path,
                );
            }
        }

        let message = format!(
            "OpenModelica is not installed or not configured correctly: no executable '{}' found \
             (set {} or install into one of: {})",
            s.engine_binary,
            HOME_VAR,
            s.candidate_roots
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        warn!("{}", message);
        EngineEnvironment::unavailable(message)
    }
}

fn binary_file_name(binary: &str) -> String {
    format!("{}{}", binary, env::consts::EXE_SUFFIX)
}

fn binary_under(root: &Path, binary: &str) -> PathBuf {
    root.join("bin").join(binary_file_name(binary))
}

fn find_on_path(search_path: &OsString, binary: &str) -> Option<PathBuf> {
    let name = binary_file_name(binary);
    env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(&name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
