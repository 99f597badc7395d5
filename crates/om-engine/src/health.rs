//! Diagnostic snapshot of the engine installation.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::warn;

use crate::environment::EngineEnvironment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryStatus {
    pub exists: bool,
    pub path: String,
}

impl DirectoryStatus {
    fn inspect(path: &Path) -> Self {
        Self {
            exists: path.is_dir(),
            path: path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDirectories {
    pub bin: DirectoryStatus,
    pub lib: DirectoryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directories: Option<HealthDirectories>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_available: bool,
    pub status_message: String,
    pub installation_path: Option<String>,
    pub version: Option<String>,
    pub details: HealthDetails,
}

/// Check the installation: `<binary> --version` plus the `bin`/`lib` layout.
///
/// Never fails; anything that goes wrong while checking lands in
/// `details.check_error`.
pub async fn health_status(env: &EngineEnvironment, version_timeout: Duration) -> HealthStatus {
    let mut status = HealthStatus {
        is_available: env.available,
        status_message: env.status_message.clone(),
        installation_path: env.home.as_ref().map(|h| h.display().to_string()),
        version: None,
        details: HealthDetails::default(),
    };

    if !env.available {
        return status;
    }

    if let (Some(bin), Some(lib)) = (env.bin_dir(), env.lib_dir()) {
        status.details.directories = Some(HealthDirectories {
            bin: DirectoryStatus::inspect(&bin),
            lib: DirectoryStatus::inspect(&lib),
        });
    }

    match query_version(env, version_timeout).await {
        Ok(version) => status.version = Some(version),
        Err(message) => {
            warn!(error = %message, "engine version check failed");
            status.details.check_error = Some(message);
        }
    }

    status
}

async fn query_version(env: &EngineEnvironment, timeout: Duration) -> Result<String, String> {
    let binary = env
        .binary
        .as_ref()
        .ok_or_else(|| "no engine binary resolved".to_string())?;

    let mut cmd = Command::new(binary);
    cmd.arg("--version")
        .envs(env.child_env().iter().map(|(k, v)| (k.as_str(), v.as_os_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(result) => result.map_err(|e| format!("failed to run {}: {}", binary.display(), e))?,
        Err(_) => {
            return Err(format!(
                "{} --version did not finish within {:.1}s",
                binary.display(),
                timeout.as_secs_f64()
            ));
        }
    };

    if !output.status.success() {
        return Err(format!(
            "{} --version exited with {}: {}",
            binary.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
