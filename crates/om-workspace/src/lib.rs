//! om-workspace: per-run directories and run-script rendering.

pub mod template;
pub mod workspace;

pub use template::{BUILTIN_TEMPLATE, PLACEHOLDERS, RenderParams, ScriptTemplate};
pub use workspace::{RetentionPolicy, SCRIPT_FILE_NAME, Workspace, WorkspaceManager, WorkspaceSettings};

use std::path::PathBuf;

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

#[derive(thiserror::Error, Debug)]
pub enum WorkspaceError {
    #[error("Run-script template not readable: {}", path.display())]
    TemplateMissing {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unresolved template placeholders: {}", tokens.join(", "))]
    PlaceholderError { tokens: Vec<String> },

    #[error("Workspace directory already exists: {}", path.display())]
    Collision { path: PathBuf },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid identifier: {0}")]
    Identifier(#[from] om_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
