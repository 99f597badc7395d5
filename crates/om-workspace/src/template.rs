//! Run-script template rendering.
//!
//! A template is engine script text with three `{{name}}` placeholders:
//! `{{workspace_dir}}`, `{{model_file}}` and `{{model_name}}`. Paths are
//! always rendered with forward slashes since the engine's script dialect
//! treats backslashes as escapes.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use om_core::ModelIdentifier;
use regex::{Captures, Regex};

use crate::{WorkspaceError, WorkspaceResult};

/// Template compiled into the binary; used when no template file is configured.
pub const BUILTIN_TEMPLATE: &str = include_str!("../templates/run.mos");

/// Placeholder names every template must reference.
pub const PLACEHOLDERS: [&str; 3] = ["workspace_dir", "model_file", "model_name"];

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Values substituted into a template for one run.
#[derive(Debug, Clone, Copy)]
pub struct RenderParams<'a> {
    pub workspace_dir: &'a Path,
    pub model_file: &'a Path,
    pub model: &'a ModelIdentifier,
}

#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    source: String,
}

impl ScriptTemplate {
    pub fn builtin() -> Self {
        Self {
            source: BUILTIN_TEMPLATE.to_string(),
        }
    }

    /// Load a template file; `TemplateMissing` if it cannot be read.
    pub fn from_file(path: &Path) -> WorkspaceResult<Self> {
        let source = fs::read_to_string(path).map_err(|source| WorkspaceError::TemplateMissing {
            path: path.to_path_buf(),
            source,
        })?;
        Self::checked(source)
    }

    pub fn from_string(source: impl Into<String>) -> WorkspaceResult<Self> {
        Self::checked(source.into())
    }

    fn checked(source: String) -> WorkspaceResult<Self> {
        let referenced: Vec<String> = placeholder_regex()
            .captures_iter(&source)
            .map(|caps| caps[1].to_string())
            .collect();
        let missing: Vec<String> = PLACEHOLDERS
            .iter()
            .filter(|name| !referenced.iter().any(|r| r == *name))
            .map(|name| format!("{{{{{}}}}} (never referenced)", name))
            .collect();
        if !missing.is_empty() {
            return Err(WorkspaceError::PlaceholderError { tokens: missing });
        }
        Ok(Self { source })
    }

    /// Substitute every placeholder.
    ///
    /// Fails with `PlaceholderError` listing each `{{token}}` that has no
    /// value, so a typo in a custom template never reaches the engine.
    pub fn render(&self, params: &RenderParams<'_>) -> WorkspaceResult<String> {
        let workspace_dir = to_script_path(params.workspace_dir);
        let model_file = to_script_path(params.model_file);
        let mut unresolved = Vec::new();

        let rendered = placeholder_regex().replace_all(&self.source, |caps: &Captures<'_>| {
            match &caps[1] {
                "workspace_dir" => workspace_dir.clone(),
                "model_file" => model_file.clone(),
                "model_name" => params.model.as_str().to_string(),
                _ => {
                    unresolved.push(caps[0].to_string());
                    caps[0].to_string()
                }
            }
        });

        if !unresolved.is_empty() {
            return Err(WorkspaceError::PlaceholderError { tokens: unresolved });
        }
        Ok(rendered.into_owned())
    }
}

impl Default for ScriptTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Render a path the way engine scripts expect it.
pub fn to_script_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>(dir: &'a Path, file: &'a Path, model: &'a ModelIdentifier) -> RenderParams<'a> {
        RenderParams {
            workspace_dir: dir,
            model_file: file,
            model,
        }
    }

    #[test]
    fn builtin_template_renders_all_values() {
        let model = ModelIdentifier::new("X").unwrap();
        let dir = Path::new("/tmp/run1");
        let file = Path::new("/tmp/run1/X.mo");
        let script = ScriptTemplate::builtin()
            .render(&params(dir, file, &model))
            .unwrap();

        assert!(!placeholder_regex().is_match(&script));
        assert!(script.contains("/tmp/run1"));
        assert!(script.contains("/tmp/run1/X.mo"));
        assert!(script.contains("simulate(X,"));
    }

    #[test]
    fn builtin_template_orders_commands() {
        let source = BUILTIN_TEMPLATE;
        let load = source.find("loadFile(").unwrap();
        let simulate = source.find("simulate(").unwrap();
        let errors = source.rfind("getErrorString()").unwrap();
        assert!(load < simulate && simulate < errors);
        assert!(source.contains("stopTime=10.0"));
        assert!(source.contains("numberOfIntervals=500"));
    }

    #[test]
    fn backslashes_become_forward_slashes() {
        assert_eq!(
            to_script_path(Path::new(r"C:\work\run1\X.mo")),
            "C:/work/run1/X.mo"
        );
    }

    #[test]
    fn unknown_placeholder_is_reported() {
        let template = ScriptTemplate::from_string(
            "cd(\"{{workspace_dir}}\"); loadFile(\"{{model_file}}\"); simulate({{model_name}}, stopTime={{stop_time}});",
        )
        .unwrap();
        let model = ModelIdentifier::new("X").unwrap();
        let err = template
            .render(&params(Path::new("/w"), Path::new("/w/X.mo"), &model))
            .unwrap_err();
        match err {
            WorkspaceError::PlaceholderError { tokens } => {
                assert_eq!(tokens, vec!["{{stop_time}}".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn template_must_reference_every_placeholder() {
        let err = ScriptTemplate::from_string("simulate({{model_name}});").unwrap_err();
        match err {
            WorkspaceError::PlaceholderError { tokens } => assert_eq!(tokens.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn whitespace_inside_braces_is_accepted() {
        let template = ScriptTemplate::from_string(
            "{{ workspace_dir }}|{{model_file}}|{{  model_name}}",
        )
        .unwrap();
        let model = ModelIdentifier::new("Tank").unwrap();
        let out = template
            .render(&params(Path::new("/a"), Path::new("/a/Tank.mo"), &model))
            .unwrap();
        assert_eq!(out, "/a|/a/Tank.mo|Tank");
    }

    #[test]
    fn missing_template_file() {
        let err = ScriptTemplate::from_file(Path::new("/definitely/not/here.mos")).unwrap_err();
        assert!(matches!(err, WorkspaceError::TemplateMissing { .. }));
    }
}
