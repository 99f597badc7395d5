use core::fmt;
use core::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Name of a Modelica model class, safe to embed in file names and scripts.
///
/// Valid identifiers match `^[A-Za-z][A-Za-z0-9_]*$`. The check runs before
/// anything touches the filesystem, so every downstream path built from a
/// `ModelIdentifier` stays inside its workspace.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelIdentifier(String);

impl ModelIdentifier {
    pub fn new(value: impl Into<String>) -> CoreResult<Self> {
        let value = value.into();
        validate_identifier(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the CSV artifact the engine writes for this model.
    pub fn artifact_file_name(&self) -> String {
        format!("{}_res.csv", self.0)
    }
}

fn validate_identifier(value: &str) -> CoreResult<()> {
    let invalid = |reason| CoreError::InvalidIdentifier {
        value: value.to_string(),
        reason,
    };

    let mut chars = value.chars();
    match chars.next() {
        None => return Err(invalid("identifier is empty")),
        Some(c) if !c.is_ascii_alphabetic() => {
            return Err(invalid("identifier must start with an ASCII letter"));
        }
        Some(_) => {}
    }
    if chars.any(|c| !(c.is_ascii_alphanumeric() || c == '_')) {
        return Err(invalid(
            "identifier may only contain ASCII letters, digits and '_'",
        ));
    }
    Ok(())
}

impl FromStr for ModelIdentifier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ModelIdentifier {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModelIdentifier> for String {
    fn from(id: ModelIdentifier) -> Self {
        id.0
    }
}

impl AsRef<str> for ModelIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelIdentifier({})", self.0)
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one run: `<model>_<unix millis>_<discriminator>`.
///
/// Doubles as the workspace directory name and the archive key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceId(String);

impl WorkspaceId {
    pub fn new(model: &ModelIdentifier, timestamp_ms: i64, discriminator: &str) -> CoreResult<Self> {
        Self::parse(format!("{}_{}_{}", model, timestamp_ms, discriminator))
    }

    /// Accepts any non-empty `[A-Za-z0-9_-]` string; run ids arrive from
    /// callers and must never contain path separators.
    pub fn parse(value: impl Into<String>) -> CoreResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(CoreError::InvalidArg {
                what: "run id is empty",
            });
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CoreError::InvalidArg {
                what: "run id contains characters outside [A-Za-z0-9_-]",
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkspaceId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<WorkspaceId> for String {
    fn from(id: WorkspaceId) -> Self {
        id.0
    }
}

impl fmt::Debug for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkspaceId({})", self.0)
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn model_decl_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:(?:partial|encapsulated)\s+)*model\s+([A-Za-z][A-Za-z0-9_]*)")
            .expect("model declaration pattern is valid")
    })
}

/// Find the first top-level `model <Name>` declaration in Modelica source.
pub fn extract_model_name(source: &str) -> CoreResult<ModelIdentifier> {
    model_decl_regex()
        .captures(source)
        .and_then(|caps| caps.get(1))
        .ok_or(CoreError::ModelNameNotFound)
        .and_then(|m| ModelIdentifier::new(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_examples() {
        assert!(ModelIdentifier::new("Model1").is_ok());
        assert!(ModelIdentifier::new("M").is_ok());
        assert!(ModelIdentifier::new("Bouncing_Ball_2").is_ok());
        assert!(ModelIdentifier::new("1Model").is_err());
        assert!(ModelIdentifier::new("Model-1").is_err());
        assert!(ModelIdentifier::new("").is_err());
        assert!(ModelIdentifier::new("_Model").is_err());
        assert!(ModelIdentifier::new("Model 1").is_err());
        assert!(ModelIdentifier::new("Modèle").is_err());
    }

    #[test]
    fn identifier_serde_rejects_invalid() {
        let ok: ModelIdentifier = serde_json::from_str("\"Tank\"").unwrap();
        assert_eq!(ok.as_str(), "Tank");
        assert!(serde_json::from_str::<ModelIdentifier>("\"../etc\"").is_err());
    }

    #[test]
    fn artifact_name_follows_engine_convention() {
        let id = ModelIdentifier::new("Decay").unwrap();
        assert_eq!(id.artifact_file_name(), "Decay_res.csv");
    }

    #[test]
    fn workspace_id_layout() {
        let model = ModelIdentifier::new("Decay").unwrap();
        let id = WorkspaceId::new(&model, 1_700_000_000_123, "a1b2c3d4").unwrap();
        assert_eq!(id.as_str(), "Decay_1700000000123_a1b2c3d4");
    }

    #[test]
    fn workspace_id_rejects_path_segments() {
        assert!(WorkspaceId::parse("../x").is_err());
        assert!(WorkspaceId::parse("a/b").is_err());
        assert!(WorkspaceId::parse("").is_err());
        assert!(WorkspaceId::parse("Decay_1_ff").is_ok());
    }

    #[test]
    fn extracts_model_name() {
        let src = "// decay\nmodel Decay\n  Real x(start=1);\nequation\n  der(x) = -x;\nend Decay;\n";
        assert_eq!(extract_model_name(src).unwrap().as_str(), "Decay");

        let partial = "within Foo;\npartial model Base\nend Base;\n";
        assert_eq!(extract_model_name(partial).unwrap().as_str(), "Base");

        assert_eq!(
            extract_model_name("function f\nend f;"),
            Err(CoreError::ModelNameNotFound)
        );
    }
}
