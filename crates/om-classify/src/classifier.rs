//! Ordered-rule classification of captured engine output.

use om_core::{ErrorCategory, ErrorReport};
use tracing::debug;

use crate::ClassifyResult;
use crate::rules::{ClassificationRule, RULES, RuleSpec};

pub const NO_OUTPUT_MESSAGE: &str = "no output captured";
pub const NO_MATCH_MESSAGE: &str = "unrecognized engine output; inspect raw output";

#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::with_rules(RULES).expect("built-in classification rules compile")
    }
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a classifier from a custom table; order is precedence.
    pub fn with_rules(specs: &[RuleSpec]) -> ClassifyResult<Self> {
        let rules = specs
            .iter()
            .map(ClassificationRule::compile)
            .collect::<ClassifyResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn classify(&self, stdout: &str, stderr: &str) -> ErrorReport {
        if stdout.trim().is_empty() && stderr.trim().is_empty() {
            return ErrorReport::new(ErrorCategory::Unknown, NO_OUTPUT_MESSAGE, "");
        }

        let text = join_streams(stdout, stderr);
        for rule in &self.rules {
            if let Some(message) = rule.apply(&text) {
                debug!(category = %rule.category(), "classified engine output");
                return ErrorReport::new(rule.category(), message, text);
            }
        }
        ErrorReport::new(ErrorCategory::Unknown, NO_MATCH_MESSAGE, text)
    }
}

fn join_streams(stdout: &str, stderr: &str) -> String {
    if stdout.is_empty() || stderr.is_empty() || stdout.ends_with('\n') {
        format!("{}{}", stdout, stderr)
    } else {
        format!("{}\n{}", stdout, stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_joined_on_a_line_boundary() {
        assert_eq!(join_streams("a", "b"), "a\nb");
        assert_eq!(join_streams("a\n", "b"), "a\nb");
        assert_eq!(join_streams("", "b"), "b");
        assert_eq!(join_streams("a", ""), "a");
    }

    #[test]
    fn whitespace_only_output_counts_as_empty() {
        let report = ErrorClassifier::new().classify("  \n", "\t");
        assert_eq!(report.category, ErrorCategory::Unknown);
        assert_eq!(report.message, NO_OUTPUT_MESSAGE);
    }
}
