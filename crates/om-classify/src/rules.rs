//! The ordered rule table.

use om_core::ErrorCategory;
use regex::Regex;

use crate::{ClassifyError, ClassifyResult};

/// Uncompiled rule: the category and a pattern whose group 1 is the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSpec {
    pub category: ErrorCategory,
    pub pattern: &'static str,
}

/// Default rules, in precedence order.
///
/// Load failures come before compile errors: the engine reports a model it
/// could not load with an `Error:` line too, and the load rule is the more
/// specific of the two.
pub const RULES: &[RuleSpec] = &[
    RuleSpec {
        category: ErrorCategory::LoadFailure,
        pattern: r"(?im)((?:failed to load|parse error|lexer failed|syntax error)[^\n]*)",
    },
    RuleSpec {
        category: ErrorCategory::CompileError,
        pattern: r"(?m)((?:Translation Error|Failed to build model|Error:)[^\n]*)",
    },
    RuleSpec {
        category: ErrorCategory::SimulationFailure,
        pattern: r"(?im)((?:simulation execution failed|simulation terminated|integrator failed|the simulation finished unsuccessfully|division by zero)[^\n]*)",
    },
    RuleSpec {
        category: ErrorCategory::FileProcessingError,
        pattern: r"(?im)((?:could not|cannot|failed to) (?:open|read|write)[^\n]*)",
    },
];

#[derive(Debug, Clone)]
pub struct ClassificationRule {
    category: ErrorCategory,
    regex: Regex,
}

impl ClassificationRule {
    pub fn compile(spec: &RuleSpec) -> ClassifyResult<Self> {
        let regex = Regex::new(spec.pattern).map_err(|source| ClassifyError::Pattern {
            category: spec.category,
            source,
        })?;
        if regex.captures_len() < 2 {
            return Err(ClassifyError::MissingGroup {
                category: spec.category,
            });
        }
        Ok(Self {
            category: spec.category,
            regex,
        })
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Group 1 of the first match, trimmed.
    pub fn apply(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_compiles() {
        for spec in RULES {
            ClassificationRule::compile(spec).unwrap();
        }
    }

    #[test]
    fn pattern_without_group_is_rejected() {
        let err = ClassificationRule::compile(&RuleSpec {
            category: ErrorCategory::Unknown,
            pattern: "Error",
        })
        .unwrap_err();
        assert!(matches!(err, ClassifyError::MissingGroup { .. }));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = ClassificationRule::compile(&RuleSpec {
            category: ErrorCategory::Unknown,
            pattern: "(unclosed",
        })
        .unwrap_err();
        assert!(matches!(err, ClassifyError::Pattern { .. }));
    }

    #[test]
    fn compile_rule_captures_from_keyword() {
        let rule = ClassificationRule::compile(&RULES[1]).unwrap();
        let msg = rule
            .apply("[/w/X.mo:4:3-4:12:writable] Error: Variable y not found in scope X.\n")
            .unwrap();
        assert_eq!(msg, "Error: Variable y not found in scope X.");
    }
}
