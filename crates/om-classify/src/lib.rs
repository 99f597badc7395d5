//! om-classify: turning engine diagnostics into an [`om_core::ErrorCategory`].
//!
//! Classification is an ordered table of `(category, pattern)` rules. The
//! first rule in table order whose pattern matches anywhere in the captured
//! text wins, regardless of where in the text the match sits. Order is part
//! of the contract because patterns overlap: a load failure also contains an
//! `Error:` line that the compile-error rule would accept.

pub mod classifier;
pub mod rules;

pub use classifier::{ErrorClassifier, NO_MATCH_MESSAGE, NO_OUTPUT_MESSAGE};
pub use rules::{ClassificationRule, RULES, RuleSpec};

pub type ClassifyResult<T> = Result<T, ClassifyError>;

#[derive(thiserror::Error, Debug)]
pub enum ClassifyError {
    #[error("Invalid pattern for {category} rule: {source}")]
    Pattern {
        category: om_core::ErrorCategory,
        source: regex::Error,
    },

    #[error("Rule for {category} has no capture group")]
    MissingGroup { category: om_core::ErrorCategory },
}
