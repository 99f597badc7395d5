use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid model identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: &'static str },

    #[error("No model declaration found in source")]
    ModelNameNotFound,

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
