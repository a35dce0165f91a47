use thiserror::Error;

use crate::session::Phase;

/// Shown for every failed fetch, whatever the cause.
pub const RETRY_MESSAGE: &str = "Could not generate recipes. Please try again.";

/// Failure of a single recipe fetch.
///
/// `Fetch` covers everything up to and including the API envelope; `Validation` means
/// the model answered but its text is not the array-of-recipes shape we asked for.
/// Both block progress the same way in the UI; only the logs tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecipeError {
    #[error("recipe fetch failed: {message}")]
    Fetch { message: String },
    #[error("recipe response invalid: {message}")]
    Validation { message: String },
}

impl RecipeError {
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Validation { .. } => "validation",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Fetch { message } | Self::Validation { message } => message,
        }
    }

    pub fn user_message(&self) -> &'static str {
        RETRY_MESSAGE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {action} while {phase}")]
    InvalidTransition { action: &'static str, phase: Phase },
    #[error("no recipe #{index}; {available} available")]
    NoSuchRecipe { index: usize, available: usize },
    #[error("unknown dietary filter '{0}'")]
    UnknownFilter(String),
    #[error("recipe has no steps")]
    NoSteps,
}
