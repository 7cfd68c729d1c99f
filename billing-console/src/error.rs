use console_core::error::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("action not permitted: {0}")]
    Forbidden(&'static str),

    #[error("cannot {action} while {state}")]
    State {
        action: &'static str,
        state: &'static str,
    },
}

/// Transient operator-facing notification. Controllers convert every failure
/// into one of these so the UI never sits on an unhandled rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Success(text) | Notice::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}
