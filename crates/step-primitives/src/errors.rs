//! Error types for step execution.

use thiserror::Error;

use automation_context::ContextError;
use browser_session::SessionError;
use challenger_core_types::StepOrder;

#[derive(Debug, Error, Clone)]
pub enum StepError {
    /// The step's locator or wait condition never resolved in time.
    #[error("Selector timeout: {0}")]
    SelectorTimeout(String),

    /// Navigation failed or timed out.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Element found but the interaction failed.
    #[error("Interaction failed: {0}")]
    Interaction(String),

    /// A templated value referenced a token the context cannot supply.
    #[error("{0}")]
    UnresolvedPlaceholder(ContextError),

    /// The step definition is missing a required part for its action.
    #[error("Step {order} is invalid: {reason}")]
    InvalidStep { order: StepOrder, reason: String },

    /// The CAPTCHA service could not produce a token and the step requires
    /// one to proceed.
    #[error("Captcha unresolved: {0}")]
    CaptchaUnresolved(String),

    /// Browser-level I/O failure.
    #[error("Browser failure: {0}")]
    Session(String),
}

impl StepError {
    /// Transient failures a caller may retry; placeholder and definition
    /// problems are permanent until the recipe is fixed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StepError::SelectorTimeout(_)
                | StepError::Navigation(_)
                | StepError::Interaction(_)
                | StepError::Session(_)
        )
    }
}

impl From<SessionError> for StepError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SelectorTimeout(msg) => StepError::SelectorTimeout(msg),
            SessionError::Navigation(msg) => StepError::Navigation(msg),
            SessionError::NotInteractable(msg) => StepError::Interaction(msg),
            SessionError::CaptchaUnresolved(msg) => StepError::CaptchaUnresolved(msg),
            other => StepError::Session(other.to_string()),
        }
    }
}

impl From<ContextError> for StepError {
    fn from(err: ContextError) -> Self {
        StepError::UnresolvedPlaceholder(err)
    }
}
