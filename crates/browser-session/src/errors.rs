//! Error types for browser sessions and page driving.

use thiserror::Error;

/// Errors raised by the session provider and page drivers.
#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// Browser process failed to launch or attach.
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Navigation did not complete.
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Selector never resolved to an element within the timeout.
    #[error("Selector timeout: {0}")]
    SelectorTimeout(String),

    /// Element was found but could not be interacted with.
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// CAPTCHA solving call failed or timed out.
    #[error("Captcha unresolved: {0}")]
    CaptchaUnresolved(String),

    /// CDP communication or protocol error.
    #[error("Browser I/O error: {0}")]
    Io(String),

    /// Graceful teardown failed; the process may have been killed instead.
    #[error("Session teardown failed: {0}")]
    Teardown(String),
}

impl SessionError {
    /// Transient failures worth retrying at a higher layer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::SelectorTimeout(_)
                | SessionError::NotInteractable(_)
                | SessionError::Io(_)
        )
    }
}
