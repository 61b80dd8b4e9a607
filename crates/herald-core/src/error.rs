//! Error types for the Herald routing core

use std::time::Duration;
use thiserror::Error;

use crate::types::TaskCategory;

/// Result type alias for Herald operations
pub type HeraldResult<T> = Result<T, HeraldError>;

/// Failure taxonomy for classification, routing and handler execution.
///
/// None of these escape [`crate::Assistant::handle`]; they are folded into an error
/// [`crate::HandlerResult`] at the component that observed them.
#[derive(Error, Debug)]
pub enum HeraldError {
    #[error("Classification output invalid: {0}")]
    ClassificationInvalid(String),

    #[error("Handler for {category} timed out after {after:?}")]
    HandlerTimeout { category: TaskCategory, after: Duration },

    #[error("Handler for {category} failed: {reason}")]
    HandlerFailure { category: TaskCategory, reason: String },

    #[error("External service '{service}' unavailable: {reason}")]
    ExternalUnavailable { service: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl HeraldError {
    pub fn failure(category: TaskCategory, reason: impl Into<String>) -> Self {
        HeraldError::HandlerFailure {
            category,
            reason: reason.into(),
        }
    }

    pub fn unavailable(service: impl Into<String>, err: &CollaboratorError) -> Self {
        HeraldError::ExternalUnavailable {
            service: service.into(),
            reason: err.to_string(),
        }
    }

    /// Machine-readable kind carried on error results.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HeraldError::ClassificationInvalid(_) => ErrorKind::ClassificationInvalid,
            HeraldError::HandlerTimeout { .. } => ErrorKind::HandlerTimeout,
            HeraldError::HandlerFailure { .. } => ErrorKind::HandlerFailure,
            HeraldError::ExternalUnavailable { .. } => ErrorKind::ExternalUnavailable,
            HeraldError::InvalidInput(_) => ErrorKind::InvalidInput,
            HeraldError::Config(_) => ErrorKind::HandlerFailure,
        }
    }

    /// Sentence suitable for speaking back to the user. Never includes internal detail.
    pub fn user_message(&self) -> String {
        match self {
            HeraldError::ClassificationInvalid(_) => {
                "Sorry, I couldn't understand that request.".to_string()
            }
            HeraldError::HandlerTimeout { .. } => TIMEOUT_MESSAGE.to_string(),
            HeraldError::HandlerFailure { .. } => {
                "Sorry, something went wrong while handling that request.".to_string()
            }
            HeraldError::ExternalUnavailable { .. } => {
                "Sorry, that service isn't reachable right now. Please try again later."
                    .to_string()
            }
            HeraldError::InvalidInput(msg) => msg.clone(),
            HeraldError::Config(_) => "Sorry, I'm not configured for that yet.".to_string(),
        }
    }
}

/// User-visible message for a handler that ran past its time budget.
pub const TIMEOUT_MESSAGE: &str = "This request is taking longer than expected. Please try again.";

/// Serializable error kind attached to [`crate::HandlerResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ClassificationInvalid,
    HandlerTimeout,
    HandlerFailure,
    ExternalUnavailable,
    InvalidInput,
}

/// Errors returned by injected collaborators (search, mail, data providers, models).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out")]
    Timeout,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl CollaboratorError {
    /// Transport-level failures are worth another attempt; rejections and bad payloads are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CollaboratorError::Unavailable(_) | CollaboratorError::Timeout)
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(err: serde_json::Error) -> Self {
        CollaboratorError::Malformed(err.to_string())
    }
}
