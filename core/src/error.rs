//! Error types for the request handler.
//!
//! # Design
//! Every failure is a `TransportError`. Callers that only care about the
//! category can match on `kind()`; `ExecutionFailure` keeps the engine's
//! native message and numeric code untouched so they can be reported as-is.

use thiserror::Error;

use crate::options::OptionKey;

/// Category of a `TransportError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ExtensionUnavailable,
    InitializationFailure,
    OptionApplicationFailure,
    ExecutionFailure,
    IllegalState,
}

/// Errors returned by `RequestHandler` and the transport engine.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport engine is not usable in this build or environment.
    #[error("transport engine is unavailable")]
    ExtensionUnavailable,

    /// A session handle could not be created.
    #[error("session initialization failed: {0}")]
    InitializationFailure(String),

    /// The engine refused one of the configured options.
    #[error("option {option} rejected: {reason}")]
    OptionApplicationFailure { option: OptionKey, reason: String },

    /// The request did not complete.
    #[error("request failed ({code}): {message}")]
    ExecutionFailure { message: String, code: u32 },

    /// A request was attempted without an open session.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),
}

impl TransportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::ExtensionUnavailable => ErrorKind::ExtensionUnavailable,
            TransportError::InitializationFailure(_) => ErrorKind::InitializationFailure,
            TransportError::OptionApplicationFailure { .. } => ErrorKind::OptionApplicationFailure,
            TransportError::ExecutionFailure { .. } => ErrorKind::ExecutionFailure,
            TransportError::IllegalState(_) => ErrorKind::IllegalState,
        }
    }

    pub(crate) fn rejected(option: OptionKey, reason: impl Into<String>) -> Self {
        TransportError::OptionApplicationFailure {
            option,
            reason: reason.into(),
        }
    }
}

/// Failure reported by an engine while executing a request: the engine's own
/// message and numeric error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    pub message: String,
    pub code: u32,
}

impl EngineFailure {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

impl From<EngineFailure> for TransportError {
    fn from(failure: EngineFailure) -> Self {
        TransportError::ExecutionFailure {
            message: failure.message,
            code: failure.code,
        }
    }
}

/// Errors raised while reading `HandlerConfig` from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not valid: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}
