//! Error types for the runtime
//!
//! Every fallible operation returns `Result<_, JsError>`. An `Err` is an
//! abrupt completion: callers forward it with `?` and never inspect partial
//! results.

use crate::prelude::*;
use crate::value::{Guarded, JsValue};
use thiserror::Error;

/// Coarse classification of a [`JsError`], for callers that match on kind
/// rather than message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong receiver, missing or non-callable callback, failed coercion
    Type,
    /// Invalid length, offset or option value
    Range,
    /// Known unsupported operation or broken runtime invariant
    Internal,
    /// A value thrown by user code
    Thrown,
}

/// Main error type for the runtime
#[derive(Debug, Error)]
pub enum JsError {
    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    #[error("InternalError: {0}")]
    Internal(String),

    /// Error thrown with a JsValue, kept rooted while the error propagates
    #[error("Uncaught {}", .guarded.value.to_display_string())]
    ThrownValue { guarded: Guarded },
}

impl JsError {
    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    /// Create an internal error for unexpected runtime states
    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    /// A deliberate, declared gap in the runtime (not misuse by the caller)
    pub fn not_implemented(what: &str) -> Self {
        JsError::Internal(format!("{} is not implemented", what))
    }

    /// Create an error that wraps a thrown JsValue with its guard
    pub fn thrown(guarded: Guarded) -> Self {
        JsError::ThrownValue { guarded }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JsError::TypeError { .. } => ErrorKind::Type,
            JsError::RangeError { .. } => ErrorKind::Range,
            JsError::Internal(_) => ErrorKind::Internal,
            JsError::ThrownValue { .. } => ErrorKind::Thrown,
        }
    }

    /// The thrown value, if this error carries one
    pub fn thrown_value(&self) -> Option<&JsValue> {
        match self {
            JsError::ThrownValue { guarded } => Some(&guarded.value),
            _ => None,
        }
    }
}
