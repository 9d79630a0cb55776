//! Shared primitives for all Rust crates in listkit.

#![forbid(unsafe_code)]

/// Transport failure details shared by every remote call.
pub mod transport;
/// Field-level validation results.
pub mod violation;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use transport::{GENERIC_ERROR_MESSAGE, TransportFailure};
pub use violation::{FieldErrors, FieldViolation};

/// Result type used across listkit crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common error categories for remote data access.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant on the client side.
    #[error("validation error: {0}")]
    Validation(String),

    /// The transport call failed, with or without a server response.
    #[error("transport error: {0}")]
    Transport(TransportFailure),

    /// Response shape (array vs single object) disagrees with the schema.
    #[error("response shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Response items violated schema rules.
    #[error("response validation failed for {} field(s)", .0.len())]
    SchemaValidation(Vec<FieldViolation>),

    /// Response items carried fields the schema does not declare.
    #[error("extra fields detected: {}", .0.join(", "))]
    ExtraFields(Vec<String>),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the message shown to a human for this error.
    ///
    /// Transport failures prefer the server's `message`, then the transport
    /// message, then a generic fallback.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(failure) => failure.display_message(),
            other => other.to_string(),
        }
    }

    /// Returns the transport failure when this error came from the transport.
    #[must_use]
    pub fn transport_failure(&self) -> Option<&TransportFailure> {
        match self {
            Self::Transport(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns whether this error is a response shape mismatch.
    #[must_use]
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch(_))
    }
}

impl From<TransportFailure> for AppError {
    fn from(value: TransportFailure) -> Self {
        Self::Transport(value)
    }
}
