use std::fmt::{Display, Formatter};

use serde_json::Value;

use crate::FieldErrors;

/// Fallback message used when neither the server nor the transport said anything.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Failure reported by an HTTP transport.
///
/// `status` and `body` are present only when the server answered.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFailure {
    status: Option<u16>,
    message: String,
    body: Option<Value>,
}

impl TransportFailure {
    /// Creates a failure for a request that never produced a response.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// Creates a failure for a non-success response.
    #[must_use]
    pub fn with_status(status: u16, message: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            body,
        }
    }

    /// Returns the HTTP status, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the transport's own message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns the parsed response body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Returns whether the server answered at all.
    #[must_use]
    pub fn has_response(&self) -> bool {
        self.status.is_some()
    }

    /// Returns the server's `message` field.
    ///
    /// Array messages (one per rule) are joined with `", "`.
    #[must_use]
    pub fn server_message(&self) -> Option<String> {
        let message = self.body.as_ref()?.get("message")?;
        let text = match message {
            Value::String(text) => text.clone(),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            _ => return None,
        };

        (!text.trim().is_empty()).then_some(text)
    }

    /// Returns the server's `statusCode` field, falling back to the HTTP status.
    #[must_use]
    pub fn server_status_code(&self) -> Option<u64> {
        self.body
            .as_ref()
            .and_then(|body| body.get("statusCode"))
            .and_then(Value::as_u64)
            .or_else(|| self.status.map(u64::from))
    }

    /// Human-readable message: server message, transport message, generic fallback.
    #[must_use]
    pub fn display_message(&self) -> String {
        if let Some(message) = self.server_message() {
            return message;
        }

        if !self.message.trim().is_empty() {
            return self.message.clone();
        }

        GENERIC_ERROR_MESSAGE.to_owned()
    }

    /// Extracts the structured `{errors: {field: [message]}}` body.
    #[must_use]
    pub fn field_errors(&self) -> Option<FieldErrors> {
        let errors = self.body.as_ref()?.get("errors")?.as_object()?;

        Some(
            errors
                .iter()
                .map(|(field, messages)| {
                    let messages = match messages {
                        Value::Array(items) => items.iter().map(value_to_message).collect(),
                        other => vec![value_to_message(other)],
                    };
                    (field.clone(), messages)
                })
                .collect(),
        )
    }
}

fn value_to_message(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Display for TransportFailure {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(formatter, "HTTP {status}: {}", self.display_message()),
            None => write!(formatter, "{}", self.display_message()),
        }
    }
}
