//! Wire frames exchanged between bridge and controller.
//!
//! Every WebSocket text message carries exactly one [`Frame`], tagged by
//! `type`.
//!
//! | Frame | Direction | Purpose |
//! |-------|-----------|---------|
//! | `command` | Controller → Bridge | Command request |
//! | `response` | Bridge → Controller | Command result |
//! | `event` | Bridge → Controller | Fire-and-forget notification |
//! | `invoke` | Bridge → Controller | Event awaiting a reply |
//! | `reply` | Controller → Bridge | Answer to an `invoke` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{
    CODE_ENGINE_ERROR, CODE_INVALID_ARGUMENT, CODE_PROTOCOL_VIOLATION, Error, Result,
};
use crate::identifiers::RequestId;

use super::command::MethodCall;
use super::event::Event;

// ============================================================================
// MethodResult
// ============================================================================

/// Outcome of a command or a reply.
///
/// # Format
///
/// ```json
/// { "status": "success", "result": true }
/// { "status": "error", "code": "invalid_argument", "message": "...", "field": "url" }
/// { "status": "notImplemented" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResult {
    /// Completed with a value.
    Success {
        /// Result value, `null` for mutations.
        #[serde(default)]
        result: Value,
    },

    /// Failed with a structured error.
    Error {
        /// Stable error code.
        code: String,
        /// Error detail.
        message: String,
        /// Offending field, for argument errors.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Method not recognized.
    NotImplemented,
}

impl MethodResult {
    /// Creates a success result.
    #[inline]
    #[must_use]
    pub fn success(result: Value) -> Self {
        Self::Success { result }
    }

    /// Converts a crate result into its wire form.
    #[must_use]
    pub fn from_result(result: Result<Value>) -> Self {
        match result {
            Ok(value) => Self::Success { result: value },
            Err(Error::Unimplemented { .. }) => Self::NotImplemented,
            Err(err) => Self::from_error(&err),
        }
    }

    /// Converts an error into its wire form.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        if matches!(err, Error::Unimplemented { .. }) {
            return Self::NotImplemented;
        }

        let message = match err {
            Error::InvalidArgument { message, .. }
            | Error::Engine { message }
            | Error::ProtocolViolation { message } => message.clone(),
            other => other.to_string(),
        };

        Self::Error {
            code: err.code().to_string(),
            message,
            field: err.field().map(str::to_owned),
        }
    }

    /// Returns `true` for a success result.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Extracts the value, mapping failures back into crate errors.
    ///
    /// # Errors
    ///
    /// - [`Error::Unimplemented`] naming `method` for `notImplemented`
    /// - The matching [`Error`] variant for known codes
    /// - [`Error::Remote`] for any other code
    pub fn into_result(self, method: &str) -> Result<Value> {
        match self {
            Self::Success { result } => Ok(result),
            Self::NotImplemented => Err(Error::unimplemented(method)),
            Self::Error {
                code,
                message,
                field,
            } => Err(match code.as_str() {
                CODE_INVALID_ARGUMENT => Error::invalid_argument(field.unwrap_or_default(), message),
                CODE_ENGINE_ERROR => Error::engine(message),
                CODE_PROTOCOL_VIOLATION => Error::protocol_violation(message),
                _ => Error::remote(code, message),
            }),
        }
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A single wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Frame {
    /// Command request from the controller.
    Command {
        /// Correlation ID.
        id: RequestId,
        /// Command name.
        method: String,
        /// Opaque payload.
        #[serde(default)]
        arguments: Value,
    },

    /// Result of a command.
    Response {
        /// Matches the command `id`.
        id: RequestId,
        /// Outcome.
        result: MethodResult,
    },

    /// Fire-and-forget notification.
    Event {
        /// Event name.
        method: String,
        /// Event fields.
        #[serde(default)]
        arguments: Map<String, Value>,
    },

    /// Notification awaiting a reply.
    Invoke {
        /// Correlation ID.
        id: RequestId,
        /// Event name.
        method: String,
        /// Event fields.
        #[serde(default)]
        arguments: Map<String, Value>,
    },

    /// Answer to an `invoke`.
    Reply {
        /// Matches the invoke `id`.
        id: RequestId,
        /// Outcome.
        result: MethodResult,
    },
}

impl Frame {
    /// Creates a command frame.
    #[must_use]
    pub fn command(id: RequestId, call: MethodCall) -> Self {
        Self::Command {
            id,
            method: call.method,
            arguments: call.arguments,
        }
    }

    /// Creates an event frame.
    #[must_use]
    pub fn event(event: Event) -> Self {
        Self::Event {
            method: event.name,
            arguments: event.fields,
        }
    }

    /// Creates an invoke frame.
    #[must_use]
    pub fn invoke(id: RequestId, event: Event) -> Self {
        Self::Invoke {
            id,
            method: event.name,
            arguments: event.fields,
        }
    }

    /// Returns the frame type tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Response { .. } => "response",
            Self::Event { .. } => "event",
            Self::Invoke { .. } => "invoke",
            Self::Reply { .. } => "reply",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
