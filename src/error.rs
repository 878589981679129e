//! Error types for the WebView bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webview_bridge::{Error, Result};
//!
//! fn require_url(call: &MethodCall) -> Result<String> {
//!     call.arguments().required_str("url").map(str::to_owned)
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Command | [`Error::InvalidArgument`], [`Error::Unimplemented`] |
//! | Engine | [`Error::Engine`], [`Error::ExternalHandlerMissing`] |
//! | Protocol | [`Error::ProtocolViolation`] (fatal) |
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Remote | [`Error::RequestTimeout`], [`Error::Remote`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Codes
// ============================================================================

/// Wire code for [`Error::InvalidArgument`].
pub const CODE_INVALID_ARGUMENT: &str = "invalid_argument";

/// Wire code for [`Error::Unimplemented`].
pub const CODE_UNIMPLEMENTED: &str = "unimplemented";

/// Wire code for [`Error::Engine`].
pub const CODE_ENGINE_ERROR: &str = "engine_error";

/// Wire code for [`Error::ProtocolViolation`].
pub const CODE_PROTOCOL_VIOLATION: &str = "protocol_violation";

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Command Errors
    // ========================================================================
    /// Malformed or missing command argument.
    ///
    /// Recovered locally and reported to the caller of the command.
    #[error("Invalid argument `{field}`: {message}")]
    InvalidArgument {
        /// Name of the offending field.
        field: String,
        /// Description of what was wrong with it.
        message: String,
    },

    /// Unknown command method.
    ///
    /// Reported to the caller; never touches engine state.
    #[error("Unimplemented command: {command}")]
    Unimplemented {
        /// The unrecognized command method.
        command: String,
    },

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// An engine primitive reported a failure.
    #[error("Engine error: {message}")]
    Engine {
        /// Engine-provided detail.
        message: String,
    },

    /// No host handler exists for an intercepted URI scheme.
    ///
    /// Logged and swallowed by the navigation interceptor.
    #[error("No external handler for: {url}")]
    ExternalHandlerMissing {
        /// URL that could not be handed off.
        url: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The controller broke the navigation decision contract.
    ///
    /// Fatal: the bridge terminates rather than risk applying a stale or
    /// duplicated decision.
    #[error("Protocol violation: {message}")]
    ProtocolViolation {
        /// Description of the violation.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid bridge configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Timed out waiting for the peer to connect.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection or bridge loop closed.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// A controller-side command call timed out.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The bridge answered a command with an error code this crate does not map.
    #[error("Remote error ({code}): {message}")]
    Remote {
        /// Wire error code.
        code: String,
        /// Error message.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid argument error for a missing field.
    #[inline]
    pub fn missing_argument(field: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: "missing required argument".to_string(),
        }
    }

    /// Creates an unimplemented command error.
    #[inline]
    pub fn unimplemented(command: impl Into<String>) -> Self {
        Self::Unimplemented {
            command: command.into(),
        }
    }

    /// Creates an engine error.
    #[inline]
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Creates an external handler missing error.
    #[inline]
    pub fn external_handler_missing(url: impl Into<String>) -> Self {
        Self::ExternalHandlerMissing { url: url.into() }
    }

    /// Creates a protocol violation error.
    #[inline]
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Accessors
// ============================================================================

impl Error {
    /// Returns the stable wire code for this error.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidArgument { .. } => CODE_INVALID_ARGUMENT,
            Self::Unimplemented { .. } => CODE_UNIMPLEMENTED,
            Self::Engine { .. } => CODE_ENGINE_ERROR,
            Self::ProtocolViolation { .. } => CODE_PROTOCOL_VIOLATION,
            Self::ExternalHandlerMissing { .. } => "external_handler_missing",
            Self::Config { .. } => "config_error",
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_) => {
                "connection_error"
            }
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. } => "timeout",
            Self::Remote { code, .. } => code.as_str(),
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::ChannelClosed(_) => "channel_closed",
        }
    }

    /// Returns the offending field for [`Error::InvalidArgument`].
    #[inline]
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidArgument { field, .. } => Some(field),
            _ => None,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error must terminate the bridge.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the caller may reasonably repeat the operation.
    ///
    /// Nothing in the bridge retries on its own.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. }
                | Self::Engine { .. }
                | Self::ConnectionTimeout { .. }
                | Self::RequestTimeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
