//! Event normalizer.
//!
//! Turns raw [`EngineCallback`]s into [`BridgeEvent`]s: one event per
//! callback at most, subframe errors dropped, TLS errors classified and their
//! prompts cancelled.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, warn};

use crate::engine::{EngineCallback, EngineCapabilities, FrameScope, HttpFailure, LoadFailure};
use crate::identifiers::ViewId;
use crate::protocol::BridgeEvent;

// ============================================================================
// Constants
// ============================================================================

/// Status reported for error pages detected from their title.
const TITLE_ERROR_STATUS: u16 = 400;

/// Title fragments that mark an error page.
const TITLE_ERROR_MARKERS: &[&str] = &["404", "500", "Error"];

// ============================================================================
// TlsErrorKind
// ============================================================================

/// Classification of a TLS certificate error by its primary error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsErrorKind {
    /// Code 0.
    NotYetValid,
    /// Code 1.
    Expired,
    /// Code 2.
    HostnameMismatch,
    /// Code 3.
    Untrusted,
    /// Code 4.
    InvalidDate,
    /// Any other code.
    Generic,
}

impl TlsErrorKind {
    /// Classifies a primary error code.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NotYetValid,
            1 => Self::Expired,
            2 => Self::HostnameMismatch,
            3 => Self::Untrusted,
            4 => Self::InvalidDate,
            _ => Self::Generic,
        }
    }

    /// Returns the human-readable reason.
    #[must_use]
    pub fn reason(self) -> &'static str {
        match self {
            Self::NotYetValid => "The certificate is not yet valid",
            Self::Expired => "The certificate has expired",
            Self::HostnameMismatch => "Hostname mismatch",
            Self::Untrusted => "The certificate authority is not trusted",
            Self::InvalidDate => "The date of the certificate is invalid",
            Self::Generic => "A generic error occurred",
        }
    }

    /// Returns the `onLoadError` message.
    #[must_use]
    pub fn message(self) -> String {
        format!("SslError: {}", self.reason())
    }
}

// ============================================================================
// ErrorScope
// ============================================================================

/// How error callbacks are attributed to frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// The engine reports frame scope; subframe errors are dropped.
    Reported,
    /// The engine cannot tell; every error is treated as main-frame.
    AssumeMainFrame,
}

// ============================================================================
// EventNormalizer
// ============================================================================

/// Stateful callback-to-event translator for one bridge.
#[derive(Debug)]
pub struct EventNormalizer {
    view_id: ViewId,
    error_scope: ErrorScope,
    http_errors_reported: bool,
    warned_scope: bool,
}

impl EventNormalizer {
    /// Creates a normalizer matching the engine's capabilities.
    #[must_use]
    pub fn new(view_id: ViewId, capabilities: EngineCapabilities) -> Self {
        let error_scope = if capabilities.error_frame_scope {
            ErrorScope::Reported
        } else {
            ErrorScope::AssumeMainFrame
        };
        Self {
            view_id,
            error_scope,
            http_errors_reported: capabilities.http_error_reporting,
            warned_scope: false,
        }
    }

    /// Returns the error scoping mode.
    #[inline]
    #[must_use]
    pub fn error_scope(&self) -> ErrorScope {
        self.error_scope
    }

    /// Normalizes one callback.
    ///
    /// `current_url` is consulted only for title-based error detection.
    pub fn normalize(
        &mut self,
        callback: EngineCallback,
        current_url: impl FnOnce() -> Option<String>,
    ) -> Option<BridgeEvent> {
        match callback {
            EngineCallback::ProgressChanged { progress } => Some(BridgeEvent::ProgressChanged {
                progress: progress.clamp(0, 100) as u8,
            }),

            EngineCallback::ConsoleMessage {
                source_url,
                line_number,
                message,
                level,
            } => Some(BridgeEvent::ConsoleMessage {
                source_url,
                line_number,
                message,
                level,
            }),

            EngineCallback::PageFinished { url } => Some(BridgeEvent::PageFinished { url }),

            EngineCallback::LoadError(LoadFailure {
                url,
                code,
                description,
                scope,
            }) => self.is_main_frame(scope).then_some(BridgeEvent::LoadError {
                url,
                code,
                message: description,
            }),

            EngineCallback::HttpError(HttpFailure {
                url,
                status_code,
                reason,
                scope,
            }) => self.is_main_frame(scope).then_some(BridgeEvent::HttpError {
                url,
                status_code,
                message: reason,
            }),

            EngineCallback::TlsError {
                url,
                primary_error,
                prompt,
            } => {
                let kind = TlsErrorKind::from_code(primary_error);
                warn!(
                    view_id = %self.view_id,
                    url = %url,
                    code = primary_error,
                    reason = kind.reason(),
                    "TLS error, cancelling load"
                );
                prompt.cancel();
                Some(BridgeEvent::LoadError {
                    url,
                    code: primary_error,
                    message: kind.message(),
                })
            }

            EngineCallback::TitleReceived { title } => self.title_error(&title, current_url),
        }
    }

    fn is_main_frame(&mut self, scope: FrameScope) -> bool {
        match self.error_scope {
            ErrorScope::AssumeMainFrame => {
                if !self.warned_scope {
                    self.warned_scope = true;
                    warn!(
                        view_id = %self.view_id,
                        "Engine does not report error frame scope; treating all errors as main-frame"
                    );
                }
                true
            }
            ErrorScope::Reported => match scope {
                FrameScope::Main | FrameScope::Unknown => true,
                FrameScope::Subframe(frame) => {
                    debug!(view_id = %self.view_id, %frame, "Dropping subframe error");
                    false
                }
            },
        }
    }

    fn title_error(
        &self,
        title: &str,
        current_url: impl FnOnce() -> Option<String>,
    ) -> Option<BridgeEvent> {
        if self.http_errors_reported {
            return None;
        }
        if !TITLE_ERROR_MARKERS.iter().any(|marker| title.contains(marker)) {
            return None;
        }

        let url = current_url().unwrap_or_else(|| "Unknown url".to_string());
        debug!(view_id = %self.view_id, title, url = %url, "Title indicates an error page");
        Some(BridgeEvent::HttpError {
            url,
            status_code: TITLE_ERROR_STATUS,
            message: "Page title indicates an error".to_string(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
