//! Engine callback sink.
//!
//! Engines may call back from any thread. [`EngineEvents`] turns every
//! callback into a message for the bridge loop, so engine threads never
//! touch bridge state directly.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::mpsc;
use tracing::trace;

use crate::bridge::LoopMessage;
use crate::bridge::file_chooser::{FileChooserReply, FileSelectionRequest};
use crate::protocol::ConsoleLevel;

use super::{CertificatePrompt, FrameScope};

// ============================================================================
// Failure Types
// ============================================================================

/// A failed resource load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    /// Failing URL.
    pub url: String,
    /// Engine error code.
    pub code: i32,
    /// Engine description.
    pub description: String,
    /// Frame the load belonged to.
    pub scope: FrameScope,
}

/// An HTTP error status received for a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    /// Failing URL.
    pub url: String,
    /// HTTP status code.
    pub status_code: u16,
    /// Reason phrase.
    pub reason: String,
    /// Frame the load belonged to.
    pub scope: FrameScope,
}

// ============================================================================
// EngineCallback
// ============================================================================

/// A raw engine callback, before normalization.
pub enum EngineCallback {
    /// Load progress, possibly out of range.
    ProgressChanged {
        /// Raw progress value.
        progress: i32,
    },

    /// Console output.
    ConsoleMessage {
        /// Script source URL.
        source_url: String,
        /// Line number.
        line_number: u32,
        /// Message text.
        message: String,
        /// Severity.
        level: ConsoleLevel,
    },

    /// Page finished loading.
    PageFinished {
        /// Page URL.
        url: String,
    },

    /// A load failed.
    LoadError(LoadFailure),

    /// An HTTP error status was received.
    HttpError(HttpFailure),

    /// A TLS certificate error is awaiting a decision.
    TlsError {
        /// Failing URL.
        url: String,
        /// Primary certificate error code.
        primary_error: i32,
        /// Prompt to cancel once reported.
        prompt: Box<dyn CertificatePrompt>,
    },

    /// The page title changed.
    TitleReceived {
        /// New title.
        title: String,
    },
}

impl EngineCallback {
    /// Returns a short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProgressChanged { .. } => "progress",
            Self::ConsoleMessage { .. } => "console",
            Self::PageFinished { .. } => "page_finished",
            Self::LoadError(_) => "load_error",
            Self::HttpError(_) => "http_error",
            Self::TlsError { .. } => "tls_error",
            Self::TitleReceived { .. } => "title",
        }
    }
}

impl fmt::Debug for EngineCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EngineCallback").field(&self.kind()).finish()
    }
}

// ============================================================================
// EngineEvents
// ============================================================================

/// Sink for engine callbacks.
///
/// Cheap to clone; every method is non-blocking. Callbacks arriving after the
/// bridge stopped are dropped.
#[derive(Clone)]
pub struct EngineEvents {
    tx: mpsc::UnboundedSender<LoopMessage>,
}

impl EngineEvents {
    pub(crate) fn new(tx: mpsc::UnboundedSender<LoopMessage>) -> Self {
        Self { tx }
    }

    fn send(&self, callback: EngineCallback) {
        let kind = callback.kind();
        if self.tx.send(LoopMessage::Engine(callback)).is_err() {
            trace!(kind, "Engine callback after bridge stopped");
        }
    }

    /// Reports load progress.
    pub fn progress_changed(&self, progress: i32) {
        self.send(EngineCallback::ProgressChanged { progress });
    }

    /// Reports console output.
    pub fn console_message(
        &self,
        source_url: impl Into<String>,
        line_number: u32,
        message: impl Into<String>,
        level: ConsoleLevel,
    ) {
        self.send(EngineCallback::ConsoleMessage {
            source_url: source_url.into(),
            line_number,
            message: message.into(),
            level,
        });
    }

    /// Reports a finished page load.
    pub fn page_finished(&self, url: impl Into<String>) {
        self.send(EngineCallback::PageFinished { url: url.into() });
    }

    /// Reports a failed load.
    pub fn load_error(&self, failure: LoadFailure) {
        self.send(EngineCallback::LoadError(failure));
    }

    /// Reports an HTTP error status.
    pub fn http_error(&self, failure: HttpFailure) {
        self.send(EngineCallback::HttpError(failure));
    }

    /// Reports a TLS certificate error.
    ///
    /// The bridge cancels `prompt` once the error has been reported. If the
    /// bridge already stopped, the prompt is cancelled here.
    pub fn tls_error(
        &self,
        url: impl Into<String>,
        primary_error: i32,
        prompt: Box<dyn CertificatePrompt>,
    ) {
        let message = LoopMessage::Engine(EngineCallback::TlsError {
            url: url.into(),
            primary_error,
            prompt,
        });
        if let Err(mpsc::error::SendError(LoopMessage::Engine(EngineCallback::TlsError {
            prompt,
            ..
        }))) = self.tx.send(message)
        {
            prompt.cancel();
        }
    }

    /// Reports a page title.
    pub fn title_received(&self, title: impl Into<String>) {
        self.send(EngineCallback::TitleReceived {
            title: title.into(),
        });
    }

    /// Asks the bridge to run the file picker.
    ///
    /// `reply` receives the selected URIs exactly once; an empty list when
    /// the selection is abandoned.
    pub fn show_file_chooser(&self, request: FileSelectionRequest, reply: FileChooserReply) {
        if let Err(mpsc::error::SendError(LoopMessage::FileChooser { reply, .. })) =
            self.tx.send(LoopMessage::FileChooser { request, reply })
        {
            reply(Vec::new());
        }
    }
}

impl fmt::Debug for EngineEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineEvents")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
