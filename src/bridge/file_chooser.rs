//! File selection coordinator.
//!
//! At most one file selection is outstanding per bridge. A new request first
//! resolves the previous one with an empty list. Each request gets a fresh
//! [`SelectionToken`]; results carrying any other token are discarded.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::engine::HostPlatform;

use super::LoopMessage;

// ============================================================================
// Types
// ============================================================================

/// Engine callback that receives the selected URIs exactly once.
pub type FileChooserReply = Box<dyn FnOnce(Vec<String>) + Send>;

// ============================================================================
// FileSelectionRequest
// ============================================================================

/// What the page asked the file picker for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSelectionRequest {
    /// Accepted MIME types or extensions. Empty accepts anything.
    #[serde(default)]
    pub accept_types: Vec<String>,
    /// Whether several files may be picked.
    #[serde(default)]
    pub multiple: bool,
}

impl FileSelectionRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(accept_types: Vec<String>, multiple: bool) -> Self {
        Self {
            accept_types,
            multiple,
        }
    }
}

// ============================================================================
// SelectionToken
// ============================================================================

/// Identifies one file selection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionToken(u64);

impl SelectionToken {
    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SelectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// FileSelectionHandle
// ============================================================================

/// Completion handle given to the host's file picker.
///
/// Dropping it without calling [`complete`](Self::complete) counts as an
/// empty selection.
pub struct FileSelectionHandle {
    token: SelectionToken,
    tx: Option<mpsc::UnboundedSender<LoopMessage>>,
}

impl FileSelectionHandle {
    /// Returns the request token.
    #[inline]
    #[must_use]
    pub fn token(&self) -> SelectionToken {
        self.token
    }

    /// Delivers the selected URIs.
    pub fn complete(mut self, uris: Vec<String>) {
        self.send(uris);
    }

    fn send(&mut self, uris: Vec<String>) {
        if let Some(tx) = self.tx.take() {
            let token = self.token;
            if tx.send(LoopMessage::FileSelected { token, uris }).is_err() {
                trace!(%token, "File selection after bridge stopped");
            }
        }
    }
}

impl Drop for FileSelectionHandle {
    fn drop(&mut self) {
        self.send(Vec::new());
    }
}

impl fmt::Debug for FileSelectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSelectionHandle")
            .field("token", &self.token)
            .field("completed", &self.tx.is_none())
            .finish()
    }
}

// ============================================================================
// FileSelectionCoordinator
// ============================================================================

/// Single-slot file selection state for one bridge.
pub struct FileSelectionCoordinator {
    current: Option<(SelectionToken, FileChooserReply)>,
    next_token: u64,
    tx: mpsc::UnboundedSender<LoopMessage>,
}

impl FileSelectionCoordinator {
    pub(crate) fn new(tx: mpsc::UnboundedSender<LoopMessage>) -> Self {
        Self {
            current: None,
            next_token: 1,
            tx,
        }
    }

    /// Starts a selection, superseding any outstanding one.
    ///
    /// Returns the new token, or `None` if the host could not launch its
    /// picker (the reply has then already received an empty list).
    pub fn request(
        &mut self,
        host: &mut dyn HostPlatform,
        request: FileSelectionRequest,
        reply: FileChooserReply,
    ) -> Option<SelectionToken> {
        if let Some((previous, stale_reply)) = self.current.take() {
            debug!(token = %previous, "Superseding outstanding file selection");
            stale_reply(Vec::new());
        }

        let token = SelectionToken(self.next_token);
        self.next_token += 1;

        let handle = FileSelectionHandle {
            token,
            tx: Some(self.tx.clone()),
        };

        match host.launch_file_picker(&request, handle) {
            Ok(()) => {
                debug!(
                    %token,
                    multiple = request.multiple,
                    accept = ?request.accept_types,
                    "File picker launched"
                );
                self.current = Some((token, reply));
                Some(token)
            }
            Err(e) => {
                warn!(error = %e, "File picker failed to launch");
                reply(Vec::new());
                None
            }
        }
    }

    /// Delivers a result. Returns `false` if `token` is stale.
    pub fn resolve(&mut self, token: SelectionToken, uris: Vec<String>) -> bool {
        match self.current.take() {
            Some((current, reply)) if current == token => {
                debug!(%token, count = uris.len(), "File selection resolved");
                reply(uris);
                true
            }
            other => {
                self.current = other;
                trace!(%token, "Discarding stale file selection");
                false
            }
        }
    }

    /// Returns `true` if a selection is outstanding.
    #[inline]
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }

    /// Resolves any outstanding selection with an empty list.
    pub fn cancel(&mut self) {
        if let Some((token, reply)) = self.current.take() {
            debug!(%token, "Cancelling outstanding file selection");
            reply(Vec::new());
        }
    }
}

impl fmt::Debug for FileSelectionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSelectionCoordinator")
            .field("current", &self.current.as_ref().map(|(token, _)| *token))
            .field("next_token", &self.next_token)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
