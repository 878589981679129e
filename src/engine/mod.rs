//! Render engine and host platform seams.
//!
//! The bridge never renders anything itself. It drives a [`RenderEngine`]
//! and hands OS-level flows (dialer, mail composer, file picker) to a
//! [`HostPlatform`]. Both are owned by the bridge loop and only ever called
//! from it.
//!
//! Engine callbacks flow the other way through the [`EngineHooks`] given to
//! [`RenderEngine::attach`]:
//!
//! - [`NavigationGate`] answers the engine's synchronous "may this navigation
//!   proceed?" question without blocking.
//! - [`EngineEvents`] forwards everything else into the bridge loop.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `assets` | `loadFile` path resolution |
//! | `events` | Engine callback sink |

// ============================================================================
// Submodules
// ============================================================================

/// Local file and bundled asset resolution.
pub mod assets;

/// Engine callback sink.
pub mod events;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::bridge::{
    ChannelPoster, ExternalIntent, FileSelectionHandle, FileSelectionRequest, NavigationGate,
    ScriptResponder,
};
use crate::error::{Error, Result};
use crate::identifiers::FrameId;
use crate::protocol::Headers;

// ============================================================================
// Re-exports
// ============================================================================

pub use assets::AssetResolver;
pub use events::{EngineCallback, EngineEvents, HttpFailure, LoadFailure};

// ============================================================================
// EngineCapabilities
// ============================================================================

/// What the engine can report about navigations and errors.
///
/// Probed once when the bridge is built; the bridge picks its navigation
/// strategy and error scoping from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Navigation attempts carry their frame scope.
    pub navigation_frame_scope: bool,
    /// Navigation attempts carry request headers.
    pub navigation_headers: bool,
    /// Load errors carry their frame scope.
    pub error_frame_scope: bool,
    /// The engine reports HTTP error statuses.
    pub http_error_reporting: bool,
}

impl EngineCapabilities {
    /// An engine that reports everything.
    #[inline]
    #[must_use]
    pub const fn full() -> Self {
        Self {
            navigation_frame_scope: true,
            navigation_headers: true,
            error_frame_scope: true,
            http_error_reporting: true,
        }
    }

    /// An engine that reports nothing beyond the URL.
    #[inline]
    #[must_use]
    pub const fn legacy() -> Self {
        Self {
            navigation_frame_scope: false,
            navigation_headers: false,
            error_frame_scope: false,
            http_error_reporting: false,
        }
    }

    /// Returns `true` if navigation attempts can be scoped to a frame.
    #[inline]
    #[must_use]
    pub const fn supports_scoped_navigation(&self) -> bool {
        self.navigation_frame_scope
    }
}

impl Default for EngineCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

// ============================================================================
// Navigation Types
// ============================================================================

/// Frame a navigation or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameScope {
    /// Top-level document.
    Main,
    /// A nested frame.
    Subframe(FrameId),
    /// The engine could not tell.
    Unknown,
}

impl FrameScope {
    /// Returns the frame ID, treating unknown scope as the main frame.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> FrameId {
        match self {
            Self::Subframe(id) => *id,
            Self::Main | Self::Unknown => FrameId::main(),
        }
    }
}

/// A navigation the engine is about to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationAttempt {
    /// Target URL.
    pub url: String,
    /// Target frame.
    pub scope: FrameScope,
    /// Request headers, if the engine exposes them.
    pub headers: Option<Headers>,
}

impl NavigationAttempt {
    /// Creates a main-frame attempt without headers.
    #[must_use]
    pub fn main_frame(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scope: FrameScope::Main,
            headers: None,
        }
    }

    /// Creates a subframe attempt.
    #[must_use]
    pub fn subframe(url: impl Into<String>, frame: FrameId) -> Self {
        Self {
            url: url.into(),
            scope: FrameScope::Subframe(frame),
            headers: None,
        }
    }

    /// Creates an attempt whose frame is unknown.
    #[must_use]
    pub fn unscoped(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scope: FrameScope::Unknown,
            headers: None,
        }
    }

    /// Attaches request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// The gate's immediate answer to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationVerdict {
    /// Let the engine navigate.
    Proceed,
    /// Stop the engine from navigating.
    Cancel,
}

impl NavigationVerdict {
    /// Returns `true` for [`NavigationVerdict::Cancel`].
    #[inline]
    #[must_use]
    pub fn is_cancel(self) -> bool {
        matches!(self, Self::Cancel)
    }
}

// ============================================================================
// EngineHooks
// ============================================================================

/// Callbacks handed to the engine on attach.
#[derive(Clone)]
pub struct EngineHooks {
    /// Navigation decision hook.
    pub gate: NavigationGate,
    /// Sink for every other engine callback.
    pub events: EngineEvents,
}

impl fmt::Debug for EngineHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHooks").finish_non_exhaustive()
    }
}

// ============================================================================
// CertificatePrompt
// ============================================================================

/// The engine's pending TLS error prompt.
///
/// The bridge always cancels it after reporting the error.
pub trait CertificatePrompt: Send {
    /// Aborts the load that raised the certificate error.
    fn cancel(self: Box<Self>);
}

// ============================================================================
// RenderEngine
// ============================================================================

/// A web rendering surface driven by the bridge.
///
/// Loads issued through this trait are programmatic and must not be routed
/// back through the [`NavigationGate`]; only page-initiated navigations are.
pub trait RenderEngine: Send + 'static {
    /// Reports what the engine can tell about navigations and errors.
    fn capabilities(&self) -> EngineCapabilities;

    /// Installs the bridge's callbacks. Called once, before any other call.
    fn attach(&mut self, hooks: EngineHooks);

    /// Loads a URL with extra request headers.
    fn load_url(&mut self, url: &str, headers: &Headers) -> Result<()>;

    /// Loads inline content.
    fn load_data(
        &mut self,
        data: &str,
        mime_type: &str,
        encoding: &str,
        base_url: Option<&str>,
    ) -> Result<()>;

    /// Returns `true` if there is back history.
    fn can_go_back(&self) -> bool;

    /// Returns `true` if there is forward history.
    fn can_go_forward(&self) -> bool;

    /// Navigates back one entry.
    fn go_back(&mut self) -> Result<()>;

    /// Navigates forward one entry.
    fn go_forward(&mut self) -> Result<()>;

    /// Reloads the current page.
    fn reload(&mut self) -> Result<()>;

    /// Returns the current URL.
    fn current_url(&self) -> Option<String>;

    /// Returns the current page title.
    fn title(&self) -> Option<String>;

    /// Starts evaluating a script.
    ///
    /// The engine resolves `responder` whenever the result is ready, from any
    /// thread. Dropping it unresolved reports an engine error.
    fn evaluate_script(&mut self, script: &str, responder: ScriptResponder);

    /// Enables or disables script execution.
    fn set_javascript_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Enables or disables debug instrumentation.
    fn set_debugging_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Sets the user agent; `None` restores the engine default.
    fn set_user_agent(&mut self, user_agent: Option<&str>) -> Result<()>;

    /// Enables or disables DOM storage.
    fn set_dom_storage_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Sets whether media playback needs a user gesture.
    fn set_media_playback_requires_user_gesture(&mut self, required: bool) -> Result<()>;

    /// Exposes a named channel object to page script.
    fn add_script_channel(&mut self, name: &str, poster: ChannelPoster) -> Result<()>;

    /// Removes a named channel object from page script.
    fn remove_script_channel(&mut self, name: &str) -> Result<()>;

    /// Clears the HTTP cache and web storage.
    fn clear_cache(&mut self) -> Result<()>;

    /// Releases engine resources. Called once when the bridge stops.
    fn dispose(&mut self) {}
}

// ============================================================================
// HostPlatform
// ============================================================================

/// OS-level flows the bridge delegates to the host application.
pub trait HostPlatform: Send + 'static {
    /// Hands a URL to an external application.
    ///
    /// # Errors
    ///
    /// [`Error::ExternalHandlerMissing`](crate::Error::ExternalHandlerMissing)
    /// when nothing can handle it.
    fn open_external(&mut self, intent: &ExternalIntent) -> Result<()>;

    /// Launches the file picker.
    ///
    /// The host completes `handle` when the user is done. Dropping it
    /// uncompleted counts as an empty selection.
    fn launch_file_picker(
        &mut self,
        request: &FileSelectionRequest,
        handle: FileSelectionHandle,
    ) -> Result<()>;
}

/// A host with no external handlers and no file picker.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

impl HostPlatform for NoopHost {
    fn open_external(&mut self, intent: &ExternalIntent) -> Result<()> {
        Err(Error::external_handler_missing(intent.url()))
    }

    fn launch_file_picker(
        &mut self,
        _request: &FileSelectionRequest,
        _handle: FileSelectionHandle,
    ) -> Result<()> {
        Err(Error::engine("no file picker available"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_presets() {
        assert!(EngineCapabilities::full().supports_scoped_navigation());
        assert!(!EngineCapabilities::legacy().supports_scoped_navigation());
        assert_eq!(EngineCapabilities::default(), EngineCapabilities::full());
    }

    #[test]
    fn test_frame_scope_ids() {
        assert!(FrameScope::Main.frame_id().is_main());
        assert!(FrameScope::Unknown.frame_id().is_main());
        assert_eq!(FrameScope::Subframe(FrameId::new(4)).frame_id(), FrameId::new(4));
    }

    #[test]
    fn test_attempt_with_headers() {
        let mut headers = Headers::new();
        headers.insert("Referer".into(), "https://a.example".into());
        let attempt = NavigationAttempt::main_frame("https://b.example").with_headers(headers);
        assert_eq!(attempt.scope, FrameScope::Main);
        assert_eq!(attempt.headers.map(|h| h.len()), Some(1));
    }
}
