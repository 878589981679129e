//! Webview Bridge - command/event bridge for embedded web views.
//!
//! This library connects a native rendering engine to a controller that
//! drives it over WebSocket.
//!
//! # Architecture
//!
//! The bridge follows a controller-engine model:
//!
//! - **Controller**: Sends commands, receives events and decides navigations
//! - **Engine**: Renders pages, reports callbacks, asks before navigating
//!
//! Key design principles:
//!
//! - Each [`Bridge`] owns: engine + host + one event loop task
//! - Commands are validated before the engine is touched
//! - Navigations are cancelled first and re-issued once the controller allows
//! - Engine callbacks are normalized into a small, stable event vocabulary
//!
//! # Quick Start
//!
//! ```ignore
//! use std::net::{IpAddr, Ipv4Addr};
//! use webview_bridge::{Bridge, Result};
//! use webview_bridge::transport::PendingServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
//!     println!("controller URL: {}", server.ws_url());
//!     let (connection, inbound) = server.accept().await?;
//!
//!     let bridge = Bridge::builder()
//!         .engine(MyEngine::new())
//!         .connection(connection, inbound)
//!         .build()?;
//!
//!     bridge.join().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Bridge handle, loop and its components |
//! | [`engine`] | Rendering engine and host seams |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Commands, events and wire frames |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Bridge handle, loop and components.
///
/// Use [`Bridge::builder()`] to start a bridge.
pub mod bridge;

/// Rendering engine and host platform seams.
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Commands, events and wire frames.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

/// In-memory engine, host and channel doubles.
#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{
    AutoMediaPlaybackPolicy, Bridge, BridgeBuilder, BridgeOptions, CreationParams,
    ExternalIntent, FileSelectionHandle, FileSelectionRequest, ScriptResponder,
};

// Engine types
pub use engine::{
    EngineCapabilities, EngineHooks, FrameScope, HostPlatform, NavigationAttempt,
    NavigationVerdict, NoopHost, RenderEngine,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{FrameId, RequestId, ViewId};

// Protocol types
pub use protocol::{BridgeCommand, BridgeEvent, Event, MethodCall, MethodResult};
