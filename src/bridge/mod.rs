//! The bridge between a rendering engine and its controller.
//!
//! # Architecture
//!
//! ```text
//!                ┌──────────────────── bridge loop ───────────────────┐
//!  Controller    │                                                    │   RenderEngine
//!  ──command───► │ Dispatcher ───────────────────────────────────────►│──► load / settings
//!  ◄─response─── │                                                    │
//!  ◄─event────── │ EventNormalizer ◄── LoopMessage ◄── EngineEvents ◄─│─── callbacks
//!  ◄─invoke───── │ NavigationInterceptor ◄── NavigationGate ◄─────────│─── navigation
//!  ──reply─────► │   └─ allowed? re-issue ───────────────────────────►│
//!                │ ChannelRegistry / FileSelectionCoordinator         │
//!                └────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent bridge construction |
//! | `channels` | Named script channels |
//! | `core` | Bridge handle and loop |
//! | `dispatcher` | Command validation and execution |
//! | `file_chooser` | Single-slot file selection |
//! | `interceptor` | Navigation decisions |
//! | `normalizer` | Engine callback normalization |
//! | `options` | Creation parameters and configuration |
//! | `schemes` | External URL schemes |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent bridge construction.
pub mod builder;

/// Named script channels.
pub mod channels;

/// Bridge handle and loop.
pub mod core;

/// Command validation and execution.
pub mod dispatcher;

/// Single-slot file selection.
pub mod file_chooser;

/// Navigation decisions.
pub mod interceptor;

/// Engine callback normalization.
pub mod normalizer;

/// Creation parameters and configuration.
pub mod options;

/// External URL schemes.
pub mod schemes;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BridgeBuilder;
pub use channels::{ChannelPoster, ChannelRegistry};
pub use core::Bridge;
pub use dispatcher::{Dispatched, Dispatcher, ScriptResponder};
pub use file_chooser::{
    FileChooserReply, FileSelectionCoordinator, FileSelectionHandle, FileSelectionRequest,
    SelectionToken,
};
pub use interceptor::{
    Governance, LegacyStrategy, NavigationGate, NavigationInterceptor, NavigationRequest,
    NavigationStrategy, ScopedStrategy,
};
pub use normalizer::{ErrorScope, EventNormalizer, TlsErrorKind};
pub use options::{
    AutoMediaPlaybackPolicy, BridgeOptions, CreationParams, InitialData, InitialLoad,
};
pub use schemes::ExternalIntent;

pub(crate) use core::LoopMessage;
