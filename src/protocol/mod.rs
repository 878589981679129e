//! Bridge protocol message types.
//!
//! This module defines the messages exchanged between the bridge and its
//! remote controller, independent of any engine.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`MethodCall`] | Controller → Bridge | Command request |
//! | [`MethodResult`] | Bridge → Controller | Command result |
//! | [`Event`] | Bridge → Controller | Engine notification |
//! | `reply` | Controller → Bridge | Navigation decision |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions and argument validation |
//! | `event` | Event types |
//! | `frame` | Wire frames and result encoding |
//! | `settings` | Settings batches |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions and argument validation.
pub mod command;

/// Event message types.
pub mod event;

/// Wire frames.
pub mod frame;

/// WebView settings batches.
pub mod settings;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Arguments, BridgeCommand, Headers, MethodCall, methods};
pub use event::{BridgeEvent, ConsoleLevel, Event, names};
pub use frame::{Frame, MethodResult};
pub use settings::{JsMode, SettingChange, SettingsUpdate};
