//! WebSocket transport layer.
//!
//! Carries [`Frame`](crate::protocol::Frame)s between the bridge and the
//! controller that drives it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Bridge (Rust)  │                              │  Controller     │
//! │                 │         WebSocket            │                 │
//! │  PendingServer  │◄────────────────────────────►│  Controller     │
//! │  → Connection   │      localhost:PORT          │  + EventListener│
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! The bridge only talks to its side through [`EventChannel`] (outbound) and
//! an [`InboundReceiver`] (commands and replies). Anything implementing those
//! can stand in for a WebSocket, such as an in-process channel.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Bridge-side WebSocket connection |
//! | `controller` | Controller-side client |
//! | `server` | WebSocket server binding and acceptance |

// ============================================================================
// Submodules
// ============================================================================

/// Bridge-side WebSocket connection.
pub mod connection;

/// Controller-side client.
pub mod controller;

/// WebSocket server for controller connections.
pub mod server;

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;

use crate::error::Result;
use crate::identifiers::RequestId;
use crate::protocol::{Event, MethodCall, MethodResult};

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use controller::{Controller, EventListener};
pub use server::{DEFAULT_ACCEPT_TIMEOUT, PendingServer};

// ============================================================================
// EventChannel
// ============================================================================

/// Outbound half of the bridge's link to its controller.
///
/// Every method only queues; none of them wait on the controller.
pub trait EventChannel: Send + Sync + 'static {
    /// Sends a fire-and-forget event.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the
    /// link is gone.
    fn emit(&self, event: Event) -> Result<()>;

    /// Sends an event that expects a reply.
    ///
    /// The reply arrives later as [`Inbound::Reply`] with the returned ID.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the
    /// link is gone.
    fn invoke(&self, event: Event) -> Result<RequestId>;

    /// Answers a command.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the
    /// link is gone.
    fn respond(&self, id: RequestId, result: MethodResult) -> Result<()>;
}

// ============================================================================
// Inbound
// ============================================================================

/// A frame from the controller that the bridge must act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A command to dispatch.
    Command {
        /// Correlation ID for the response.
        id: RequestId,
        /// The command.
        call: MethodCall,
    },

    /// The controller's answer to an invoke.
    Reply {
        /// The invoke's ID.
        id: RequestId,
        /// The answer.
        result: MethodResult,
    },
}

/// Receiving half for [`Inbound`] frames.
pub type InboundReceiver = mpsc::UnboundedReceiver<Inbound>;

/// Sending half for [`Inbound`] frames.
pub type InboundSender = mpsc::UnboundedSender<Inbound>;
