//! Builder pattern for bridge configuration.
//!
//! Provides a fluent API for configuring and starting [`Bridge`] instances.
//!
//! # Example
//!
//! ```ignore
//! use std::net::{IpAddr, Ipv4Addr};
//! use webview_bridge::Bridge;
//! use webview_bridge::transport::PendingServer;
//!
//! let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
//! let (connection, inbound) = server.accept().await?;
//!
//! let bridge = Bridge::builder()
//!     .engine(my_engine)
//!     .host(my_host)
//!     .connection(connection, inbound)
//!     .asset_root("./assets")
//!     .build()?;
//!
//! bridge.join().await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{HostPlatform, NoopHost, RenderEngine};
use crate::error::{Error, Result};
use crate::identifiers::ViewId;
use crate::transport::{Connection, EventChannel, InboundReceiver};

use super::core::Bridge;
use super::options::{BridgeOptions, CreationParams};

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`Bridge`].
///
/// Use [`Bridge::builder()`] to create a new builder.
#[derive(Default)]
pub struct BridgeBuilder {
    /// Bridge configuration.
    options: BridgeOptions,
    /// Rendering engine.
    engine: Option<Box<dyn RenderEngine>>,
    /// Host platform; defaults to [`NoopHost`].
    host: Option<Box<dyn HostPlatform>>,
    /// Link to the controller.
    transport: Option<(Arc<dyn EventChannel>, InboundReceiver)>,
}

// ============================================================================
// BridgeBuilder Implementation
// ============================================================================

impl BridgeBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rendering engine.
    #[must_use]
    pub fn engine(mut self, engine: impl RenderEngine) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    /// Sets the host platform.
    #[must_use]
    pub fn host(mut self, host: impl HostPlatform) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    /// Uses an accepted WebSocket connection as the transport.
    #[must_use]
    pub fn connection(self, connection: Connection, inbound: InboundReceiver) -> Self {
        self.transport(Arc::new(connection), inbound)
    }

    /// Uses any [`EventChannel`] and inbound receiver as the transport.
    #[must_use]
    pub fn transport(mut self, channel: Arc<dyn EventChannel>, inbound: InboundReceiver) -> Self {
        self.transport = Some((channel, inbound));
        self
    }

    /// Sets the view ID.
    #[inline]
    #[must_use]
    pub fn view_id(mut self, view_id: ViewId) -> Self {
        self.options.view_id = view_id;
        self
    }

    /// Sets the root for relative `loadFile` paths.
    #[inline]
    #[must_use]
    pub fn asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.options.asset_root = Some(root.into());
        self
    }

    /// Sets a deadline for navigation decisions.
    #[inline]
    #[must_use]
    pub fn decision_timeout(mut self, timeout: Duration) -> Self {
        self.options.decision_timeout = Some(timeout);
        self
    }

    /// Sets the creation parameters.
    #[inline]
    #[must_use]
    pub fn creation_params(mut self, creation: CreationParams) -> Self {
        self.options.creation = creation;
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Validates the configuration, initializes the engine and starts the
    /// bridge loop.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the engine or transport is missing or the
    ///   options are invalid
    /// - [`Error::InvalidArgument`] if the initial file cannot be resolved
    /// - [`Error::Engine`] if the engine rejects initialization
    pub fn build(mut self) -> Result<Bridge> {
        let engine = self.validate_engine()?;
        let (channel, inbound) = self.validate_transport()?;
        let host = self.host.take().unwrap_or_else(|| Box::new(NoopHost));

        Bridge::spawn(self.options, engine, host, channel, inbound)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeBuilder {
    /// Validates the engine configuration.
    fn validate_engine(&mut self) -> Result<Box<dyn RenderEngine>> {
        self.engine.take().ok_or_else(|| {
            Error::config(
                "A rendering engine is required. Use .engine() to set it.\n\
                 Example: Bridge::builder().engine(my_engine)",
            )
        })
    }

    /// Validates the transport configuration.
    fn validate_transport(&mut self) -> Result<(Arc<dyn EventChannel>, InboundReceiver)> {
        self.transport.take().ok_or_else(|| {
            Error::config(
                "A transport is required. Use .connection() or .transport() to set it.\n\
                 Example: Bridge::builder().connection(connection, inbound)",
            )
        })
    }
}

impl fmt::Debug for BridgeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeBuilder")
            .field("options", &self.options)
            .field("engine", &self.engine.is_some())
            .field("host", &self.host.is_some())
            .field("transport", &self.transport.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
