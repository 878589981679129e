//! Listening side of the controller link.
//!
//! A bridge serves exactly one controller. The host binds a [`PendingServer`],
//! publishes [`ws_url`](PendingServer::ws_url) to the controller process, then
//! waits in [`accept`](PendingServer::accept) for the upgrade.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::{Connection, InboundReceiver};

// ============================================================================
// Constants
// ============================================================================

/// How long [`PendingServer::accept`] waits by default.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// PendingServer
// ============================================================================

/// A bound listener still waiting for its controller.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use webview_bridge::transport::PendingServer;
///
/// let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// controller_process.send(server.ws_url());
/// let (connection, inbound) = server.accept().await?;
/// ```
pub struct PendingServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    accept_timeout: Duration,
}

impl PendingServer {
    /// Binds to `ip:port`. Port 0 picks a free port.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the address cannot be bound.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "Controller listener bound");

        Ok(Self {
            listener,
            local_addr,
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
        })
    }

    /// Replaces the accept deadline.
    #[must_use]
    pub fn with_accept_timeout(mut self, accept_timeout: Duration) -> Self {
        self.accept_timeout = accept_timeout;
        self
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the URL the controller should connect to.
    ///
    /// An unspecified bind address (`0.0.0.0`, `::`) is published as loopback.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let ip = match self.local_addr.ip() {
            IpAddr::V4(v4) if v4.is_unspecified() => IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            IpAddr::V6(v6) if v6.is_unspecified() => IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        format!("ws://{}", SocketAddr::new(ip, self.port()))
    }

    /// Waits for the controller and upgrades its socket.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if nobody connects before the deadline
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    pub async fn accept(self) -> Result<(Connection, InboundReceiver)> {
        let waited = self.accept_timeout;
        let (stream, peer) = timeout(waited, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(waited.as_millis() as u64))??;

        debug!(%peer, "Controller socket accepted");

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade from {peer} failed: {e}")))?;

        info!(%peer, local_addr = %self.local_addr, "Controller connected");

        Ok(Connection::new(ws_stream))
    }
}

// ============================================================================
// Tests
// ============================================================================
