//! Bridge-side WebSocket connection.
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming `command` and `reply` frames, forwarded to the bridge loop
//! - Outgoing `response`, `event` and `invoke` frames
//!
//! When the socket closes, the inbound receiver ends and the bridge stops.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::{Value, from_str, from_value, to_string};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Event, Frame, MethodCall, MethodResult};

use super::{EventChannel, Inbound, InboundReceiver, InboundSender};

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a frame.
    Send(Frame),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket link from the bridge to its controller.
///
/// Cloning shares the same socket.
#[derive(Clone)]
pub struct Connection {
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl Connection {
    /// Wraps an established WebSocket.
    ///
    /// Spawns the event loop task and returns the receiver for inbound
    /// commands and replies.
    pub fn new<S>(ws_stream: WebSocketStream<S>) -> (Self, InboundReceiver)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::run_event_loop(ws_stream, command_rx, inbound_tx));

        (Self { command_tx }, inbound_rx)
    }

    /// Returns `true` once the event loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Closes the socket.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    fn send(&self, frame: Frame) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Send(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        inbound_tx: InboundSender,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from the controller
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(answer) = Self::handle_incoming_message(&text, &inbound_tx)
                                && !Self::write_frame(&mut ws_write, answer).await
                            {
                                break;
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by controller");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Outgoing frames from the bridge
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(frame)) => {
                            if !Self::write_frame(&mut ws_write, frame).await {
                                break;
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        debug!("Event loop terminated");
    }

    /// Writes one frame. Returns `false` when the socket is unusable.
    async fn write_frame<W>(ws_write: &mut W, frame: Frame) -> bool
    where
        W: Sink<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        let kind = frame.kind();
        let json = match to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, kind, "Failed to serialize frame");
                return true;
            }
        };
        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
            warn!(error = %e, kind, "Failed to send frame");
            return false;
        }
        trace!(kind, "Frame sent");
        true
    }

    /// Handles an incoming text message from the controller.
    ///
    /// Returns a frame to write straight back, for commands that could not
    /// be read.
    fn handle_incoming_message(text: &str, inbound_tx: &InboundSender) -> Option<Frame> {
        let frame = match from_str::<Frame>(text) {
            Ok(frame) => frame,
            Err(e) => return Self::handle_malformed(text, &e, inbound_tx),
        };

        let inbound = match frame {
            Frame::Command {
                id,
                method,
                arguments,
            } => Inbound::Command {
                id,
                call: MethodCall::new(method, arguments),
            },
            Frame::Reply { id, result } => Inbound::Reply { id, result },
            other => {
                warn!(kind = other.kind(), "Unexpected frame from controller");
                return None;
            }
        };

        Self::forward(inbound_tx, inbound);
        None
    }

    /// Salvages the `type` and `id` of a frame that failed to parse.
    ///
    /// A broken reply still reaches the bridge, carrying an error result so
    /// the decision it answers fails. A broken command is answered with
    /// `invalid_argument`. Anything without a readable id is dropped.
    fn handle_malformed(
        text: &str,
        parse_error: &serde_json::Error,
        inbound_tx: &InboundSender,
    ) -> Option<Frame> {
        let salvaged = from_str::<Value>(text).ok().and_then(|value| {
            let kind = value.get("type")?.as_str()?.to_owned();
            let id = from_value::<RequestId>(value.get("id")?.clone()).ok()?;
            Some((kind, id))
        });

        match salvaged {
            Some((kind, id)) if kind == "reply" => {
                warn!(request_id = %id, error = %parse_error, "Malformed reply from controller");
                let err = Error::protocol_violation(format!("malformed reply: {parse_error}"));
                Self::forward(
                    inbound_tx,
                    Inbound::Reply {
                        id,
                        result: MethodResult::from_error(&err),
                    },
                );
                None
            }
            Some((kind, id)) if kind == "command" => {
                debug!(request_id = %id, error = %parse_error, "Malformed command from controller");
                let err = Error::invalid_argument("method", parse_error.to_string());
                Some(Frame::Response {
                    id,
                    result: MethodResult::from_error(&err),
                })
            }
            _ => {
                warn!(error = %parse_error, text = %text, "Failed to parse incoming frame");
                None
            }
        }
    }

    fn forward(inbound_tx: &InboundSender, inbound: Inbound) {
        if inbound_tx.send(inbound).is_err() {
            trace!("Inbound frame after bridge stopped");
        }
    }
}

impl EventChannel for Connection {
    fn emit(&self, event: Event) -> Result<()> {
        self.send(Frame::event(event))
    }

    fn invoke(&self, event: Event) -> Result<RequestId> {
        let id = RequestId::generate();
        self.send(Frame::invoke(id, event))?;
        Ok(id)
    }

    fn respond(&self, id: RequestId, result: MethodResult) -> Result<()> {
        self.send(Frame::Response { id, result })
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
