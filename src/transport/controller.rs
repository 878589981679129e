//! Controller-side client.
//!
//! The controller sends commands to a bridge and receives its events. Invoke
//! frames (navigation requests) are answered through an [`EventListener`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use webview_bridge::transport::{Controller, EventListener};
//!
//! struct Policy;
//!
//! #[async_trait::async_trait]
//! impl EventListener for Policy {
//!     async fn on_navigation_request(&self, url: &str, _is_main_frame: bool) -> bool {
//!         !url.contains("blocked.example")
//!     }
//! }
//!
//! let controller = Controller::connect("ws://127.0.0.1:9000").await?;
//! controller.set_listener(Arc::new(Policy));
//! controller.call("loadUrl", serde_json::json!({ "url": "https://example.com" })).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, from_str, to_string};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{BridgeCommand, Event, Frame, MethodCall, MethodResult, names};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for command execution.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 100;

/// Timeout for the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Map of request IDs to response channels.
type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<MethodResult>>>;

/// Shared, replaceable listener.
type ListenerSlot = Arc<Mutex<Option<Arc<dyn EventListener>>>>;

// ============================================================================
// EventListener
// ============================================================================

/// Receives a bridge's events.
///
/// Callbacks run on a dedicated task, one at a time and in arrival order,
/// so they may freely call back into the [`Controller`].
#[async_trait]
pub trait EventListener: Send + Sync + 'static {
    /// Called for every fire-and-forget event.
    async fn on_event(&self, _event: Event) {}

    /// Decides a navigation the bridge intercepted.
    ///
    /// Returning `true` lets the bridge re-issue the load.
    async fn on_navigation_request(&self, _url: &str, _is_main_frame: bool) -> bool {
        true
    }
}

/// Work for the listener task.
enum Delivery {
    Event(Event),
    Invoke { id: RequestId, event: Event },
}

// ============================================================================
// ControllerCommand
// ============================================================================

/// Internal commands for the event loop.
enum ControllerCommand {
    /// Send a command and wait for its response.
    Send {
        id: RequestId,
        call: MethodCall,
        response_tx: oneshot::Sender<Result<MethodResult>>,
    },
    /// Answer an invoke.
    Reply { id: RequestId, result: MethodResult },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Controller
// ============================================================================

/// Client end of a bridge connection.
///
/// Cloning shares the same socket.
#[derive(Clone)]
pub struct Controller {
    command_tx: mpsc::UnboundedSender<ControllerCommand>,
    correlation: Arc<Mutex<CorrelationMap>>,
    listener: ListenerSlot,
}

impl Controller {
    /// Connects to a bridge's WebSocket server.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake takes longer than 30s
    /// - [`Error::Connection`] if the handshake fails
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws_stream, _) = timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| Error::connection_timeout(CONNECT_TIMEOUT.as_millis() as u64))?
            .map_err(|e| Error::connection(format!("WebSocket handshake failed: {e}")))?;

        debug!(url, "Connected to bridge");
        Ok(Self::from_stream(ws_stream))
    }

    /// Wraps an established WebSocket.
    ///
    /// Spawns the event loop and listener tasks.
    pub fn from_stream<S>(ws_stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));
        let listener: ListenerSlot = Arc::new(Mutex::new(None));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            delivery_tx,
        ));
        tokio::spawn(Self::run_listener(
            delivery_rx,
            Arc::clone(&listener),
            command_tx.clone(),
        ));

        Self {
            command_tx,
            correlation,
            listener,
        }
    }

    /// Sets the event listener.
    pub fn set_listener(&self, listener: Arc<dyn EventListener>) {
        *self.listener.lock() = Some(listener);
    }

    /// Clears the event listener. Navigation requests are then allowed.
    pub fn clear_listener(&self) {
        *self.listener.lock() = None;
    }

    /// Sends a command and waits for its result with the default timeout (30s).
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection is closed
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - The bridge's error, mapped back through [`MethodResult::into_result`]
    pub async fn call(&self, method: &str, arguments: Value) -> Result<Value> {
        self.call_with_timeout(method, arguments, DEFAULT_COMMAND_TIMEOUT)
            .await
    }

    /// Sends a validated command with the default timeout.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn execute(&self, command: BridgeCommand) -> Result<Value> {
        let call = command.into_call();
        let method = call.method.clone();
        self.send_call(call, DEFAULT_COMMAND_TIMEOUT)
            .await?
            .into_result(&method)
    }

    /// Sends a command and waits for its result with a custom timeout.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn call_with_timeout(
        &self,
        method: &str,
        arguments: Value,
        request_timeout: Duration,
    ) -> Result<Value> {
        self.send_call(MethodCall::new(method, arguments), request_timeout)
            .await?
            .into_result(method)
    }

    /// Returns the number of pending commands.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Closes the connection.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ControllerCommand::Shutdown);
    }

    async fn send_call(&self, call: MethodCall, request_timeout: Duration) -> Result<MethodResult> {
        let id = RequestId::generate();

        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::connection(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ControllerCommand::Send {
                id,
                call,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(ControllerCommand::RemoveCorrelation(id));

                Err(Error::request_timeout(
                    id,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ControllerCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        delivery_tx: mpsc::UnboundedSender<Delivery>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &correlation, &delivery_tx);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by bridge");
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

                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ControllerCommand::Send { id, call, response_tx }) => {
                            let frame = Frame::command(id, call);
                            correlation.lock().insert(id, response_tx);
                            if let Err(e) = Self::write_frame(&mut ws_write, &frame).await
                                && let Some(tx) = correlation.lock().remove(&id)
                            {
                                let _ = tx.send(Err(e));
                            }
                            trace!(%id, "Command sent");
                        }

                        Some(ControllerCommand::Reply { id, result }) => {
                            let frame = Frame::Reply { id, result };
                            if let Err(e) = Self::write_frame(&mut ws_write, &frame).await {
                                warn!(%id, error = %e, "Failed to send reply");
                            }
                        }

                        Some(ControllerCommand::RemoveCorrelation(id)) => {
                            correlation.lock().remove(&id);
                            debug!(%id, "Removed timed-out correlation");
                        }

                        Some(ControllerCommand::Shutdown) | None => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        Self::fail_pending_requests(&correlation);

        debug!("Controller event loop terminated");
    }

    async fn write_frame<W>(ws_write: &mut W, frame: &Frame) -> Result<()>
    where
        W: Sink<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        let json = to_string(frame)?;
        ws_write
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| Error::connection(e.to_string()))
    }

    /// Handles an incoming text message from the bridge.
    fn handle_incoming_message(
        text: &str,
        correlation: &Arc<Mutex<CorrelationMap>>,
        delivery_tx: &mpsc::UnboundedSender<Delivery>,
    ) {
        let frame = match from_str::<Frame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, text = %text, "Failed to parse incoming frame");
                return;
            }
        };

        let delivery = match frame {
            Frame::Response { id, result } => {
                match correlation.lock().remove(&id) {
                    Some(tx) => {
                        let _ = tx.send(Ok(result));
                    }
                    None => warn!(%id, "Response for unknown request"),
                }
                return;
            }
            Frame::Event { method, arguments } => Delivery::Event(Event {
                name: method,
                fields: arguments,
            }),
            Frame::Invoke {
                id,
                method,
                arguments,
            } => Delivery::Invoke {
                id,
                event: Event {
                    name: method,
                    fields: arguments,
                },
            },
            other => {
                warn!(kind = other.kind(), "Unexpected frame from bridge");
                return;
            }
        };

        let _ = delivery_tx.send(delivery);
    }

    /// Runs listener callbacks in arrival order.
    async fn run_listener(
        mut delivery_rx: mpsc::UnboundedReceiver<Delivery>,
        listener: ListenerSlot,
        command_tx: mpsc::UnboundedSender<ControllerCommand>,
    ) {
        while let Some(delivery) = delivery_rx.recv().await {
            let current = listener.lock().clone();
            match delivery {
                Delivery::Event(event) => {
                    if let Some(listener) = current {
                        listener.on_event(event).await;
                    }
                }
                Delivery::Invoke { id, event } => {
                    let result = Self::answer_invoke(current, &event).await;
                    if command_tx
                        .send(ControllerCommand::Reply { id, result })
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
    }

    async fn answer_invoke(listener: Option<Arc<dyn EventListener>>, event: &Event) -> MethodResult {
        if event.name != names::NAVIGATION_REQUEST {
            return MethodResult::NotImplemented;
        }

        let url = event.get_string("url");
        let is_main_frame = event.get_bool("isMainFrame");
        let allowed = match listener {
            Some(listener) => listener.on_navigation_request(&url, is_main_frame).await,
            None => true,
        };
        debug!(url = %url, allowed, "Navigation request answered");
        MethodResult::success(Value::Bool(allowed))
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(correlation: &Arc<Mutex<CorrelationMap>>) {
        let pending: Vec<_> = correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::io::{DuplexStream, duplex};
    use tokio_tungstenite::tungstenite::protocol::Role;

    async fn pair() -> (Controller, WebSocketStream<DuplexStream>) {
        let (bridge_io, controller_io) = duplex(64 * 1024);
        let bridge_ws = WebSocketStream::from_raw_socket(bridge_io, Role::Server, None).await;
        let controller_ws =
            WebSocketStream::from_raw_socket(controller_io, Role::Client, None).await;
        (Controller::from_stream(controller_ws), bridge_ws)
    }

    async fn next_frame(ws: &mut WebSocketStream<DuplexStream>) -> Frame {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return from_str(&text).expect("frame"),
                Some(Ok(_)) => continue,
                other => panic!("socket ended: {other:?}"),
            }
        }
    }

    async fn send_frame(ws: &mut WebSocketStream<DuplexStream>, frame: &Frame) {
        ws.send(Message::Text(to_string(frame).expect("json").into()))
            .await
            .expect("send");
    }

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_COMMAND_TIMEOUT.as_secs(), 30);
        assert_eq!(MAX_PENDING_REQUESTS, 100);
    }

    #[tokio::test]
    async fn test_call_correlates_response() {
        let (controller, mut bridge) = pair().await;

        let call = tokio::spawn({
            let controller = controller.clone();
            async move { controller.call("getTitle", Value::Null).await }
        });

        let id = match next_frame(&mut bridge).await {
            Frame::Command { id, method, .. } => {
                assert_eq!(method, "getTitle");
                id
            }
            other => panic!("unexpected frame: {other:?}"),
        };
        send_frame(
            &mut bridge,
            &Frame::Response {
                id,
                result: MethodResult::success(json!("Home")),
            },
        )
        .await;

        let value = call.await.expect("join").expect("call");
        assert_eq!(value, json!("Home"));
        assert_eq!(controller.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_error_response_maps_back() {
        let (controller, mut bridge) = pair().await;

        let call = tokio::spawn({
            let controller = controller.clone();
            async move { controller.call("zoomIn", Value::Null).await }
        });

        let Frame::Command { id, .. } = next_frame(&mut bridge).await else {
            panic!("expected a command");
        };
        send_frame(
            &mut bridge,
            &Frame::Response {
                id,
                result: MethodResult::NotImplemented,
            },
        )
        .await;

        let err = call.await.expect("join").unwrap_err();
        assert!(matches!(err, Error::Unimplemented { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout() {
        let (controller, _bridge) = pair().await;
        let err = controller
            .call_with_timeout("reload", Value::Null, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_navigation_request_answered_by_listener() {
        struct DenyAll;

        #[async_trait]
        impl EventListener for DenyAll {
            async fn on_navigation_request(&self, _url: &str, _is_main_frame: bool) -> bool {
                false
            }
        }

        let (controller, mut bridge) = pair().await;
        controller.set_listener(Arc::new(DenyAll));

        let id = RequestId::generate();
        send_frame(
            &mut bridge,
            &Frame::invoke(
                id,
                Event::new(names::NAVIGATION_REQUEST)
                    .with("url", "https://blocked.example")
                    .with("isMainFrame", true),
            ),
        )
        .await;

        match next_frame(&mut bridge).await {
            Frame::Reply { id: got, result } => {
                assert_eq!(got, id);
                assert_eq!(result, MethodResult::success(json!(false)));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_invoke_not_implemented() {
        let (_controller, mut bridge) = pair().await;
        let id = RequestId::generate();
        send_frame(&mut bridge, &Frame::invoke(id, Event::new("mystery"))).await;

        assert!(matches!(
            next_frame(&mut bridge).await,
            Frame::Reply { result: MethodResult::NotImplemented, .. }
        ));
    }

    #[tokio::test]
    async fn test_close_fails_pending() {
        let (controller, mut bridge) = pair().await;

        let call = tokio::spawn({
            let controller = controller.clone();
            async move { controller.call("reload", Value::Null).await }
        });
        let _ = next_frame(&mut bridge).await;
        bridge.close(None).await.expect("close");

        let err = call.await.expect("join").unwrap_err();
        assert!(err.is_connection_error());
    }
}
