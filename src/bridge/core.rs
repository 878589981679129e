//! Bridge handle and its event loop.
//!
//! One task owns the engine, the host, the channel registry, the file
//! coordinator and the normalizer. Everything that happens on other
//! threads (engine callbacks, channel posts, script results, file picks)
//! arrives as a [`LoopMessage`] and is handled in order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, trace, warn};

use crate::engine::{
    AssetResolver, EngineCallback, EngineEvents, EngineHooks, HostPlatform, RenderEngine,
};
use crate::error::{Error, Result};
use crate::identifiers::{RequestId, ViewId};
use crate::protocol::{BridgeEvent, MethodCall, MethodResult};
use crate::transport::{EventChannel, Inbound, InboundReceiver};

use super::builder::BridgeBuilder;
use super::dispatcher::{Dispatched, Dispatcher};
use super::file_chooser::{
    FileChooserReply, FileSelectionCoordinator, FileSelectionRequest, SelectionToken,
};
use super::interceptor::{NavigationGate, NavigationInterceptor, negotiate};
use super::normalizer::EventNormalizer;
use super::options::BridgeOptions;
use super::schemes::ExternalIntent;

// ============================================================================
// LoopMessage
// ============================================================================

/// Work queued for the bridge loop from outside it.
pub(crate) enum LoopMessage {
    /// Raw engine callback.
    Engine(EngineCallback),
    /// The page opened a file chooser.
    FileChooser {
        request: FileSelectionRequest,
        reply: FileChooserReply,
    },
    /// The host's picker finished.
    FileSelected {
        token: SelectionToken,
        uris: Vec<String>,
    },
    /// Page script posted on a named channel.
    ChannelPost { channel: String, message: String },
    /// An `evaluateScript` finished.
    ScriptResult {
        id: RequestId,
        result: Result<Option<String>>,
    },
    /// A navigation must be handed to an external application.
    OpenExternal(ExternalIntent),
    /// A navigation decision got a deadline; recompute the next wake-up.
    DeadlineArmed,
    /// Stop the loop.
    Shutdown,
}

impl fmt::Debug for LoopMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(callback) => f.debug_tuple("Engine").field(callback).finish(),
            Self::FileChooser { request, .. } => f
                .debug_struct("FileChooser")
                .field("request", request)
                .finish_non_exhaustive(),
            Self::FileSelected { token, uris } => f
                .debug_struct("FileSelected")
                .field("token", token)
                .field("uris", uris)
                .finish(),
            Self::ChannelPost { channel, message } => f
                .debug_struct("ChannelPost")
                .field("channel", channel)
                .field("message", message)
                .finish(),
            Self::ScriptResult { id, result } => f
                .debug_struct("ScriptResult")
                .field("id", id)
                .field("result", result)
                .finish(),
            Self::OpenExternal(intent) => f.debug_tuple("OpenExternal").field(intent).finish(),
            Self::DeadlineArmed => f.write_str("DeadlineArmed"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// A running bridge for one view.
///
/// The bridge stops when the controller disconnects, when
/// [`shutdown`](Self::shutdown) is called, or on a protocol violation, in
/// which case [`join`](Self::join) returns the error.
pub struct Bridge {
    view_id: ViewId,
    loop_tx: mpsc::UnboundedSender<LoopMessage>,
    task: JoinHandle<Result<()>>,
}

impl Bridge {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Wires the components, applies creation parameters and spawns the loop.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn spawn(
        options: BridgeOptions,
        mut engine: Box<dyn RenderEngine>,
        host: Box<dyn HostPlatform>,
        channel: Arc<dyn EventChannel>,
        inbound: InboundReceiver,
    ) -> Result<Self> {
        options.validate()?;

        let view_id = options.view_id;
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        let capabilities = engine.capabilities();

        let interceptor = Arc::new(Mutex::new(NavigationInterceptor::new(
            view_id,
            negotiate(view_id, capabilities),
            Arc::clone(&channel),
            loop_tx.clone(),
            options.decision_timeout,
        )));

        engine.attach(EngineHooks {
            gate: NavigationGate::new(Arc::clone(&interceptor)),
            events: EngineEvents::new(loop_tx.clone()),
        });

        let assets = match &options.asset_root {
            Some(root) => AssetResolver::with_root(root.clone()),
            None => AssetResolver::new(),
        };

        let mut dispatcher = Dispatcher::new(
            view_id,
            engine,
            Arc::clone(&interceptor),
            assets,
            loop_tx.clone(),
        );

        if let Err(e) = dispatcher.initialize(&options.creation) {
            error!(%view_id, error = %e, "Bridge initialization failed");
            dispatcher.dispose();
            return Err(e);
        }

        let state = BridgeLoop {
            view_id,
            dispatcher,
            normalizer: EventNormalizer::new(view_id, capabilities),
            files: FileSelectionCoordinator::new(loop_tx.clone()),
            host,
            channel,
            interceptor,
        };

        let task = tokio::spawn(state.run(loop_rx, inbound));

        info!(%view_id, channel = %view_id.channel_name(), "Bridge started");

        Ok(Self {
            view_id,
            loop_tx,
            task,
        })
    }

    /// Returns the view ID.
    #[inline]
    #[must_use]
    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    /// Returns the per-view channel name.
    #[inline]
    #[must_use]
    pub fn channel_name(&self) -> String {
        self.view_id.channel_name()
    }

    /// Returns `true` once the loop has stopped.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Asks the loop to stop. Pending file selections resolve empty.
    pub fn shutdown(&self) {
        let _ = self.loop_tx.send(LoopMessage::Shutdown);
    }

    /// Waits for the loop to stop.
    ///
    /// # Errors
    ///
    /// - [`Error::ProtocolViolation`] if the controller broke the protocol
    /// - [`Error::Engine`] if the loop task panicked
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| Error::engine(format!("bridge loop task failed: {e}")))?
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("view_id", &self.view_id)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

// ============================================================================
// BridgeLoop
// ============================================================================

/// State owned by the loop task.
struct BridgeLoop {
    view_id: ViewId,
    dispatcher: Dispatcher,
    normalizer: EventNormalizer,
    files: FileSelectionCoordinator,
    host: Box<dyn HostPlatform>,
    channel: Arc<dyn EventChannel>,
    interceptor: Arc<Mutex<NavigationInterceptor>>,
}

impl BridgeLoop {
    async fn run(
        mut self,
        mut loop_rx: mpsc::UnboundedReceiver<LoopMessage>,
        mut inbound: InboundReceiver,
    ) -> Result<()> {
        debug!(view_id = %self.view_id, "Bridge loop running");

        let result = loop {
            let deadline = self.interceptor.lock().next_deadline();

            tokio::select! {
                message = loop_rx.recv() => {
                    match message {
                        Some(LoopMessage::Shutdown) | None => {
                            debug!(view_id = %self.view_id, "Shutdown requested");
                            break Ok(());
                        }
                        Some(message) => self.handle_message(message),
                    }
                }

                frame = inbound.recv() => {
                    match frame {
                        Some(Inbound::Command { id, call }) => self.handle_command(id, &call),
                        Some(Inbound::Reply { id, result }) => {
                            if let Err(e) = self.handle_reply(id, result) {
                                error!(view_id = %self.view_id, error = %e, "Protocol violation; stopping bridge");
                                break Err(e);
                            }
                        }
                        None => {
                            info!(view_id = %self.view_id, "Controller disconnected");
                            break Ok(());
                        }
                    }
                }

                () = sleep_until_deadline(deadline) => {
                    let expired = self.interceptor.lock().expire(Instant::now());
                    trace!(view_id = %self.view_id, expired, "Decision deadline reached");
                }
            }
        };

        loop_rx.close();
        while let Ok(message) = loop_rx.try_recv() {
            self.discard(message);
        }
        self.files.cancel();
        self.dispatcher.dispose();
        info!(view_id = %self.view_id, "Bridge stopped");

        result
    }

    /// Settles a message left in the queue when the loop stopped.
    fn discard(&mut self, message: LoopMessage) {
        match message {
            LoopMessage::Engine(EngineCallback::TlsError { url, prompt, .. }) => {
                debug!(view_id = %self.view_id, url = %url, "Cancelling certificate prompt on stop");
                prompt.cancel();
            }
            LoopMessage::FileChooser { reply, .. } => reply(Vec::new()),
            other => trace!(view_id = %self.view_id, message = ?other, "Dropped on stop"),
        }
    }

    fn handle_command(&mut self, id: RequestId, call: &MethodCall) {
        let result = match self.dispatcher.dispatch(id, call) {
            Ok(Dispatched::Pending) => return,
            Ok(Dispatched::Complete(value)) => MethodResult::success(value),
            Err(e) => {
                debug!(
                    view_id = %self.view_id,
                    request_id = %id,
                    method = %call.method,
                    error = %e,
                    "Command failed"
                );
                MethodResult::from_error(&e)
            }
        };
        self.respond(id, result);
    }

    fn handle_reply(&mut self, id: RequestId, result: MethodResult) -> Result<()> {
        // The interceptor lock must be released before the engine is called.
        let reissue = self.interceptor.lock().resolve(id, result)?;

        if let Some(request) = reissue
            && let Err(e) = self.dispatcher.reissue(&request)
        {
            warn!(
                view_id = %self.view_id,
                url = %request.url,
                error = %e,
                "Failed to re-issue allowed navigation"
            );
        }
        Ok(())
    }

    fn handle_message(&mut self, message: LoopMessage) {
        match message {
            LoopMessage::Engine(callback) => {
                trace!(view_id = %self.view_id, kind = callback.kind(), "Engine callback");
                let dispatcher = &self.dispatcher;
                if let Some(event) = self
                    .normalizer
                    .normalize(callback, || dispatcher.engine().current_url())
                {
                    self.emit(event);
                }
            }

            LoopMessage::FileChooser { request, reply } => {
                self.files.request(self.host.as_mut(), request, reply);
            }

            LoopMessage::FileSelected { token, uris } => {
                self.files.resolve(token, uris);
            }

            LoopMessage::ChannelPost { channel, message } => {
                if let Some(event) = self.dispatcher.channels().route(channel, message) {
                    self.emit(event);
                }
            }

            LoopMessage::ScriptResult { id, result } => {
                let result = result.map(|value| value.map_or(Value::Null, Value::String));
                self.respond(id, MethodResult::from_result(result));
            }

            LoopMessage::OpenExternal(intent) => match self.host.open_external(&intent) {
                Ok(()) => debug!(view_id = %self.view_id, url = intent.url(), "Opened externally"),
                Err(Error::ExternalHandlerMissing { url }) => {
                    warn!(view_id = %self.view_id, url = %url, "No application can handle URL");
                }
                Err(e) => {
                    warn!(view_id = %self.view_id, url = intent.url(), error = %e, "External hand-off failed");
                }
            },

            // The deadline is re-read at the top of the loop.
            LoopMessage::DeadlineArmed => {}

            // Handled by the loop itself.
            LoopMessage::Shutdown => {}
        }
    }

    fn emit(&self, event: BridgeEvent) {
        let name = event.name();
        if let Err(e) = self.channel.emit(event.into_event()) {
            warn!(view_id = %self.view_id, event = name, error = %e, "Failed to emit event");
        }
    }

    fn respond(&self, id: RequestId, result: MethodResult) {
        if let Err(e) = self.channel.respond(id, result) {
            warn!(view_id = %self.view_id, request_id = %id, error = %e, "Failed to send response");
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
