//! Command dispatcher.
//!
//! Validates a [`MethodCall`] into a [`BridgeCommand`] before the engine is
//! touched, then drives the engine. Every command completes synchronously
//! except `evaluateScript`, whose result arrives later through a
//! [`ScriptResponder`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::engine::{AssetResolver, RenderEngine};
use crate::error::{Error, Result};
use crate::identifiers::{RequestId, ViewId};
use crate::protocol::{BridgeCommand, Headers, MethodCall, SettingChange, SettingsUpdate};

use super::LoopMessage;
use super::channels::ChannelRegistry;
use super::interceptor::{NavigationInterceptor, NavigationRequest};
use super::options::{CreationParams, InitialData, InitialLoad};

// ============================================================================
// ScriptResponder
// ============================================================================

/// One-shot completion for an `evaluateScript` command.
///
/// Dropping it unresolved answers the command with an engine error.
pub struct ScriptResponder {
    id: RequestId,
    tx: Option<mpsc::UnboundedSender<LoopMessage>>,
}

impl ScriptResponder {
    pub(crate) fn new(id: RequestId, tx: mpsc::UnboundedSender<LoopMessage>) -> Self {
        Self { id, tx: Some(tx) }
    }

    /// Returns the command's request ID.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.id
    }

    /// Delivers the script's result.
    pub fn resolve(mut self, result: Result<Option<String>>) {
        self.send(result);
    }

    /// Delivers a successful result.
    pub fn succeed(self, value: Option<String>) {
        self.resolve(Ok(value));
    }

    /// Delivers an engine failure.
    pub fn fail(self, message: impl Into<String>) {
        self.resolve(Err(Error::engine(message)));
    }

    fn send(&mut self, result: Result<Option<String>>) {
        if let Some(tx) = self.tx.take() {
            let id = self.id;
            if tx.send(LoopMessage::ScriptResult { id, result }).is_err() {
                trace!(request_id = %id, "Script result after bridge stopped");
            }
        }
    }
}

impl Drop for ScriptResponder {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.send(Err(Error::engine("script evaluation was abandoned by the engine")));
        }
    }
}

impl fmt::Debug for ScriptResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptResponder")
            .field("id", &self.id)
            .field("resolved", &self.tx.is_none())
            .finish()
    }
}

// ============================================================================
// Dispatched
// ============================================================================

/// How a command completed.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// Done; respond with this value.
    Complete(Value),
    /// The response is sent when the engine finishes.
    Pending,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Engine-facing state owned by the bridge loop.
pub struct Dispatcher {
    view_id: ViewId,
    engine: Box<dyn RenderEngine>,
    channels: ChannelRegistry,
    interceptor: Arc<Mutex<NavigationInterceptor>>,
    assets: AssetResolver,
    loop_tx: mpsc::UnboundedSender<LoopMessage>,
}

impl Dispatcher {
    pub(crate) fn new(
        view_id: ViewId,
        engine: Box<dyn RenderEngine>,
        interceptor: Arc<Mutex<NavigationInterceptor>>,
        assets: AssetResolver,
        loop_tx: mpsc::UnboundedSender<LoopMessage>,
    ) -> Self {
        Self {
            view_id,
            engine,
            channels: ChannelRegistry::new(loop_tx.clone()),
            interceptor,
            assets,
            loop_tx,
        }
    }

    /// Returns the engine.
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &dyn RenderEngine {
        self.engine.as_ref()
    }

    /// Returns the channel registry.
    #[inline]
    #[must_use]
    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Validates and runs a raw command.
    ///
    /// # Errors
    ///
    /// - [`Error::Unimplemented`] for unknown methods, engine untouched
    /// - [`Error::InvalidArgument`] for bad arguments, engine untouched
    /// - [`Error::Engine`] if an engine primitive fails
    pub fn dispatch(&mut self, id: RequestId, call: &MethodCall) -> Result<Dispatched> {
        let command = BridgeCommand::parse(call)?;
        self.execute(id, command)
    }

    /// Runs a validated command.
    pub fn execute(&mut self, id: RequestId, command: BridgeCommand) -> Result<Dispatched> {
        debug!(view_id = %self.view_id, request_id = %id, method = command.method(), "Dispatching command");

        let value = match command {
            BridgeCommand::LoadUrl { url, headers } => {
                self.engine.load_url(&url, &headers)?;
                Value::Null
            }

            BridgeCommand::LoadFile { path, headers } => {
                let url = self.assets.resolve(&path)?;
                self.engine.load_url(url.as_str(), &headers)?;
                Value::Null
            }

            BridgeCommand::LoadData {
                data,
                mime_type,
                encoding,
                base_url,
            } => {
                self.load_data(&InitialData {
                    data,
                    mime_type,
                    encoding,
                    base_url,
                })?;
                Value::Null
            }

            BridgeCommand::UpdateSettings(update) => {
                self.apply_settings(&update)?;
                Value::Null
            }

            BridgeCommand::CanGoBack => Value::Bool(self.engine.can_go_back()),
            BridgeCommand::CanGoForward => Value::Bool(self.engine.can_go_forward()),

            BridgeCommand::GoBack => {
                if self.engine.can_go_back() {
                    self.engine.go_back()?;
                }
                Value::Null
            }

            BridgeCommand::GoForward => {
                if self.engine.can_go_forward() {
                    self.engine.go_forward()?;
                }
                Value::Null
            }

            BridgeCommand::Reload => {
                self.engine.reload()?;
                Value::Null
            }

            BridgeCommand::CurrentUrl => self.engine.current_url().map_or(Value::Null, Value::String),
            BridgeCommand::GetTitle => self.engine.title().map_or(Value::Null, Value::String),

            BridgeCommand::EvaluateScript { script } => {
                let responder = ScriptResponder::new(id, self.loop_tx.clone());
                self.engine.evaluate_script(&script, responder);
                return Ok(Dispatched::Pending);
            }

            BridgeCommand::AddNamedChannels(names) => {
                self.channels.register_all(self.engine.as_mut(), &names)?;
                Value::Null
            }

            BridgeCommand::RemoveNamedChannels(names) => {
                self.channels.unregister_all(self.engine.as_mut(), &names)?;
                Value::Null
            }

            BridgeCommand::ClearCache => {
                self.engine.clear_cache()?;
                Value::Null
            }
        };

        Ok(Dispatched::Complete(value))
    }

    /// Applies a validated settings batch.
    pub fn apply_settings(&mut self, update: &SettingsUpdate) -> Result<()> {
        for change in update.changes() {
            trace!(view_id = %self.view_id, key = change.key(), "Applying setting");
            match change {
                SettingChange::JsMode(mode) => self.engine.set_javascript_enabled(mode.is_enabled())?,
                SettingChange::NavigationDelegate(enabled) => {
                    self.interceptor.lock().set_delegate_enabled(*enabled);
                }
                SettingChange::Debugging(enabled) => self.engine.set_debugging_enabled(*enabled)?,
                SettingChange::UserAgent(agent) => self.engine.set_user_agent(agent.as_deref())?,
            }
        }
        Ok(())
    }

    /// Re-issues a navigation the controller allowed.
    pub fn reissue(&mut self, request: &NavigationRequest) -> Result<()> {
        debug!(view_id = %self.view_id, url = %request.url, "Re-issuing allowed navigation");
        self.engine.load_url(&request.url, &request.reload_headers())
    }

    /// Applies creation parameters and performs the first load.
    pub(crate) fn initialize(&mut self, creation: &CreationParams) -> Result<()> {
        self.engine.set_dom_storage_enabled(true)?;

        let settings = creation.settings_update()?;
        self.apply_settings(&settings)?;

        self.channels
            .register_all(self.engine.as_mut(), &creation.named_channel_names)?;

        self.engine.set_media_playback_requires_user_gesture(
            creation.auto_media_playback_policy.requires_user_gesture(),
        )?;

        match creation.initial_load() {
            Some(InitialLoad::Data(data)) => self.load_data(&data)?,
            Some(InitialLoad::File(path)) => {
                let url = self.assets.resolve(&path)?;
                self.engine.load_url(url.as_str(), &Headers::new())?;
            }
            Some(InitialLoad::Url(url)) => self.engine.load_url(&url, &Headers::new())?,
            None => {}
        }

        Ok(())
    }

    /// Releases the engine.
    pub(crate) fn dispose(&mut self) {
        self.engine.dispose();
    }

    fn load_data(&mut self, data: &InitialData) -> Result<()> {
        if data.encoding.eq_ignore_ascii_case("base64") {
            STANDARD
                .decode(data.data.as_bytes())
                .map_err(|e| Error::invalid_argument("data", format!("invalid base64: {e}")))?;
        }
        self.engine.load_data(
            &data.data,
            &data.mime_type,
            &data.encoding,
            data.base_url.as_deref(),
        )
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("view_id", &self.view_id)
            .field("channels", &self.channels.len())
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
