//! In-memory doubles for unit tests.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use crate::bridge::{
    ChannelPoster, ExternalIntent, FileSelectionHandle, FileSelectionRequest, ScriptResponder,
};
use crate::engine::{
    EngineCapabilities, EngineHooks, HostPlatform, NavigationAttempt, NavigationVerdict,
    RenderEngine,
};
use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Event, Frame, Headers, MethodResult};
use crate::transport::EventChannel;

// ============================================================================
// MockEngine
// ============================================================================

/// Everything a [`MockEngine`] was asked to do.
#[derive(Default)]
pub(crate) struct MockState {
    pub calls: Vec<String>,
    pub loads: Vec<(String, Headers)>,
    pub current_url: Option<String>,
    pub title: Option<String>,
    pub back: Vec<String>,
    pub forward: Vec<String>,
    pub channels: Vec<String>,
    pub posters: FxHashMap<String, ChannelPoster>,
    pub javascript_enabled: Option<bool>,
    pub debugging_enabled: Option<bool>,
    pub user_agent: Option<Option<String>>,
    pub dom_storage_enabled: Option<bool>,
    pub media_requires_gesture: Option<bool>,
    pub pending_scripts: VecDeque<(String, ScriptResponder)>,
    pub cache_clears: usize,
    pub fail_next: Option<String>,
    pub disposed: bool,
    pub hooks: Option<EngineHooks>,
}

impl MockState {
    fn record(&mut self, call: &str) -> Result<()> {
        self.calls.push(call.to_string());
        match self.fail_next.take() {
            Some(message) => Err(Error::engine(message)),
            None => Ok(()),
        }
    }

    fn visit(&mut self, url: &str) {
        if let Some(previous) = self.current_url.replace(url.to_string()) {
            self.back.push(previous);
        }
        self.forward.clear();
    }
}

/// Scriptable engine sharing its state across clones.
#[derive(Clone)]
pub(crate) struct MockEngine {
    capabilities: EngineCapabilities,
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_capabilities(EngineCapabilities::full())
    }

    pub fn with_capabilities(capabilities: EngineCapabilities) -> Self {
        Self {
            capabilities,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock()
    }

    pub fn hooks(&self) -> EngineHooks {
        self.state
            .lock()
            .hooks
            .clone()
            .expect("engine not attached")
    }

    /// Simulates a page-initiated navigation.
    pub fn navigate(&self, attempt: NavigationAttempt) -> NavigationVerdict {
        let url = attempt.url.clone();
        let verdict = self.hooks().gate.decide(attempt);
        if verdict == NavigationVerdict::Proceed {
            self.state.lock().visit(&url);
        }
        verdict
    }

    /// Simulates page script posting on a channel.
    pub fn post_on_channel(&self, channel: &str, message: &str) {
        let poster = self.state.lock().posters.get(channel).cloned();
        poster.expect("channel not installed").post(message);
    }

    /// Resolves the oldest pending script.
    pub fn complete_script(&self, result: Result<Option<String>>) {
        let pending = self.state.lock().pending_scripts.pop_front();
        let (_, responder) = pending.expect("no pending script");
        responder.resolve(result);
    }

    /// Drops every pending script responder unresolved.
    pub fn drop_scripts(&self) {
        let pending: Vec<_> = self.state.lock().pending_scripts.drain(..).collect();
        drop(pending);
    }

    /// Makes the next fallible call fail.
    pub fn fail_next(&self, message: &str) {
        self.state.lock().fail_next = Some(message.to_string());
    }
}

impl RenderEngine for MockEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    fn attach(&mut self, hooks: EngineHooks) {
        self.state.lock().hooks = Some(hooks);
    }

    fn load_url(&mut self, url: &str, headers: &Headers) -> Result<()> {
        let mut state = self.state.lock();
        state.record("load_url")?;
        state.loads.push((url.to_string(), headers.clone()));
        state.visit(url);
        Ok(())
    }

    fn load_data(
        &mut self,
        _data: &str,
        _mime_type: &str,
        _encoding: &str,
        base_url: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.record("load_data")?;
        state.visit(base_url.unwrap_or("about:blank"));
        Ok(())
    }

    fn can_go_back(&self) -> bool {
        !self.state.lock().back.is_empty()
    }

    fn can_go_forward(&self) -> bool {
        !self.state.lock().forward.is_empty()
    }

    fn go_back(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.record("go_back")?;
        if let Some(url) = state.back.pop() {
            if let Some(current) = state.current_url.replace(url) {
                state.forward.push(current);
            }
        }
        Ok(())
    }

    fn go_forward(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.record("go_forward")?;
        if let Some(url) = state.forward.pop() {
            if let Some(current) = state.current_url.replace(url) {
                state.back.push(current);
            }
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.state.lock().record("reload")
    }

    fn current_url(&self) -> Option<String> {
        self.state.lock().current_url.clone()
    }

    fn title(&self) -> Option<String> {
        self.state.lock().title.clone()
    }

    fn evaluate_script(&mut self, script: &str, responder: ScriptResponder) {
        let mut state = self.state.lock();
        state.calls.push("evaluate_script".to_string());
        state
            .pending_scripts
            .push_back((script.to_string(), responder));
    }

    fn set_javascript_enabled(&mut self, enabled: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.record("set_javascript_enabled")?;
        state.javascript_enabled = Some(enabled);
        Ok(())
    }

    fn set_debugging_enabled(&mut self, enabled: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.record("set_debugging_enabled")?;
        state.debugging_enabled = Some(enabled);
        Ok(())
    }

    fn set_user_agent(&mut self, user_agent: Option<&str>) -> Result<()> {
        let mut state = self.state.lock();
        state.record("set_user_agent")?;
        state.user_agent = Some(user_agent.map(str::to_owned));
        Ok(())
    }

    fn set_dom_storage_enabled(&mut self, enabled: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.record("set_dom_storage_enabled")?;
        state.dom_storage_enabled = Some(enabled);
        Ok(())
    }

    fn set_media_playback_requires_user_gesture(&mut self, required: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.record("set_media_playback_requires_user_gesture")?;
        state.media_requires_gesture = Some(required);
        Ok(())
    }

    fn add_script_channel(&mut self, name: &str, poster: ChannelPoster) -> Result<()> {
        let mut state = self.state.lock();
        state.record("add_script_channel")?;
        state.channels.push(name.to_string());
        state.posters.insert(name.to_string(), poster);
        Ok(())
    }

    fn remove_script_channel(&mut self, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.record("remove_script_channel")?;
        state.channels.retain(|channel| channel != name);
        state.posters.remove(name);
        Ok(())
    }

    fn clear_cache(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.record("clear_cache")?;
        state.cache_clears += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        self.state.lock().disposed = true;
    }
}

// ============================================================================
// MockHost
// ============================================================================

#[derive(Default)]
struct HostState {
    no_picker: bool,
    no_handlers: bool,
    pickers: Vec<FileSelectionHandle>,
    requests: Vec<FileSelectionRequest>,
    opened: Vec<ExternalIntent>,
}

/// Host whose picker handles can be taken and completed by the test.
#[derive(Clone, Default)]
pub(crate) struct MockHost {
    state: Arc<Mutex<HostState>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_file_picker(self) -> Self {
        self.state.lock().no_picker = true;
        self
    }

    pub fn without_external_handlers(self) -> Self {
        self.state.lock().no_handlers = true;
        self
    }

    /// Takes the most recently launched picker handle.
    pub fn take_picker(&self) -> Option<FileSelectionHandle> {
        self.state.lock().pickers.pop()
    }

    pub fn picker_requests(&self) -> Vec<FileSelectionRequest> {
        self.state.lock().requests.clone()
    }

    pub fn opened(&self) -> Vec<ExternalIntent> {
        self.state.lock().opened.clone()
    }
}

impl HostPlatform for MockHost {
    fn open_external(&mut self, intent: &ExternalIntent) -> Result<()> {
        let mut state = self.state.lock();
        if state.no_handlers {
            return Err(Error::external_handler_missing(intent.url()));
        }
        state.opened.push(intent.clone());
        Ok(())
    }

    fn launch_file_picker(
        &mut self,
        request: &FileSelectionRequest,
        handle: FileSelectionHandle,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.no_picker {
            return Err(Error::engine("no file picker"));
        }
        state.requests.push(request.clone());
        state.pickers.push(handle);
        Ok(())
    }
}

// ============================================================================
// RecordingChannel
// ============================================================================

/// Event channel that records every frame it is given.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    frames: Mutex<Vec<Frame>>,
    closed: Mutex<bool>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call fail with `ConnectionClosed`.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| match frame {
                Frame::Event { method, arguments } => Some(Event {
                    name: method.clone(),
                    fields: arguments.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn invokes(&self) -> Vec<(RequestId, Event)> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| match frame {
                Frame::Invoke {
                    id,
                    method,
                    arguments,
                } => Some((
                    *id,
                    Event {
                        name: method.clone(),
                        fields: arguments.clone(),
                    },
                )),
                _ => None,
            })
            .collect()
    }

    pub fn responses(&self) -> Vec<(RequestId, MethodResult)> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| match frame {
                Frame::Response { id, result } => Some((*id, result.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, frame: Frame) -> Result<()> {
        if *self.closed.lock() {
            return Err(Error::ConnectionClosed);
        }
        self.frames.lock().push(frame);
        Ok(())
    }
}

impl EventChannel for RecordingChannel {
    fn emit(&self, event: Event) -> Result<()> {
        self.record(Frame::event(event))
    }

    fn invoke(&self, event: Event) -> Result<RequestId> {
        let id = RequestId::generate();
        self.record(Frame::invoke(id, event))?;
        Ok(id)
    }

    fn respond(&self, id: RequestId, result: MethodResult) -> Result<()> {
        self.record(Frame::Response { id, result })
    }
}
