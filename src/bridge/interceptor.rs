//! Navigation interceptor.
//!
//! The engine asks "may this navigation proceed?" and needs the answer
//! immediately. The controller's answer arrives later. The interceptor
//! bridges the two:
//!
//! 1. External schemes are handed to the host and cancelled.
//! 2. Without a navigation delegate everything else proceeds.
//! 3. With a delegate, a governed attempt is cancelled at the engine and a
//!    `navigationRequest` is sent to the controller. A `true` reply re-issues
//!    the navigation as a fresh load; `false` drops it.
//!
//! # Decision slots
//!
//! Each frame has one slot holding at most one in-flight decision and at
//! most one deferred attempt. A new attempt while a decision is in flight
//! replaces the deferred one; it is sent once the in-flight decision
//! resolves, so decisions for a frame are never pipelined.
//!
//! Every reply must match the in-flight decision of some slot. Anything else
//! (duplicate, late, superseded, expired or unknown) is a protocol violation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::engine::{EngineCapabilities, FrameScope, NavigationAttempt, NavigationVerdict};
use crate::error::{Error, Result};
use crate::identifiers::{FrameId, RequestId, ViewId};
use crate::protocol::command::type_name;
use crate::protocol::{BridgeEvent, Headers, MethodResult};
use crate::transport::EventChannel;

use super::LoopMessage;
use super::schemes::ExternalIntent;

// ============================================================================
// NavigationRequest
// ============================================================================

/// A navigation awaiting the controller's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Target URL.
    pub url: String,
    /// Whether the main frame is targeted.
    pub is_main_frame: bool,
    /// Request headers, when known.
    pub headers: Option<Headers>,
}

impl NavigationRequest {
    /// Returns the `navigationRequest` event for this request.
    #[must_use]
    pub fn to_event(&self) -> BridgeEvent {
        BridgeEvent::NavigationRequest {
            url: self.url.clone(),
            is_main_frame: self.is_main_frame,
            headers: self.headers.clone(),
        }
    }

    /// Returns the headers to re-issue the load with.
    #[must_use]
    pub fn reload_headers(&self) -> Headers {
        self.headers.clone().unwrap_or_default()
    }
}

// ============================================================================
// Strategies
// ============================================================================

/// Outcome of classifying an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Governance {
    /// The controller decides.
    Governed {
        /// Slot key.
        frame: FrameId,
        /// Request to send.
        request: NavigationRequest,
    },
    /// The engine proceeds on its own.
    Ungoverned,
}

/// Decides which attempts the controller governs.
pub trait NavigationStrategy: Send + fmt::Debug {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Classifies an attempt.
    fn classify(&self, attempt: NavigationAttempt) -> Governance;
}

/// Strategy for engines that report frame scope.
///
/// Only main-frame attempts are governed.
#[derive(Debug, Clone, Copy)]
pub struct ScopedStrategy {
    headers: bool,
}

impl ScopedStrategy {
    /// Creates the strategy; `headers` says whether attempts carry headers.
    #[must_use]
    pub fn new(headers: bool) -> Self {
        Self { headers }
    }
}

impl NavigationStrategy for ScopedStrategy {
    fn name(&self) -> &'static str {
        "scoped"
    }

    fn classify(&self, attempt: NavigationAttempt) -> Governance {
        match attempt.scope {
            FrameScope::Subframe(_) => Governance::Ungoverned,
            FrameScope::Main | FrameScope::Unknown => Governance::Governed {
                frame: FrameId::main(),
                request: NavigationRequest {
                    url: attempt.url,
                    is_main_frame: true,
                    headers: if self.headers { attempt.headers } else { None },
                },
            },
        }
    }
}

/// Strategy for engines that cannot report frame scope.
///
/// Every attempt is treated as main-frame and carries no headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyStrategy;

impl NavigationStrategy for LegacyStrategy {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn classify(&self, attempt: NavigationAttempt) -> Governance {
        Governance::Governed {
            frame: FrameId::main(),
            request: NavigationRequest {
                url: attempt.url,
                is_main_frame: true,
                headers: None,
            },
        }
    }
}

/// Picks the strategy for an engine.
#[must_use]
pub fn negotiate(view_id: ViewId, capabilities: EngineCapabilities) -> Box<dyn NavigationStrategy> {
    if capabilities.supports_scoped_navigation() {
        Box::new(ScopedStrategy::new(capabilities.navigation_headers))
    } else {
        warn!(
            %view_id,
            "Engine cannot scope navigations to frames; every navigation is treated as main-frame"
        );
        Box::new(LegacyStrategy)
    }
}

// ============================================================================
// Decision Slots
// ============================================================================

#[derive(Debug)]
struct PendingDecision {
    id: RequestId,
    request: NavigationRequest,
    deadline: Option<Instant>,
}

#[derive(Debug, Default)]
struct DecisionSlot {
    in_flight: Option<PendingDecision>,
    deferred: Option<NavigationRequest>,
}

impl DecisionSlot {
    fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.deferred.is_none()
    }
}

// ============================================================================
// NavigationInterceptor
// ============================================================================

/// Navigation decision state for one bridge.
pub struct NavigationInterceptor {
    view_id: ViewId,
    strategy: Box<dyn NavigationStrategy>,
    delegate_enabled: bool,
    slots: FxHashMap<FrameId, DecisionSlot>,
    channel: Arc<dyn EventChannel>,
    loop_tx: mpsc::UnboundedSender<LoopMessage>,
    decision_timeout: Option<Duration>,
}

impl NavigationInterceptor {
    pub(crate) fn new(
        view_id: ViewId,
        strategy: Box<dyn NavigationStrategy>,
        channel: Arc<dyn EventChannel>,
        loop_tx: mpsc::UnboundedSender<LoopMessage>,
        decision_timeout: Option<Duration>,
    ) -> Self {
        debug!(%view_id, strategy = strategy.name(), "Navigation interceptor created");
        Self {
            view_id,
            strategy,
            delegate_enabled: false,
            slots: FxHashMap::default(),
            channel,
            loop_tx,
            decision_timeout,
        }
    }

    /// Returns the active strategy name.
    #[inline]
    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Returns `true` if the controller decides navigations.
    #[inline]
    #[must_use]
    pub fn delegate_enabled(&self) -> bool {
        self.delegate_enabled
    }

    /// Installs or removes the controller's navigation delegate.
    ///
    /// Decisions already in flight still expect their replies. Removing the
    /// delegate drops every deferred attempt.
    pub fn set_delegate_enabled(&mut self, enabled: bool) {
        if self.delegate_enabled != enabled {
            info!(view_id = %self.view_id, enabled, "Navigation delegate changed");
        }
        self.delegate_enabled = enabled;

        if !enabled {
            for slot in self.slots.values_mut() {
                if let Some(dropped) = slot.deferred.take() {
                    debug!(
                        view_id = %self.view_id,
                        url = %dropped.url,
                        "Deferred navigation dropped with delegate"
                    );
                }
            }
            self.slots.retain(|_, slot| !slot.is_idle());
        }
    }

    /// Returns the number of decisions awaiting a reply.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.in_flight.is_some())
            .count()
    }

    /// Answers the engine for one attempt. Never blocks.
    pub fn decide(&mut self, attempt: NavigationAttempt) -> NavigationVerdict {
        if let Some(intent) = ExternalIntent::parse(&attempt.url) {
            debug!(
                view_id = %self.view_id,
                url = %attempt.url,
                action = intent.action(),
                "Handing navigation to host"
            );
            if self.loop_tx.send(LoopMessage::OpenExternal(intent)).is_err() {
                trace!(url = %attempt.url, "External navigation after bridge stopped");
            }
            return NavigationVerdict::Cancel;
        }

        if !self.delegate_enabled {
            return NavigationVerdict::Proceed;
        }

        let (frame, request) = match self.strategy.classify(attempt) {
            Governance::Ungoverned => return NavigationVerdict::Proceed,
            Governance::Governed { frame, request } => (frame, request),
        };

        let slot = self.slots.entry(frame).or_default();
        if let Some(pending) = &slot.in_flight {
            if let Some(superseded) = slot.deferred.replace(request) {
                debug!(
                    view_id = %self.view_id,
                    url = %superseded.url,
                    "Superseding deferred navigation"
                );
            }
            debug!(
                view_id = %self.view_id,
                %frame,
                request_id = %pending.id,
                "Navigation deferred behind in-flight decision"
            );
            return NavigationVerdict::Cancel;
        }

        self.issue(frame, request);
        NavigationVerdict::Cancel
    }

    /// Applies the controller's reply to an in-flight decision.
    ///
    /// Returns the request to re-issue when the navigation was allowed.
    ///
    /// # Errors
    ///
    /// [`Error::ProtocolViolation`] if `id` is not in flight or the reply is
    /// not a boolean.
    pub fn resolve(&mut self, id: RequestId, result: MethodResult) -> Result<Option<NavigationRequest>> {
        let frame = self
            .slots
            .iter()
            .find(|(_, slot)| slot.in_flight.as_ref().is_some_and(|p| p.id == id))
            .map(|(frame, _)| *frame)
            .ok_or_else(|| {
                Error::protocol_violation(format!(
                    "reply to navigation decision {id} which is not in flight"
                ))
            })?;

        let pending = self
            .slots
            .get_mut(&frame)
            .and_then(|slot| slot.in_flight.take())
            .ok_or_else(|| Error::protocol_violation(format!("decision {id} vanished")))?;

        let allowed = match result {
            MethodResult::Success {
                result: Value::Bool(allowed),
            } => allowed,
            MethodResult::Success { result } => {
                return Err(Error::protocol_violation(format!(
                    "navigation decision {id} must be a bool, got {}",
                    type_name(&result)
                )));
            }
            MethodResult::Error { code, message, .. } => {
                return Err(Error::protocol_violation(format!(
                    "controller failed navigation decision {id}: {code}: {message}"
                )));
            }
            MethodResult::NotImplemented => {
                return Err(Error::protocol_violation(format!(
                    "controller does not implement navigation decisions ({id})"
                )));
            }
        };

        debug!(
            view_id = %self.view_id,
            request_id = %id,
            url = %pending.request.url,
            allowed,
            "Navigation decided"
        );

        self.advance(frame);
        Ok(allowed.then_some(pending.request))
    }

    /// Denies every in-flight decision whose deadline has passed.
    ///
    /// Returns how many expired.
    pub fn expire(&mut self, now: Instant) -> usize {
        let expired: Vec<FrameId> = self
            .slots
            .iter()
            .filter(|(_, slot)| {
                slot.in_flight
                    .as_ref()
                    .and_then(|p| p.deadline)
                    .is_some_and(|deadline| deadline <= now)
            })
            .map(|(frame, _)| *frame)
            .collect();

        for frame in &expired {
            if let Some(pending) = self.slots.get_mut(frame).and_then(|s| s.in_flight.take()) {
                warn!(
                    view_id = %self.view_id,
                    request_id = %pending.id,
                    url = %pending.request.url,
                    "Navigation decision expired; denying"
                );
            }
            self.advance(*frame);
        }

        expired.len()
    }

    /// Returns the earliest in-flight deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots
            .values()
            .filter_map(|slot| slot.in_flight.as_ref().and_then(|p| p.deadline))
            .min()
    }

    /// Sends the deferred attempt of a now-idle slot, or drops the slot.
    fn advance(&mut self, frame: FrameId) {
        let deferred = self.slots.get_mut(&frame).and_then(|s| s.deferred.take());
        match deferred {
            Some(request) => self.issue(frame, request),
            None => {
                if self.slots.get(&frame).is_some_and(DecisionSlot::is_idle) {
                    self.slots.remove(&frame);
                }
            }
        }
    }

    /// Sends a decision request and marks it in flight.
    fn issue(&mut self, frame: FrameId, request: NavigationRequest) {
        let event = request.to_event().into_event();
        match self.channel.invoke(event) {
            Ok(id) => {
                debug!(
                    view_id = %self.view_id,
                    request_id = %id,
                    url = %request.url,
                    "Navigation request sent"
                );
                let deadline = self.decision_timeout.map(|timeout| Instant::now() + timeout);
                self.slots.entry(frame).or_default().in_flight = Some(PendingDecision {
                    id,
                    request,
                    deadline,
                });

                // The loop may be parked without a deadline.
                if deadline.is_some() && self.loop_tx.send(LoopMessage::DeadlineArmed).is_err() {
                    trace!(view_id = %self.view_id, request_id = %id, "Deadline armed after bridge stopped");
                }
            }
            Err(e) => {
                warn!(
                    view_id = %self.view_id,
                    url = %request.url,
                    error = %e,
                    "Failed to send navigation request; navigation dropped"
                );
                if self.slots.get(&frame).is_some_and(DecisionSlot::is_idle) {
                    self.slots.remove(&frame);
                }
            }
        }
    }
}

impl fmt::Debug for NavigationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationInterceptor")
            .field("view_id", &self.view_id)
            .field("strategy", &self.strategy.name())
            .field("delegate_enabled", &self.delegate_enabled)
            .field("slots", &self.slots)
            .field("decision_timeout", &self.decision_timeout)
            .finish()
    }
}

// ============================================================================
// NavigationGate
// ============================================================================

/// The engine's handle on the interceptor.
///
/// [`decide`](Self::decide) only takes a short lock and never waits on the
/// controller, so it is safe to call from the engine's own thread.
#[derive(Clone)]
pub struct NavigationGate {
    inner: Arc<Mutex<NavigationInterceptor>>,
}

impl NavigationGate {
    pub(crate) fn new(inner: Arc<Mutex<NavigationInterceptor>>) -> Self {
        Self { inner }
    }

    /// Answers the engine for one navigation attempt.
    pub fn decide(&self, attempt: NavigationAttempt) -> NavigationVerdict {
        self.inner.lock().decide(attempt)
    }
}

impl fmt::Debug for NavigationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationGate").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::names;
    use crate::testing::RecordingChannel;

    struct Fixture {
        interceptor: NavigationInterceptor,
        channel: Arc<RecordingChannel>,
        loop_rx: mpsc::UnboundedReceiver<LoopMessage>,
    }

    fn fixture(capabilities: EngineCapabilities, timeout: Option<Duration>) -> Fixture {
        let channel = Arc::new(RecordingChannel::new());
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        let view_id = ViewId::new(1);
        let mut interceptor = NavigationInterceptor::new(
            view_id,
            negotiate(view_id, capabilities),
            channel.clone(),
            loop_tx,
            timeout,
        );
        interceptor.set_delegate_enabled(true);
        Fixture {
            interceptor,
            channel,
            loop_rx,
        }
    }

    fn allow() -> MethodResult {
        MethodResult::success(json!(true))
    }

    fn deny() -> MethodResult {
        MethodResult::success(json!(false))
    }

    #[test]
    fn test_main_frame_emits_one_request_and_cancels() {
        let mut fx = fixture(EngineCapabilities::full(), None);

        let verdict = fx
            .interceptor
            .decide(NavigationAttempt::main_frame("https://example.com/next"));

        assert_eq!(verdict, NavigationVerdict::Cancel);
        let invokes = fx.channel.invokes();
        assert_eq!(invokes.len(), 1);
        assert_eq!(invokes[0].1.name, names::NAVIGATION_REQUEST);
        assert_eq!(invokes[0].1.fields["isMainFrame"], json!(true));
        assert!(fx.channel.events().is_empty());
    }

    #[test]
    fn test_allow_returns_request_once() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        let mut headers = Headers::new();
        headers.insert("Referer".into(), "https://a.example".into());
        fx.interceptor.decide(
            NavigationAttempt::main_frame("https://b.example").with_headers(headers.clone()),
        );
        let id = fx.channel.invokes()[0].0;

        let reissue = fx.interceptor.resolve(id, allow()).expect("resolve");
        let reissue = reissue.expect("allowed");
        assert_eq!(reissue.url, "https://b.example");
        assert_eq!(reissue.reload_headers(), headers);
        assert_eq!(fx.interceptor.in_flight(), 0);
    }

    #[test]
    fn test_deny_returns_nothing() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://b.example"));
        let id = fx.channel.invokes()[0].0;

        assert_eq!(fx.interceptor.resolve(id, deny()).expect("resolve"), None);
    }

    #[test]
    fn test_double_resolution_is_violation() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://b.example"));
        let id = fx.channel.invokes()[0].0;

        fx.interceptor.resolve(id, allow()).expect("first reply");
        let err = fx.interceptor.resolve(id, allow()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_reply_is_violation() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        let err = fx
            .interceptor
            .resolve(RequestId::generate(), allow())
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation { .. }));
    }

    #[test]
    fn test_non_bool_reply_is_violation() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://b.example"));
        let id = fx.channel.invokes()[0].0;

        let err = fx
            .interceptor
            .resolve(id, MethodResult::success(json!("yes")))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_error_reply_is_violation() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://b.example"));
        let id = fx.channel.invokes()[0].0;

        assert!(fx
            .interceptor
            .resolve(id, MethodResult::NotImplemented)
            .unwrap_err()
            .is_fatal());
    }

    #[test]
    fn test_subframe_proceeds_silently() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        let verdict = fx.interceptor.decide(NavigationAttempt::subframe(
            "https://ads.example",
            FrameId::new(2),
        ));
        assert_eq!(verdict, NavigationVerdict::Proceed);
        assert!(fx.channel.frames().is_empty());
    }

    #[test]
    fn test_delegate_disabled_proceeds() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.interceptor.set_delegate_enabled(false);
        let verdict = fx
            .interceptor
            .decide(NavigationAttempt::main_frame("https://example.com"));
        assert_eq!(verdict, NavigationVerdict::Proceed);
        assert!(fx.channel.frames().is_empty());
    }

    #[test]
    fn test_external_schemes_never_emit() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        for url in ["tel:123", "sms:555?body=hi", "mailto:a@b.c", "geo:0,0"] {
            let verdict = fx.interceptor.decide(NavigationAttempt::main_frame(url));
            assert_eq!(verdict, NavigationVerdict::Cancel);
        }
        assert!(fx.channel.frames().is_empty());

        let mut opened = 0;
        while let Ok(LoopMessage::OpenExternal(_)) = fx.loop_rx.try_recv() {
            opened += 1;
        }
        assert_eq!(opened, 4);
    }

    #[test]
    fn test_external_schemes_handled_without_delegate() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.interceptor.set_delegate_enabled(false);
        assert_eq!(
            fx.interceptor.decide(NavigationAttempt::main_frame("TEL:911")),
            NavigationVerdict::Cancel
        );
    }

    #[test]
    fn test_deferred_attempt_waits_and_newest_wins() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://one.example"));
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://two.example"));
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://three.example"));

        // Only the first is in flight.
        let invokes = fx.channel.invokes();
        assert_eq!(invokes.len(), 1);

        fx.interceptor.resolve(invokes[0].0, deny()).expect("resolve");

        let invokes = fx.channel.invokes();
        assert_eq!(invokes.len(), 2);
        assert_eq!(invokes[1].1.fields["url"], json!("https://three.example"));
        assert_eq!(fx.interceptor.in_flight(), 1);
    }

    #[test]
    fn test_legacy_strategy_assumes_main_frame() {
        let mut fx = fixture(EngineCapabilities::legacy(), None);
        assert_eq!(fx.interceptor.strategy_name(), "legacy");

        let mut headers = Headers::new();
        headers.insert("X".into(), "1".into());
        fx.interceptor.decide(
            NavigationAttempt::subframe("https://frame.example", FrameId::new(5))
                .with_headers(headers),
        );

        let invokes = fx.channel.invokes();
        assert_eq!(invokes.len(), 1);
        assert_eq!(invokes[0].1.fields["isMainFrame"], json!(true));
        assert!(!invokes[0].1.fields.contains_key("headers"));
    }

    #[test]
    fn test_invoke_failure_drops_attempt() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.channel.close();
        let verdict = fx
            .interceptor
            .decide(NavigationAttempt::main_frame("https://example.com"));
        assert_eq!(verdict, NavigationVerdict::Cancel);
        assert_eq!(fx.interceptor.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_decision_denied_and_late_reply_violates() {
        let mut fx = fixture(EngineCapabilities::full(), Some(Duration::from_secs(5)));
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://slow.example"));
        let id = fx.channel.invokes()[0].0;

        let deadline = fx.interceptor.next_deadline().expect("deadline");
        assert_eq!(fx.interceptor.expire(deadline - Duration::from_millis(1)), 0);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(fx.interceptor.expire(Instant::now()), 1);
        assert!(fx.interceptor.next_deadline().is_none());

        assert!(fx.interceptor.resolve(id, allow()).unwrap_err().is_fatal());
    }

    #[test]
    fn test_no_deadline_by_default() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://example.com"));
        assert!(fx.interceptor.next_deadline().is_none());
        assert!(fx.loop_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_armed_deadline_wakes_loop() {
        let mut fx = fixture(EngineCapabilities::full(), Some(Duration::from_secs(1)));
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://example.com"));

        assert!(matches!(
            fx.loop_rx.try_recv(),
            Ok(LoopMessage::DeadlineArmed)
        ));
    }

    #[test]
    fn test_disabling_delegate_drops_deferred_attempt() {
        let mut fx = fixture(EngineCapabilities::full(), None);
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://one.example"));
        fx.interceptor
            .decide(NavigationAttempt::main_frame("https://two.example"));
        let id = fx.channel.invokes()[0].0;

        fx.interceptor.set_delegate_enabled(false);
        assert_eq!(fx.interceptor.in_flight(), 1);

        // The in-flight decision still takes its reply; nothing follows it.
        assert_eq!(fx.interceptor.resolve(id, deny()).expect("resolve"), None);
        assert_eq!(fx.channel.invokes().len(), 1);
        assert_eq!(fx.interceptor.in_flight(), 0);
    }
}
