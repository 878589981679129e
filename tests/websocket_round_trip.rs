//! End-to-end tests: a controller driving a bridge over a real WebSocket.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_test::{assert_err, assert_ok};
use tracing_subscriber::EnvFilter;

use webview_bridge::bridge::{ChannelPoster, ScriptResponder};
use webview_bridge::engine::{EngineCapabilities, EngineHooks, RenderEngine};
use webview_bridge::protocol::{Headers, names};
use webview_bridge::transport::{Controller, EventListener, PendingServer};
use webview_bridge::{Bridge, Event, NavigationAttempt, NavigationVerdict, Result};

// ============================================================================
// Constants
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Helpers
// ============================================================================

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("webview_bridge=debug"))
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct PageState {
    hooks: Option<EngineHooks>,
    url: Option<String>,
    loads: Vec<String>,
}

/// Engine that only remembers what it loaded.
#[derive(Clone, Default)]
struct PageEngine {
    state: Arc<Mutex<PageState>>,
}

impl PageEngine {
    fn hooks(&self) -> EngineHooks {
        self.state.lock().hooks.clone().expect("engine attached")
    }

    fn loads(&self) -> Vec<String> {
        self.state.lock().loads.clone()
    }

    async fn wait_for_loads(&self, count: usize) -> Vec<String> {
        timeout(WAIT, async {
            loop {
                let loads = self.loads();
                if loads.len() >= count {
                    return loads;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("loads in time")
    }
}

impl RenderEngine for PageEngine {
    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::full()
    }

    fn attach(&mut self, hooks: EngineHooks) {
        self.state.lock().hooks = Some(hooks);
    }

    fn load_url(&mut self, url: &str, _headers: &Headers) -> Result<()> {
        let mut state = self.state.lock();
        state.loads.push(url.to_string());
        state.url = Some(url.to_string());
        Ok(())
    }

    fn load_data(&mut self, _: &str, _: &str, _: &str, base_url: Option<&str>) -> Result<()> {
        self.state.lock().url = base_url.map(str::to_owned);
        Ok(())
    }

    fn can_go_back(&self) -> bool {
        false
    }

    fn can_go_forward(&self) -> bool {
        false
    }

    fn go_back(&mut self) -> Result<()> {
        Ok(())
    }

    fn go_forward(&mut self) -> Result<()> {
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.state.lock().url.clone()
    }

    fn title(&self) -> Option<String> {
        Some("Fixture".to_string())
    }

    fn evaluate_script(&mut self, script: &str, responder: ScriptResponder) {
        responder.succeed(Some(format!("evaluated:{script}")));
    }

    fn set_javascript_enabled(&mut self, _: bool) -> Result<()> {
        Ok(())
    }

    fn set_debugging_enabled(&mut self, _: bool) -> Result<()> {
        Ok(())
    }

    fn set_user_agent(&mut self, _: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn set_dom_storage_enabled(&mut self, _: bool) -> Result<()> {
        Ok(())
    }

    fn set_media_playback_requires_user_gesture(&mut self, _: bool) -> Result<()> {
        Ok(())
    }

    fn add_script_channel(&mut self, _: &str, _: ChannelPoster) -> Result<()> {
        Ok(())
    }

    fn remove_script_channel(&mut self, _: &str) -> Result<()> {
        Ok(())
    }

    fn clear_cache(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Forwards events to the test and blocks any URL containing "blocked".
struct Recorder {
    events: mpsc::UnboundedSender<Event>,
}

#[async_trait]
impl EventListener for Recorder {
    async fn on_event(&self, event: Event) {
        let _ = self.events.send(event);
    }

    async fn on_navigation_request(&self, url: &str, is_main_frame: bool) -> bool {
        is_main_frame && !url.contains("blocked")
    }
}

async fn connect(engine: PageEngine) -> anyhow::Result<(Bridge, Controller)> {
    let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
    let url = server.ws_url();

    let (accepted, controller) = tokio::join!(server.accept(), Controller::connect(&url));
    let (connection, inbound) = accepted?;

    let bridge = Bridge::builder()
        .engine(engine)
        .connection(connection, inbound)
        .build()?;

    Ok((bridge, controller?))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_commands_round_trip() -> anyhow::Result<()> {
    init_logging();
    let engine = PageEngine::default();
    let (bridge, controller) = connect(engine.clone()).await?;

    assert_ok!(
        controller
            .call("loadUrl", json!({ "url": "https://example.com/" }))
            .await
    );
    assert_eq!(engine.loads(), vec!["https://example.com/".to_string()]);

    let url = controller.call("currentUrl", Value::Null).await?;
    assert_eq!(url, json!("https://example.com/"));

    let title = controller.call("getTitle", Value::Null).await?;
    assert_eq!(title, json!("Fixture"));

    let script = controller.call("evaluateScript", json!("1 + 1")).await?;
    assert_eq!(script, json!("evaluated:1 + 1"));

    assert_err!(controller.call("loadUrl", json!({})).await);
    assert_err!(controller.call("takeScreenshot", Value::Null).await);
    assert_eq!(controller.pending_count(), 0);

    controller.shutdown();
    timeout(WAIT, bridge.join()).await??;
    Ok(())
}

#[tokio::test]
async fn test_navigation_decided_by_controller() -> anyhow::Result<()> {
    init_logging();
    let engine = PageEngine::default();
    let (bridge, controller) = connect(engine.clone()).await?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    controller.set_listener(Arc::new(Recorder { events: events_tx }));
    controller
        .call("updateSettings", json!({ "hasNavigationDelegate": true }))
        .await?;

    let gate = engine.hooks().gate;
    let verdict = gate.decide(NavigationAttempt::main_frame("https://example.com/blocked"));
    assert_eq!(verdict, NavigationVerdict::Cancel);
    let verdict = gate.decide(NavigationAttempt::main_frame("https://example.com/next"));
    assert_eq!(verdict, NavigationVerdict::Cancel);

    let loads = engine.wait_for_loads(1).await;
    assert_eq!(loads, vec!["https://example.com/next".to_string()]);

    engine.hooks().events.page_finished("https://example.com/next");
    let event = timeout(WAIT, events_rx.recv()).await?.expect("event");
    assert_eq!(event.name, names::PAGE_FINISHED);
    assert_eq!(event.get_string("url"), "https://example.com/next");

    // The denied navigation never reached the engine.
    assert_eq!(engine.loads().len(), 1);

    bridge.shutdown();
    timeout(WAIT, bridge.join()).await??;
    Ok(())
}

#[tokio::test]
async fn test_controller_disconnect_stops_bridge() -> anyhow::Result<()> {
    init_logging();
    let (bridge, controller) = connect(PageEngine::default()).await?;

    controller.shutdown();
    timeout(WAIT, bridge.join()).await??;
    Ok(())
}
