//! Event message types.
//!
//! Events are notifications sent from the bridge to the controller when
//! engine activity occurs. [`BridgeEvent`] is the typed form produced by the
//! bridge; [`Event`] is the channel-agnostic `{name, fields}` form that
//! crosses the transport.
//!
//! # Event Types
//!
//! | Name | Fields | Reply |
//! |------|--------|-------|
//! | `onProgressChanged` | `progress` | - |
//! | `onConsoleMessage` | `sourceURL`, `lineNumber`, `message`, `messageLevel` | - |
//! | `onPageFinished` | `url` | - |
//! | `onLoadError` | `url`, `code`, `message` | - |
//! | `onHttpError` | `url`, `statusCode`, `message` | - |
//! | `navigationRequest` | `url`, `isMainFrame`, `headers?` | bool |
//! | `onChannelMessage` | `channel`, `message` | - |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::command::Headers;

// ============================================================================
// Event Names
// ============================================================================

/// Wire event names.
pub mod names {
    /// Load progress.
    pub const PROGRESS_CHANGED: &str = "onProgressChanged";
    /// Console output.
    pub const CONSOLE_MESSAGE: &str = "onConsoleMessage";
    /// Page load completed.
    pub const PAGE_FINISHED: &str = "onPageFinished";
    /// Main-frame load failure, including TLS failures.
    pub const LOAD_ERROR: &str = "onLoadError";
    /// Main-frame HTTP error status.
    pub const HTTP_ERROR: &str = "onHttpError";
    /// Navigation awaiting a decision.
    pub const NAVIGATION_REQUEST: &str = "navigationRequest";
    /// Message posted by page script on a named channel.
    pub const CHANNEL_MESSAGE: &str = "onChannelMessage";
}

// ============================================================================
// Event
// ============================================================================

/// A channel-agnostic event.
///
/// # Format
///
/// ```json
/// { "name": "onPageFinished", "fields": { "url": "https://example.com" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name.
    pub name: String,

    /// Event fields.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Event {
    /// Creates an event with no fields.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }

    /// Adds a field.
    #[inline]
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Gets a string field, empty if missing.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.fields
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets an integer field, 0 if missing.
    #[inline]
    #[must_use]
    pub fn get_i64(&self, key: &str) -> i64 {
        self.fields
            .get(key)
            .and_then(|v| v.as_i64())
            .unwrap_or_default()
    }

    /// Gets a boolean field, false if missing.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or_default()
    }

    /// Parses the event into its typed form.
    ///
    /// Returns `None` for unknown event names.
    #[must_use]
    pub fn parse(&self) -> Option<BridgeEvent> {
        BridgeEvent::from_event(self)
    }
}

// ============================================================================
// ConsoleLevel
// ============================================================================

/// Severity of a console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsoleLevel {
    /// Hint or tip.
    Tip,
    /// Plain log output.
    Log,
    /// Warning.
    Warning,
    /// Error.
    Error,
    /// Debug output.
    Debug,
}

impl ConsoleLevel {
    /// Returns the wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tip => "TIP",
            Self::Log => "LOG",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
        }
    }

    /// Parses a wire string, falling back to [`ConsoleLevel::Log`].
    #[must_use]
    pub fn from_wire(s: &str) -> Self {
        match s {
            "TIP" => Self::Tip,
            "WARNING" => Self::Warning,
            "ERROR" => Self::Error,
            "DEBUG" => Self::Debug,
            _ => Self::Log,
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// BridgeEvent
// ============================================================================

/// Typed events produced by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// Load progress, 0-100.
    ProgressChanged {
        /// Percentage.
        progress: u8,
    },

    /// Console output from page script.
    ConsoleMessage {
        /// Script source URL.
        source_url: String,
        /// Line number.
        line_number: u32,
        /// Message text.
        message: String,
        /// Severity.
        level: ConsoleLevel,
    },

    /// Page finished loading.
    PageFinished {
        /// Page URL.
        url: String,
    },

    /// Main-frame load failure.
    LoadError {
        /// Failing URL.
        url: String,
        /// Engine error code.
        code: i32,
        /// Human-readable description.
        message: String,
    },

    /// Main-frame HTTP error status.
    HttpError {
        /// Failing URL.
        url: String,
        /// HTTP status code.
        status_code: u16,
        /// Reason phrase.
        message: String,
    },

    /// Navigation awaiting the controller's decision.
    NavigationRequest {
        /// Target URL.
        url: String,
        /// Whether the main frame is targeted.
        is_main_frame: bool,
        /// Request headers, when the engine exposes them.
        headers: Option<Headers>,
    },

    /// Message posted on a named channel.
    ChannelMessage {
        /// Channel name.
        channel: String,
        /// Payload.
        message: String,
    },
}

impl BridgeEvent {
    /// Returns the wire event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProgressChanged { .. } => names::PROGRESS_CHANGED,
            Self::ConsoleMessage { .. } => names::CONSOLE_MESSAGE,
            Self::PageFinished { .. } => names::PAGE_FINISHED,
            Self::LoadError { .. } => names::LOAD_ERROR,
            Self::HttpError { .. } => names::HTTP_ERROR,
            Self::NavigationRequest { .. } => names::NAVIGATION_REQUEST,
            Self::ChannelMessage { .. } => names::CHANNEL_MESSAGE,
        }
    }

    /// Returns `true` if the controller must reply to this event.
    #[inline]
    #[must_use]
    pub fn expects_reply(&self) -> bool {
        matches!(self, Self::NavigationRequest { .. })
    }

    /// Converts into the channel-agnostic form.
    #[must_use]
    pub fn into_event(self) -> Event {
        let event = Event::new(self.name());
        match self {
            Self::ProgressChanged { progress } => event.with("progress", progress),
            Self::ConsoleMessage {
                source_url,
                line_number,
                message,
                level,
            } => event
                .with("sourceURL", source_url)
                .with("lineNumber", line_number)
                .with("message", message)
                .with("messageLevel", level.as_str()),
            Self::PageFinished { url } => event.with("url", url),
            Self::LoadError { url, code, message } => event
                .with("url", url)
                .with("code", code)
                .with("message", message),
            Self::HttpError {
                url,
                status_code,
                message,
            } => event
                .with("url", url)
                .with("statusCode", status_code)
                .with("message", message),
            Self::NavigationRequest {
                url,
                is_main_frame,
                headers,
            } => {
                let event = event.with("url", url).with("isMainFrame", is_main_frame);
                match headers {
                    Some(headers) => {
                        let map: Map<String, Value> = headers
                            .into_iter()
                            .map(|(k, v)| (k, Value::String(v)))
                            .collect();
                        event.with("headers", map)
                    }
                    None => event,
                }
            }
            Self::ChannelMessage { channel, message } => {
                event.with("channel", channel).with("message", message)
            }
        }
    }

    /// Parses a channel-agnostic event.
    #[must_use]
    pub fn from_event(event: &Event) -> Option<Self> {
        let parsed = match event.name.as_str() {
            names::PROGRESS_CHANGED => Self::ProgressChanged {
                progress: event.get_i64("progress").clamp(0, 100) as u8,
            },
            names::CONSOLE_MESSAGE => Self::ConsoleMessage {
                source_url: event.get_string("sourceURL"),
                line_number: event.get_i64("lineNumber").max(0) as u32,
                message: event.get_string("message"),
                level: ConsoleLevel::from_wire(&event.get_string("messageLevel")),
            },
            names::PAGE_FINISHED => Self::PageFinished {
                url: event.get_string("url"),
            },
            names::LOAD_ERROR => Self::LoadError {
                url: event.get_string("url"),
                code: event.get_i64("code") as i32,
                message: event.get_string("message"),
            },
            names::HTTP_ERROR => Self::HttpError {
                url: event.get_string("url"),
                status_code: event.get_i64("statusCode") as u16,
                message: event.get_string("message"),
            },
            names::NAVIGATION_REQUEST => Self::NavigationRequest {
                url: event.get_string("url"),
                is_main_frame: event.get_bool("isMainFrame"),
                headers: event.fields.get("headers").and_then(Value::as_object).map(|map| {
                    map.iter()
                        .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                        .collect()
                }),
            },
            names::CHANNEL_MESSAGE => Self::ChannelMessage {
                channel: event.get_string("channel"),
                message: event.get_string("message"),
            },
            _ => return None,
        };
        Some(parsed)
    }
}

impl From<BridgeEvent> for Event {
    fn from(event: BridgeEvent) -> Self {
        event.into_event()
    }
}

// ============================================================================
// Tests
// ============================================================================
