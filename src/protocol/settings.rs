//! WebView settings batches.
//!
//! A batch is parsed completely before any of it is applied, so a single
//! unknown key or ill-typed value rejects the whole batch.
//!
//! | Key | Value | Effect |
//! |-----|-------|--------|
//! | `jsMode` | `0`/`"disabled"`, `1`/`"unrestricted"` | Script execution |
//! | `hasNavigationDelegate` | bool | Navigation decisions by the controller |
//! | `debuggingEnabled` | bool | Debug instrumentation |
//! | `customUserAgent` | string or null | Custom user agent (null = engine default) |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::command::type_name;

// ============================================================================
// Keys
// ============================================================================

/// Script execution mode key.
pub const KEY_JS_MODE: &str = "jsMode";

/// Navigation delegate key.
pub const KEY_NAVIGATION_DELEGATE: &str = "hasNavigationDelegate";

/// Debug instrumentation key.
pub const KEY_DEBUGGING: &str = "debuggingEnabled";

/// Custom user agent key.
pub const KEY_USER_AGENT: &str = "customUserAgent";

// ============================================================================
// JsMode
// ============================================================================

/// Script execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsMode {
    /// Scripts disabled.
    Disabled,
    /// Scripts enabled without restriction.
    Unrestricted,
}

impl JsMode {
    /// Returns `true` if scripts may run.
    #[inline]
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(Self::Disabled),
                Some(1) => Ok(Self::Unrestricted),
                _ => Err(Error::invalid_argument(
                    KEY_JS_MODE,
                    format!("unknown JavaScript mode: {n}"),
                )),
            },
            Value::String(s) => match s.as_str() {
                "disabled" => Ok(Self::Disabled),
                "unrestricted" => Ok(Self::Unrestricted),
                other => Err(Error::invalid_argument(
                    KEY_JS_MODE,
                    format!("unknown JavaScript mode: {other}"),
                )),
            },
            other => Err(Error::invalid_argument(
                KEY_JS_MODE,
                format!("expected a number or string, got {}", type_name(other)),
            )),
        }
    }

    fn to_value(self) -> Value {
        match self {
            Self::Disabled => Value::from(0),
            Self::Unrestricted => Value::from(1),
        }
    }
}

// ============================================================================
// SettingChange
// ============================================================================

/// One recognized setting and its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    /// Enable or disable script execution.
    JsMode(JsMode),
    /// Install or remove the controller's navigation delegate.
    NavigationDelegate(bool),
    /// Toggle debug instrumentation.
    Debugging(bool),
    /// Set the user agent; `None` restores the engine default.
    UserAgent(Option<String>),
}

impl SettingChange {
    /// Returns the wire key.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::JsMode(_) => KEY_JS_MODE,
            Self::NavigationDelegate(_) => KEY_NAVIGATION_DELEGATE,
            Self::Debugging(_) => KEY_DEBUGGING,
            Self::UserAgent(_) => KEY_USER_AGENT,
        }
    }

    fn parse(key: &str, value: &Value) -> Result<Self> {
        match key {
            KEY_JS_MODE => JsMode::parse(value).map(Self::JsMode),
            KEY_NAVIGATION_DELEGATE => expect_bool(key, value).map(Self::NavigationDelegate),
            KEY_DEBUGGING => expect_bool(key, value).map(Self::Debugging),
            KEY_USER_AGENT => match value {
                Value::Null => Ok(Self::UserAgent(None)),
                Value::String(s) => Ok(Self::UserAgent(Some(s.clone()))),
                other => Err(Error::invalid_argument(
                    key,
                    format!("expected a string or null, got {}", type_name(other)),
                )),
            },
            unknown => Err(Error::invalid_argument(unknown, "unknown WebView setting")),
        }
    }

    fn value(&self) -> Value {
        match self {
            Self::JsMode(mode) => mode.to_value(),
            Self::NavigationDelegate(enabled) | Self::Debugging(enabled) => Value::Bool(*enabled),
            Self::UserAgent(agent) => agent.clone().map_or(Value::Null, Value::String),
        }
    }
}

fn expect_bool(key: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| {
        Error::invalid_argument(key, format!("expected a bool, got {}", type_name(value)))
    })
}

// ============================================================================
// SettingsUpdate
// ============================================================================

/// A fully validated settings batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    changes: Vec<SettingChange>,
}

impl SettingsUpdate {
    /// Creates an empty batch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a settings map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] naming the first unknown key or
    /// ill-typed value. No partial batch is ever returned.
    pub fn parse(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::invalid_argument(
                "settings",
                format!("expected a map, got {}", type_name(value)),
            ));
        };

        let changes = map
            .iter()
            .map(|(key, value)| SettingChange::parse(key, value))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { changes })
    }

    /// Adds a change, replacing any earlier change for the same key.
    #[must_use]
    pub fn with(mut self, change: SettingChange) -> Self {
        self.changes.retain(|existing| existing.key() != change.key());
        self.changes.push(change);
        self
    }

    /// Sets the script execution mode.
    #[inline]
    #[must_use]
    pub fn with_js_mode(self, mode: JsMode) -> Self {
        self.with(SettingChange::JsMode(mode))
    }

    /// Enables or disables the navigation delegate.
    #[inline]
    #[must_use]
    pub fn with_navigation_delegate(self, enabled: bool) -> Self {
        self.with(SettingChange::NavigationDelegate(enabled))
    }

    /// Enables or disables debug instrumentation.
    #[inline]
    #[must_use]
    pub fn with_debugging(self, enabled: bool) -> Self {
        self.with(SettingChange::Debugging(enabled))
    }

    /// Sets the user agent.
    #[inline]
    #[must_use]
    pub fn with_user_agent(self, agent: Option<String>) -> Self {
        self.with(SettingChange::UserAgent(agent))
    }

    /// Returns the changes in application order.
    #[inline]
    #[must_use]
    pub fn changes(&self) -> &[SettingChange] {
        &self.changes
    }

    /// Returns `true` if the batch changes nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Converts the batch back into a settings map.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .changes
            .iter()
            .map(|change| (change.key().to_string(), change.value()))
            .collect();
        Value::Object(map)
    }
}

// ============================================================================
// Tests
// ============================================================================
