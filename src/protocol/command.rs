//! Command definitions and argument validation.
//!
//! A controller sends a [`MethodCall`] (method name plus opaque JSON
//! arguments). [`BridgeCommand::parse`] validates it into a typed command
//! before anything touches the engine.
//!
//! # Commands
//!
//! | Method | Arguments | Result |
//! |--------|-----------|--------|
//! | `loadUrl` | `{url, headers?}` | null |
//! | `loadFile` | `{path, headers?}` | null |
//! | `loadData` | `{data, mimeType, encoding, baseUrl?}` | null |
//! | `updateSettings` | settings map | null |
//! | `canGoBack` / `canGoForward` | - | bool |
//! | `goBack` / `goForward` / `reload` | - | null |
//! | `currentUrl` / `getTitle` | - | string or null |
//! | `evaluateScript` | script string | string or null |
//! | `addNamedChannels` / `removeNamedChannels` | `[name]` | null |
//! | `clearCache` | - | null |

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

use super::settings::SettingsUpdate;

// ============================================================================
// Types
// ============================================================================

/// HTTP headers attached to a load. Ordered for deterministic output.
pub type Headers = BTreeMap<String, String>;

// ============================================================================
// Method Names
// ============================================================================

/// Wire method names.
pub mod methods {
    /// Load a URL.
    pub const LOAD_URL: &str = "loadUrl";
    /// Load a local file or bundled asset.
    pub const LOAD_FILE: &str = "loadFile";
    /// Load inline data.
    pub const LOAD_DATA: &str = "loadData";
    /// Apply a settings batch.
    pub const UPDATE_SETTINGS: &str = "updateSettings";
    /// Query back history.
    pub const CAN_GO_BACK: &str = "canGoBack";
    /// Query forward history.
    pub const CAN_GO_FORWARD: &str = "canGoForward";
    /// Navigate back.
    pub const GO_BACK: &str = "goBack";
    /// Navigate forward.
    pub const GO_FORWARD: &str = "goForward";
    /// Reload the page.
    pub const RELOAD: &str = "reload";
    /// Query the current URL.
    pub const CURRENT_URL: &str = "currentUrl";
    /// Query the page title.
    pub const GET_TITLE: &str = "getTitle";
    /// Evaluate a script.
    pub const EVALUATE_SCRIPT: &str = "evaluateScript";
    /// Register named channels.
    pub const ADD_NAMED_CHANNELS: &str = "addNamedChannels";
    /// Unregister named channels.
    pub const REMOVE_NAMED_CHANNELS: &str = "removeNamedChannels";
    /// Clear cache and web storage.
    pub const CLEAR_CACHE: &str = "clearCache";

    /// Every recognized method.
    pub const ALL: &[&str] = &[
        LOAD_URL,
        LOAD_FILE,
        LOAD_DATA,
        UPDATE_SETTINGS,
        CAN_GO_BACK,
        CAN_GO_FORWARD,
        GO_BACK,
        GO_FORWARD,
        RELOAD,
        CURRENT_URL,
        GET_TITLE,
        EVALUATE_SCRIPT,
        ADD_NAMED_CHANNELS,
        REMOVE_NAMED_CHANNELS,
        CLEAR_CACHE,
    ];
}

// ============================================================================
// MethodCall
// ============================================================================

/// A raw command from the controller.
///
/// # Format
///
/// ```json
/// { "method": "loadUrl", "arguments": { "url": "https://example.com" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Command name.
    pub method: String,

    /// Opaque payload.
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    /// Creates a new method call.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Creates a method call without arguments.
    #[inline]
    #[must_use]
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Returns a validating view over the arguments.
    #[inline]
    #[must_use]
    pub fn arguments(&self) -> Arguments<'_> {
        Arguments(&self.arguments)
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Validating accessors over a command payload.
///
/// Every failure names the offending field.
#[derive(Debug, Clone, Copy)]
pub struct Arguments<'a>(&'a Value);

impl<'a> Arguments<'a> {
    /// Returns the raw payload.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &'a Value {
        self.0
    }

    /// Looks up a field, treating `null` as absent.
    fn get(&self, field: &str) -> Result<Option<&'a Value>> {
        match self.0 {
            Value::Object(map) => Ok(map.get(field).filter(|v| !v.is_null())),
            Value::Null => Ok(None),
            _ => Err(Error::invalid_argument(
                field,
                "arguments must be a map",
            )),
        }
    }

    /// Returns a required string field.
    pub fn required_str(&self, field: &str) -> Result<&'a str> {
        self.optional_str(field)?
            .ok_or_else(|| Error::missing_argument(field))
    }

    /// Returns an optional string field.
    pub fn optional_str(&self, field: &str) -> Result<Option<&'a str>> {
        match self.get(field)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(Error::invalid_argument(
                field,
                format!("expected a string, got {}", type_name(other)),
            )),
        }
    }

    /// Returns a string-to-string map field, empty when absent.
    pub fn headers(&self, field: &str) -> Result<Headers> {
        match self.get(field)? {
            None => Ok(Headers::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, value)| match value {
                    Value::String(v) => Ok((name.clone(), v.clone())),
                    other => Err(Error::invalid_argument(
                        field,
                        format!("header `{name}` must be a string, got {}", type_name(other)),
                    )),
                })
                .collect(),
            Some(other) => Err(Error::invalid_argument(
                field,
                format!("expected a map, got {}", type_name(other)),
            )),
        }
    }

    /// Interprets the whole payload as a list of strings.
    pub fn string_list(&self, field: &str) -> Result<Vec<String>> {
        match self.0 {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_owned).ok_or_else(|| {
                        Error::invalid_argument(
                            field,
                            format!("list entries must be strings, got {}", type_name(item)),
                        )
                    })
                })
                .collect(),
            Value::Null => Err(Error::missing_argument(field)),
            other => Err(Error::invalid_argument(
                field,
                format!("expected a list, got {}", type_name(other)),
            )),
        }
    }
}

/// Returns a short JSON type name for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

// ============================================================================
// BridgeCommand
// ============================================================================

/// A validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    /// Load a URL with optional extra headers.
    LoadUrl {
        /// Target URL.
        url: String,
        /// Extra request headers.
        headers: Headers,
    },

    /// Load a local file or bundled asset.
    LoadFile {
        /// Absolute path, or path relative to the asset root.
        path: String,
        /// Extra request headers.
        headers: Headers,
    },

    /// Load inline content.
    LoadData {
        /// Content.
        data: String,
        /// MIME type, e.g. `text/html`.
        mime_type: String,
        /// Encoding, e.g. `UTF-8` or `base64`.
        encoding: String,
        /// Base URL for relative references.
        base_url: Option<String>,
    },

    /// Apply a settings batch.
    UpdateSettings(SettingsUpdate),

    /// Query back history.
    CanGoBack,

    /// Query forward history.
    CanGoForward,

    /// Navigate back if possible.
    GoBack,

    /// Navigate forward if possible.
    GoForward,

    /// Reload the page.
    Reload,

    /// Query the current URL.
    CurrentUrl,

    /// Query the page title.
    GetTitle,

    /// Evaluate a script asynchronously.
    EvaluateScript {
        /// Script source.
        script: String,
    },

    /// Register named channels.
    AddNamedChannels(Vec<String>),

    /// Unregister named channels.
    RemoveNamedChannels(Vec<String>),

    /// Clear HTTP cache and web storage.
    ClearCache,
}

impl BridgeCommand {
    /// Validates a raw call into a typed command.
    ///
    /// # Errors
    ///
    /// - [`Error::Unimplemented`] for an unknown method
    /// - [`Error::InvalidArgument`] for missing or malformed arguments
    pub fn parse(call: &MethodCall) -> Result<Self> {
        let args = call.arguments();

        let command = match call.method.as_str() {
            methods::LOAD_URL => Self::LoadUrl {
                url: args.required_str("url")?.to_owned(),
                headers: args.headers("headers")?,
            },

            methods::LOAD_FILE => Self::LoadFile {
                path: args.required_str("path")?.to_owned(),
                headers: args.headers("headers")?,
            },

            methods::LOAD_DATA => Self::LoadData {
                data: args.required_str("data")?.to_owned(),
                mime_type: args.required_str("mimeType")?.to_owned(),
                encoding: args.required_str("encoding")?.to_owned(),
                base_url: args.optional_str("baseUrl")?.map(str::to_owned),
            },

            methods::UPDATE_SETTINGS => Self::UpdateSettings(SettingsUpdate::parse(args.raw())?),
            methods::CAN_GO_BACK => Self::CanGoBack,
            methods::CAN_GO_FORWARD => Self::CanGoForward,
            methods::GO_BACK => Self::GoBack,
            methods::GO_FORWARD => Self::GoForward,
            methods::RELOAD => Self::Reload,
            methods::CURRENT_URL => Self::CurrentUrl,
            methods::GET_TITLE => Self::GetTitle,

            methods::EVALUATE_SCRIPT => {
                // Bare string is the canonical form; `{script}` is accepted too.
                let script = match args.raw() {
                    Value::String(s) => s.clone(),
                    Value::Object(_) => args.required_str("script")?.to_owned(),
                    Value::Null => return Err(Error::missing_argument("script")),
                    other => {
                        return Err(Error::invalid_argument(
                            "script",
                            format!("expected a string, got {}", type_name(other)),
                        ));
                    }
                };
                Self::EvaluateScript { script }
            }

            methods::ADD_NAMED_CHANNELS => {
                Self::AddNamedChannels(args.string_list("channelNames")?)
            }
            methods::REMOVE_NAMED_CHANNELS => {
                Self::RemoveNamedChannels(args.string_list("channelNames")?)
            }
            methods::CLEAR_CACHE => Self::ClearCache,

            other => return Err(Error::unimplemented(other)),
        };

        Ok(command)
    }

    /// Returns the wire method name.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::LoadUrl { .. } => methods::LOAD_URL,
            Self::LoadFile { .. } => methods::LOAD_FILE,
            Self::LoadData { .. } => methods::LOAD_DATA,
            Self::UpdateSettings(_) => methods::UPDATE_SETTINGS,
            Self::CanGoBack => methods::CAN_GO_BACK,
            Self::CanGoForward => methods::CAN_GO_FORWARD,
            Self::GoBack => methods::GO_BACK,
            Self::GoForward => methods::GO_FORWARD,
            Self::Reload => methods::RELOAD,
            Self::CurrentUrl => methods::CURRENT_URL,
            Self::GetTitle => methods::GET_TITLE,
            Self::EvaluateScript { .. } => methods::EVALUATE_SCRIPT,
            Self::AddNamedChannels(_) => methods::ADD_NAMED_CHANNELS,
            Self::RemoveNamedChannels(_) => methods::REMOVE_NAMED_CHANNELS,
            Self::ClearCache => methods::CLEAR_CACHE,
        }
    }

    /// Returns `true` for side-effect-free state queries.
    #[inline]
    #[must_use]
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::CanGoBack | Self::CanGoForward | Self::CurrentUrl | Self::GetTitle
        )
    }

    /// Converts the command back into a raw call.
    #[must_use]
    pub fn into_call(self) -> MethodCall {
        let method = self.method();
        let arguments = match self {
            Self::LoadUrl { url, headers } => json!({ "url": url, "headers": headers }),
            Self::LoadFile { path, headers } => json!({ "path": path, "headers": headers }),
            Self::LoadData {
                data,
                mime_type,
                encoding,
                base_url,
            } => {
                let mut map = Map::new();
                map.insert("data".into(), Value::String(data));
                map.insert("mimeType".into(), Value::String(mime_type));
                map.insert("encoding".into(), Value::String(encoding));
                if let Some(base_url) = base_url {
                    map.insert("baseUrl".into(), Value::String(base_url));
                }
                Value::Object(map)
            }
            Self::UpdateSettings(update) => update.to_value(),
            Self::EvaluateScript { script } => Value::String(script),
            Self::AddNamedChannels(names) | Self::RemoveNamedChannels(names) => json!(names),
            Self::CanGoBack
            | Self::CanGoForward
            | Self::GoBack
            | Self::GoForward
            | Self::Reload
            | Self::CurrentUrl
            | Self::GetTitle
            | Self::ClearCache => Value::Null,
        };
        MethodCall::new(method, arguments)
    }
}

// ============================================================================
// Tests
// ============================================================================
