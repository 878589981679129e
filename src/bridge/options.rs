//! Bridge configuration and creation parameters.
//!
//! [`CreationParams`] is the map the host passes when a view is created.
//! [`BridgeOptions`] adds the bridge-local knobs that never cross the wire.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use webview_bridge::{BridgeOptions, CreationParams};
//!
//! let params: CreationParams = serde_json::from_value(serde_json::json!({
//!     "settings": { "jsMode": 1, "hasNavigationDelegate": true },
//!     "namedChannelNames": ["Print"],
//!     "initialUrl": "https://example.com",
//!     "autoMediaPlaybackPolicy": 1
//! }))?;
//!
//! let options = BridgeOptions::new()
//!     .with_asset_root("./assets")
//!     .with_decision_timeout(Duration::from_secs(10))
//!     .with_creation_params(params);
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::ViewId;
use crate::protocol::SettingsUpdate;

use super::channels::ChannelRegistry;

// ============================================================================
// AutoMediaPlaybackPolicy
// ============================================================================

/// Whether media may start playing without a user gesture.
///
/// Encoded on the wire as its index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AutoMediaPlaybackPolicy {
    /// Every media type needs a user gesture. Index `0`.
    #[default]
    RequireUserGesture,
    /// Media may autoplay. Index `1`.
    AlwaysAllow,
}

impl AutoMediaPlaybackPolicy {
    /// Returns `true` if playback needs a user gesture.
    #[inline]
    #[must_use]
    pub const fn requires_user_gesture(self) -> bool {
        !matches!(self, Self::AlwaysAllow)
    }
}

impl TryFrom<u8> for AutoMediaPlaybackPolicy {
    type Error = String;

    fn try_from(index: u8) -> std::result::Result<Self, Self::Error> {
        match index {
            0 => Ok(Self::RequireUserGesture),
            1 => Ok(Self::AlwaysAllow),
            other => Err(format!("unknown media playback policy index: {other}")),
        }
    }
}

impl From<AutoMediaPlaybackPolicy> for u8 {
    fn from(policy: AutoMediaPlaybackPolicy) -> Self {
        match policy {
            AutoMediaPlaybackPolicy::RequireUserGesture => 0,
            AutoMediaPlaybackPolicy::AlwaysAllow => 1,
        }
    }
}

// ============================================================================
// InitialData
// ============================================================================

/// Inline content to show when the view is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    /// Content.
    pub data: String,
    /// MIME type.
    pub mime_type: String,
    /// Encoding.
    pub encoding: String,
    /// Base URL for relative references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// The page loaded at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialLoad {
    /// Inline content.
    Data(InitialData),
    /// Local file or bundled asset.
    File(String),
    /// Remote URL.
    Url(String),
}

// ============================================================================
// CreationParams
// ============================================================================

/// Parameters supplied when a view is created.
///
/// # Format
///
/// ```json
/// {
///   "settings": { "jsMode": 1 },
///   "namedChannelNames": ["Print"],
///   "initialUrl": "https://example.com",
///   "initialFile": null,
///   "initialData": null,
///   "autoMediaPlaybackPolicy": 0
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreationParams {
    /// Initial settings batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    /// Channels to register before the first load.
    pub named_channel_names: Vec<String>,
    /// URL to load first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_url: Option<String>,
    /// File to load first; wins over `initialUrl`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_file: Option<String>,
    /// Content to load first; wins over everything else.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<InitialData>,
    /// Media autoplay policy.
    pub auto_media_playback_policy: AutoMediaPlaybackPolicy,
}

impl CreationParams {
    /// Parses a creation map.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the map does not have the expected shape.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| Error::config(format!("invalid creation parameters: {e}")))
    }

    /// Parses the initial settings batch.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] naming the rejected setting.
    pub fn settings_update(&self) -> Result<SettingsUpdate> {
        match &self.settings {
            None | Some(Value::Null) => Ok(SettingsUpdate::new()),
            Some(settings) => SettingsUpdate::parse(settings)
                .map_err(|e| Error::config(format!("invalid initial settings: {e}"))),
        }
    }

    /// Returns the page to load first: data, then file, then URL.
    #[must_use]
    pub fn initial_load(&self) -> Option<InitialLoad> {
        if let Some(data) = &self.initial_data {
            return Some(InitialLoad::Data(data.clone()));
        }
        if let Some(file) = &self.initial_file {
            return Some(InitialLoad::File(file.clone()));
        }
        self.initial_url.clone().map(InitialLoad::Url)
    }

    /// Validates settings and channel names.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        self.settings_update()?;
        ChannelRegistry::validate(&self.named_channel_names)
            .map_err(|e| Error::config(format!("invalid initial channels: {e}")))
    }
}

// ============================================================================
// BridgeOptions
// ============================================================================

/// Bridge configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeOptions {
    /// View this bridge serves.
    pub view_id: ViewId,

    /// Root for relative `loadFile` paths.
    pub asset_root: Option<PathBuf>,

    /// Deadline for navigation decisions. `None` waits forever.
    pub decision_timeout: Option<Duration>,

    /// Creation parameters.
    pub creation: CreationParams,
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Creates default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the view ID.
    #[inline]
    #[must_use]
    pub fn with_view_id(mut self, view_id: ViewId) -> Self {
        self.view_id = view_id;
        self
    }

    /// Sets the asset root.
    #[inline]
    #[must_use]
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    /// Sets a deadline for navigation decisions.
    ///
    /// An expired decision denies the navigation; a later reply for it is a
    /// protocol violation.
    #[inline]
    #[must_use]
    pub fn with_decision_timeout(mut self, timeout: Duration) -> Self {
        self.decision_timeout = Some(timeout);
        self
    }

    /// Sets the creation parameters.
    #[inline]
    #[must_use]
    pub fn with_creation_params(mut self, creation: CreationParams) -> Self {
        self.creation = creation;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.decision_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("Decision timeout must be greater than zero"));
        }
        if let Some(root) = &self.asset_root
            && !root.is_dir()
        {
            return Err(Error::config(format!(
                "Asset root is not a directory: {}",
                root.display()
            )));
        }
        self.creation.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_creation_params_from_wire() {
        let params = CreationParams::from_value(json!({
            "settings": { "jsMode": 1 },
            "namedChannelNames": ["Print"],
            "initialUrl": "https://example.com",
            "autoMediaPlaybackPolicy": 1
        }))
        .expect("parse");

        assert_eq!(params.named_channel_names, vec!["Print".to_string()]);
        assert_eq!(params.initial_url.as_deref(), Some("https://example.com"));
        assert!(!params.auto_media_playback_policy.requires_user_gesture());
        assert_eq!(params.settings_update().expect("settings").changes().len(), 1);
    }

    #[test]
    fn test_missing_fields_default() {
        let params = CreationParams::from_value(json!({})).expect("parse");
        assert_eq!(params, CreationParams::default());
        assert!(params.auto_media_playback_policy.requires_user_gesture());
        assert!(params.initial_load().is_none());
    }

    #[test]
    fn test_unknown_media_policy_rejected() {
        let err = CreationParams::from_value(json!({ "autoMediaPlaybackPolicy": 7 })).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_initial_load_priority() {
        let mut params = CreationParams {
            initial_url: Some("https://example.com".into()),
            initial_file: Some("index.html".into()),
            ..Default::default()
        };
        assert_eq!(params.initial_load(), Some(InitialLoad::File("index.html".into())));

        params.initial_data = Some(InitialData {
            data: "<p>hi</p>".into(),
            mime_type: "text/html".into(),
            encoding: "UTF-8".into(),
            base_url: None,
        });
        assert!(matches!(params.initial_load(), Some(InitialLoad::Data(_))));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let params = CreationParams {
            settings: Some(json!({ "zoom": true })),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_channel() {
        let params = CreationParams {
            named_channel_names: vec!["has space".into()],
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_options_builder_chain() {
        let options = BridgeOptions::new()
            .with_view_id(ViewId::new(3))
            .with_decision_timeout(Duration::from_secs(2));
        assert_eq!(options.view_id, ViewId::new(3));
        assert_eq!(options.decision_timeout, Some(Duration::from_secs(2)));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let options = BridgeOptions::new().with_decision_timeout(Duration::ZERO);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_missing_asset_root_rejected() {
        let options = BridgeOptions::new().with_asset_root("/nonexistent/assets/dir");
        assert!(options.validate().is_err());
    }
}
