//! External URI schemes handed off to the host.
//!
//! | Scheme | Intent |
//! |--------|--------|
//! | `tel:` | Dial |
//! | `sms:` | Compose (address plus optional `body=`) |
//! | `mailto:`, `geo:`, `market:`, `intent:` | View |
//!
//! Matching is case-insensitive. Any other scheme is left to the engine.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

// ============================================================================
// ExternalIntent
// ============================================================================

/// A URL the host should open outside the web view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalIntent {
    /// Open the dialer.
    Dial {
        /// Original URL.
        url: String,
    },

    /// Compose a text message.
    Sms {
        /// Original URL.
        url: String,
        /// Recipient address.
        address: String,
        /// Pre-filled body.
        body: Option<String>,
    },

    /// Open in whatever application handles the scheme.
    View {
        /// Original URL.
        url: String,
    },
}

impl ExternalIntent {
    /// Classifies a navigation URL.
    ///
    /// Returns `None` when the URL is not one of the external schemes.
    #[must_use]
    pub fn parse(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;

        // Url::parse lowercases the scheme.
        match parsed.scheme() {
            "tel" => Some(Self::Dial {
                url: url.to_string(),
            }),
            "sms" => Some(Self::Sms {
                url: url.to_string(),
                address: decode(parsed.path()),
                body: parsed.query().and_then(sms_body),
            }),
            "mailto" | "geo" | "market" | "intent" => Some(Self::View {
                url: url.to_string(),
            }),
            _ => None,
        }
    }

    /// Returns the original URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Dial { url } | Self::Sms { url, .. } | Self::View { url } => url,
        }
    }

    /// Returns a short name for logging.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Dial { .. } => "dial",
            Self::Sms { .. } => "sms",
            Self::View { .. } => "view",
        }
    }
}

/// Extracts the percent-decoded `body=` value from an SMS query.
fn sms_body(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("body="))
        .map(decode)
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

// ============================================================================
// Tests
// ============================================================================
