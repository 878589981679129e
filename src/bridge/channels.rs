//! Named channel registry.
//!
//! A named channel is an object exposed to page script under a fixed name.
//! Page script calls `Name.postMessage(text)`; the engine forwards that to the
//! channel's [`ChannelPoster`], which queues it on the bridge loop. The loop
//! emits `onChannelMessage` only if the channel is still registered.

// ============================================================================
// Imports
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashSet;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::engine::RenderEngine;
use crate::error::{Error, Result};
use crate::protocol::BridgeEvent;

use super::LoopMessage;

// ============================================================================
// Constants
// ============================================================================

/// Field named in channel errors.
const FIELD: &str = "channelNames";

/// A JavaScript identifier.
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid")
});

// ============================================================================
// ChannelPoster
// ============================================================================

/// Handle the engine calls when page script posts on a named channel.
///
/// Safe to call from any thread.
#[derive(Debug, Clone)]
pub struct ChannelPoster {
    channel: String,
    tx: mpsc::UnboundedSender<LoopMessage>,
}

impl ChannelPoster {
    /// Returns the channel name.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Queues a message from page script.
    pub fn post(&self, message: impl Into<String>) {
        let sent = self.tx.send(LoopMessage::ChannelPost {
            channel: self.channel.clone(),
            message: message.into(),
        });
        if sent.is_err() {
            trace!(channel = %self.channel, "Channel post after bridge stopped");
        }
    }
}

// ============================================================================
// ChannelRegistry
// ============================================================================

/// Registered channel names for one bridge.
#[derive(Debug)]
pub struct ChannelRegistry {
    names: FxHashSet<String>,
    tx: mpsc::UnboundedSender<LoopMessage>,
}

impl ChannelRegistry {
    pub(crate) fn new(tx: mpsc::UnboundedSender<LoopMessage>) -> Self {
        Self {
            names: FxHashSet::default(),
            tx,
        }
    }

    /// Returns `true` if `name` is a valid JavaScript identifier.
    #[inline]
    #[must_use]
    pub fn is_valid_name(name: &str) -> bool {
        IDENTIFIER.is_match(name)
    }

    /// Validates a batch of names without registering anything.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for field `channelNames` naming the first
    /// invalid entry.
    pub fn validate(names: &[String]) -> Result<()> {
        match names.iter().find(|name| !Self::is_valid_name(name)) {
            Some(bad) => Err(Error::invalid_argument(
                FIELD,
                format!("`{bad}` is not a valid JavaScript identifier"),
            )),
            None => Ok(()),
        }
    }

    /// Registers every name in the batch.
    ///
    /// The batch is validated first; already registered names are skipped.
    pub fn register_all(&mut self, engine: &mut dyn RenderEngine, names: &[String]) -> Result<()> {
        Self::validate(names)?;
        for name in names {
            self.register(engine, name)?;
        }
        Ok(())
    }

    /// Registers one name.
    ///
    /// Returns `false` if it was already registered.
    pub fn register(&mut self, engine: &mut dyn RenderEngine, name: &str) -> Result<bool> {
        if !Self::is_valid_name(name) {
            return Err(Error::invalid_argument(
                FIELD,
                format!("`{name}` is not a valid JavaScript identifier"),
            ));
        }
        if self.names.contains(name) {
            trace!(channel = name, "Channel already registered");
            return Ok(false);
        }

        let poster = ChannelPoster {
            channel: name.to_string(),
            tx: self.tx.clone(),
        };
        engine.add_script_channel(name, poster)?;
        self.names.insert(name.to_string());

        debug!(channel = name, "Channel registered");
        Ok(true)
    }

    /// Unregisters every name in the batch. Unknown names are ignored.
    pub fn unregister_all(&mut self, engine: &mut dyn RenderEngine, names: &[String]) -> Result<()> {
        for name in names {
            self.unregister(engine, name)?;
        }
        Ok(())
    }

    /// Unregisters one name.
    ///
    /// Returns `false` if it was not registered.
    pub fn unregister(&mut self, engine: &mut dyn RenderEngine, name: &str) -> Result<bool> {
        if !self.names.contains(name) {
            return Ok(false);
        }

        engine.remove_script_channel(name)?;
        self.names.remove(name);

        debug!(channel = name, "Channel unregistered");
        Ok(true)
    }

    /// Returns `true` if `name` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns the number of registered channels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if no channels are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Turns a queued post into an event, dropping posts for removed channels.
    #[must_use]
    pub fn route(&self, channel: String, message: String) -> Option<BridgeEvent> {
        if !self.contains(&channel) {
            debug!(channel = %channel, "Dropping message for unregistered channel");
            return None;
        }
        Some(BridgeEvent::ChannelMessage { channel, message })
    }
}

// ============================================================================
// Tests
// ============================================================================
