use async_trait::async_trait;
use hivemind_core::{HivemindResult, Message};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Handles decoded messages arriving on a subscribed channel.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes one message. Errors are logged by the dispatch loop and
    /// never terminate it.
    async fn handle(&self, message: Message) -> HivemindResult<()>;
}

/// Process-local table mapping a resolved channel name to its handler.
///
/// Registering a handler for a channel that already has one replaces it:
/// last writer wins.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn MessageHandler>>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `channel`. Returns true when a previous
    /// handler was replaced.
    pub fn insert(&self, channel: impl Into<String>, handler: Arc<dyn MessageHandler>) -> bool {
        self.handlers
            .write()
            .insert(channel.into(), handler)
            .is_some()
    }

    /// Looks up the handler for a channel.
    pub fn get(&self, channel: &str) -> Option<Arc<dyn MessageHandler>> {
        self.handlers.read().get(channel).cloned()
    }

    /// Channels with a registered handler.
    pub fn channels(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}
