//! Message handlers and the sink the listener delivers into.
//!
//! A listener owns exactly one [`MessageSink`], chosen at construction:
//! - [`HandlerRegistry`] invokes in-process handlers directly;
//! - [`ProxySink`] publishes to a [`MessageProxy`] for delivery elsewhere.
//!
//! Either way the after-block hook runs locally.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ListenerError;
use crate::message::{MessageKind, RegistryMessage};
use crate::types::BlockSummary;

/// Trait for user-provided message handlers.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Called for each message of the handler's kind.
    async fn handle(&self, msg: &RegistryMessage) -> Result<(), ListenerError>;

    /// The message kind this handler processes.
    fn kind(&self) -> MessageKind;
}

/// Trait for the after-block hook (e.g. checkpointing).
///
/// Called once per block in live mode, after every log of the block.
#[async_trait]
pub trait BlockHandler: Send + Sync {
    async fn handle_block(&self, block: &BlockSummary) -> Result<(), ListenerError>;
}

/// Terminal destination for decoded messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one message.
    async fn deliver(&self, msg: RegistryMessage) -> Result<(), ListenerError>;

    /// Run the after-block hook, if any.
    async fn after_block(&self, _block: &BlockSummary) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Returns `true` if an after-block hook is registered.
    fn has_block_handler(&self) -> bool {
        false
    }
}

// ─── HandlerRegistry ─────────────────────────────────────────────────────────

/// Registry of message + after-block handlers.
///
/// Messages of a kind with no handler are dropped silently.
pub struct HandlerRegistry {
    message_handlers: HashMap<MessageKind, Vec<Arc<dyn MessageHandler>>>,
    block_handler: Option<Arc<dyn BlockHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            message_handlers: HashMap::new(),
            block_handler: None,
        }
    }

    /// Register a handler for its message kind.
    pub fn on_message(&mut self, handler: Arc<dyn MessageHandler>) {
        self.message_handlers
            .entry(handler.kind())
            .or_default()
            .push(handler);
    }

    /// Set the after-block hook, replacing any previous one.
    pub fn on_block(&mut self, handler: Arc<dyn BlockHandler>) {
        self.block_handler = Some(handler);
    }

    /// The after-block hook, if one is set.
    pub fn block_handler(&self) -> Option<Arc<dyn BlockHandler>> {
        self.block_handler.clone()
    }

    /// Returns `true` if any handler is registered for `kind`.
    pub fn handles(&self, kind: MessageKind) -> bool {
        self.message_handlers
            .get(&kind)
            .is_some_and(|handlers| !handlers.is_empty())
    }

    /// Dispatch a message to every handler of its kind, in registration order.
    pub async fn dispatch(&self, msg: &RegistryMessage) -> Result<(), ListenerError> {
        if let Some(handlers) = self.message_handlers.get(&msg.kind()) {
            for handler in handlers {
                handler.handle(msg).await?;
            }
        }
        Ok(())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSink for HandlerRegistry {
    async fn deliver(&self, msg: RegistryMessage) -> Result<(), ListenerError> {
        self.dispatch(&msg).await
    }

    async fn after_block(&self, block: &BlockSummary) -> Result<(), ListenerError> {
        match &self.block_handler {
            Some(handler) => handler.handle_block(block).await,
            None => Ok(()),
        }
    }

    fn has_block_handler(&self) -> bool {
        self.block_handler.is_some()
    }
}

// ─── Proxy ───────────────────────────────────────────────────────────────────

/// Connects a listener with handlers that live elsewhere.
#[async_trait]
pub trait MessageProxy: Send + Sync {
    /// Publish a message to the subscribers.
    async fn publish(&self, msg: RegistryMessage) -> Result<(), ListenerError>;

    /// Drive `handlers` with published messages until the channel closes.
    async fn subscribe(&self, handlers: Arc<HandlerRegistry>) -> Result<(), ListenerError>;
}

/// Sink that publishes every message through a proxy.
///
/// The after-block hook stays local: it runs in the listener's process
/// whether or not messages are proxied.
pub struct ProxySink {
    proxy: Arc<dyn MessageProxy>,
    block_handler: Option<Arc<dyn BlockHandler>>,
}

impl ProxySink {
    pub fn new(proxy: Arc<dyn MessageProxy>) -> Self {
        Self {
            proxy,
            block_handler: None,
        }
    }

    /// Run `handler` after each live block.
    pub fn with_block_handler(mut self, handler: Option<Arc<dyn BlockHandler>>) -> Self {
        self.block_handler = handler;
        self
    }
}

#[async_trait]
impl MessageSink for ProxySink {
    async fn deliver(&self, msg: RegistryMessage) -> Result<(), ListenerError> {
        self.proxy.publish(msg).await
    }

    async fn after_block(&self, block: &BlockSummary) -> Result<(), ListenerError> {
        match &self.block_handler {
            Some(handler) => handler.handle_block(block).await,
            None => Ok(()),
        }
    }

    fn has_block_handler(&self) -> bool {
        self.block_handler.is_some()
    }
}
