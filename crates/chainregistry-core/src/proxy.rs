//! In-process publish/subscribe proxy backed by a Tokio broadcast channel.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

use crate::error::ListenerError;
use crate::handler::{HandlerRegistry, MessageProxy};
use crate::message::RegistryMessage;

/// Broadcasts listener messages to any number of in-process subscribers.
///
/// The channel closes when the proxy is dropped; subscribers then drain the
/// remaining messages and return.
pub struct BroadcastProxy {
    tx: broadcast::Sender<RegistryMessage>,
}

impl BroadcastProxy {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe now; messages published from this point on are received.
    pub fn subscriber(&self) -> ProxySubscription {
        ProxySubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl MessageProxy for BroadcastProxy {
    async fn publish(&self, msg: RegistryMessage) -> Result<(), ListenerError> {
        if self.tx.send(msg).is_err() {
            // No receiver is not a delivery failure
            warn!("No active proxy subscribers, message dropped");
        }
        Ok(())
    }

    async fn subscribe(&self, handlers: Arc<HandlerRegistry>) -> Result<(), ListenerError> {
        self.subscriber().run(handlers).await
    }
}

/// A receiving end of a [`BroadcastProxy`].
pub struct ProxySubscription {
    rx: broadcast::Receiver<RegistryMessage>,
}

impl ProxySubscription {
    /// Dispatch every received message to `handlers` until the proxy closes.
    ///
    /// A subscriber that falls behind and loses messages fails rather than
    /// continuing with a gap.
    pub async fn run(mut self, handlers: Arc<HandlerRegistry>) -> Result<(), ListenerError> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => handlers.dispatch(&msg).await?,
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    return Err(ListenerError::Proxy(format!(
                        "subscriber lagged, {skipped} messages lost"
                    )))
                }
            }
        }
    }
}
