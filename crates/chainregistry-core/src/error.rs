//! Error types for the registry listener.

use thiserror::Error;

/// Errors that can occur while listening to registry contracts.
///
/// Every variant is terminal for the current batch or stream: the listener
/// never retries internally.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Failed to decode '{event}' log: {reason}")]
    Decode { event: String, reason: String },

    #[error("Registry state lookup failed: {0}")]
    StateLookup(String),

    #[error("Contract refresh failed: {0}")]
    Refresh(String),

    #[error("Handler error for '{kind}': {reason}")]
    Handler { kind: String, reason: String },

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Block page starting at {start} overflows the block number range")]
    PageOverflow { start: u64 },

    #[error("Chain has no blocks past genesis")]
    EmptyChain,

    #[error("Listener cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl ListenerError {
    /// Build a decode error for the named event.
    pub fn decode(event: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            event: event.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if the listener stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if a matched log could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
