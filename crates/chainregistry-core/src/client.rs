//! Collaborator traits: where logs, blocks, and registry state come from.
//!
//! All three are pure I/O boundaries. Implementations must be `Send + Sync`
//! so the listener can hold them as `Arc<dyn …>` across worker futures.

use std::pin::Pin;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::contracts::ContractAddresses;
use crate::error::ListenerError;
use crate::types::{BlockSummary, Log};

/// An item of the live log feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A log together with its parent block.
    Log { block: BlockSummary, log: Log },
    /// Every log of `block` has been delivered.
    BlockEnd(BlockSummary),
}

/// Unbounded live feed of logs, in chain order.
pub type LogStream = Pin<Box<dyn Stream<Item = Result<FeedEvent, ListenerError>> + Send>>;

/// Bounds of the live feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedOptions {
    /// First block to deliver. `None` = current head.
    pub start_block: Option<u64>,
    /// Last block to deliver. `None` = unbounded.
    pub end_block: Option<u64>,
    /// Blocks to stay behind the head.
    pub block_offset: u64,
}

/// Produces logs already filtered to the relevant topics and addresses.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// All logs in `[start, end]` (inclusive) in chain order. May be empty.
    async fn logs_for_range(&self, start: u64, end: u64) -> Result<Vec<Log>, ListenerError>;

    /// Start the live feed. The stream ends when the subscription ends.
    async fn subscribe(&self, options: FeedOptions) -> Result<LogStream, ListenerError>;

    /// Extend the active address filter. Adding a known address is a no-op.
    fn add_address(&self, address: Address);

    /// Replace the topic allow-list applied to the first topic.
    fn set_topics(&self, topics: Vec<B256>);
}

/// Resolves chain height and block metadata.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain height.
    async fn block_number(&self) -> Result<u64, ListenerError>;

    /// Block summary by number.
    async fn block_by_number(&self, number: u64) -> Result<BlockSummary, ListenerError>;
}

/// Current on-chain state of an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub agent_id: String,
    pub enabled: bool,
    pub owner: Option<Address>,
    pub metadata: String,
}

/// Source of truth for current registry state.
///
/// Event payloads can be stale by the time they are processed; the listener
/// consults this client wherever current state matters.
#[async_trait]
pub trait RegistryStateClient: Send + Sync {
    /// Is the scanner currently enabled (including sunsetting rules)?
    async fn is_enabled_scanner(&self, scanner_id: &str) -> Result<bool, ListenerError>;

    /// Current owner of a scanner pool.
    async fn scanner_pool_owner(&self, pool_id: U256) -> Result<Address, ListenerError>;

    /// Current state of an agent.
    async fn agent(&self, agent_id: &str) -> Result<AgentState, ListenerError>;

    /// Re-resolve every registry contract address and return the new set.
    ///
    /// After success the returned set replaces the previous one atomically.
    async fn refresh_contracts(&self) -> Result<ContractAddresses, ListenerError>;

    /// The currently resolved contract addresses.
    fn contracts(&self) -> ContractAddresses;
}
