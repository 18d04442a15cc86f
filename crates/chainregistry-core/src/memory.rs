//! In-memory collaborators.
//!
//! Chain, log source and registry state held in RAM. Useful for testing and
//! for ephemeral listeners replaying a fixed set of logs.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::client::{
    AgentState, ChainClient, FeedEvent, FeedOptions, LogSource, LogStream, RegistryStateClient,
};
use crate::contracts::ContractAddresses;
use crate::error::ListenerError;
use crate::subject::scanner_id_hex;
use crate::types::{BlockSummary, Log};

/// Deterministic block summary for block `number`.
pub fn synthetic_block(number: u64) -> BlockSummary {
    BlockSummary {
        number,
        hash: B256::from(U256::from(number).to_be_bytes::<32>()),
        parent_hash: B256::from(U256::from(number.saturating_sub(1)).to_be_bytes::<32>()),
        timestamp: 1_600_000_000 + number * 12,
    }
}

// ─── MemoryChain ─────────────────────────────────────────────────────────────

/// In-memory chain: a head height plus synthetic blocks below it.
pub struct MemoryChain {
    head: Mutex<u64>,
    fetches: Mutex<HashMap<u64, usize>>,
    failing: Mutex<HashSet<u64>>,
}

impl MemoryChain {
    pub fn new(head: u64) -> Self {
        Self {
            head: Mutex::new(head),
            fetches: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Move the chain head.
    pub fn set_head(&self, head: u64) {
        *self.head.lock().unwrap() = head;
    }

    /// Make `block_by_number(number)` fail.
    pub fn fail_block(&self, number: u64) {
        self.failing.lock().unwrap().insert(number);
    }

    /// How many times block `number` was fetched.
    pub fn fetch_count(&self, number: u64) -> usize {
        self.fetches.lock().unwrap().get(&number).copied().unwrap_or(0)
    }

    /// Total block fetches.
    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    async fn block_number(&self) -> Result<u64, ListenerError> {
        Ok(*self.head.lock().unwrap())
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockSummary, ListenerError> {
        *self.fetches.lock().unwrap().entry(number).or_default() += 1;
        if self.failing.lock().unwrap().contains(&number) {
            return Err(ListenerError::Rpc(format!("block {number} unavailable")));
        }
        if number > *self.head.lock().unwrap() {
            return Err(ListenerError::Rpc(format!("block {number} not found")));
        }
        Ok(synthetic_block(number))
    }
}

// ─── MemoryLogSource ─────────────────────────────────────────────────────────

/// In-memory log source over a fixed set of logs.
///
/// Range queries honor the address and topic filters (an empty filter admits
/// everything) and are recorded for inspection.
#[derive(Default)]
pub struct MemoryLogSource {
    logs: Mutex<Vec<Log>>,
    addresses: Mutex<Vec<Address>>,
    topics: Mutex<Vec<B256>>,
    fetched: Mutex<Vec<(u64, u64)>>,
    failing_pages: Mutex<HashSet<u64>>,
    feed: Mutex<Vec<FeedEvent>>,
    subscriptions: Mutex<Vec<FeedOptions>>,
}

impl MemoryLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add logs; they are kept sorted by `(block_number, log_index)`.
    pub fn insert_logs(&self, logs: impl IntoIterator<Item = Log>) {
        let mut all = self.logs.lock().unwrap();
        all.extend(logs);
        all.sort_by_key(|l| (l.block_number, l.log_index));
    }

    /// Append one block's logs to the live feed, followed by its block end.
    pub fn push_feed_block(&self, block: BlockSummary, logs: impl IntoIterator<Item = Log>) {
        let mut feed = self.feed.lock().unwrap();
        for log in logs {
            feed.push(FeedEvent::Log {
                block: block.clone(),
                log,
            });
        }
        feed.push(FeedEvent::BlockEnd(block));
    }

    /// Make any range query starting at `start` fail.
    pub fn fail_page(&self, start: u64) {
        self.failing_pages.lock().unwrap().insert(start);
    }

    /// Every `(start, end)` range queried so far, in call order.
    pub fn fetched_ranges(&self) -> Vec<(u64, u64)> {
        self.fetched.lock().unwrap().clone()
    }

    /// The current address filter.
    pub fn addresses(&self) -> Vec<Address> {
        self.addresses.lock().unwrap().clone()
    }

    /// The current topic filter.
    pub fn topics(&self) -> Vec<B256> {
        self.topics.lock().unwrap().clone()
    }

    /// Options of every live subscription opened so far.
    pub fn subscriptions(&self) -> Vec<FeedOptions> {
        self.subscriptions.lock().unwrap().clone()
    }

    fn admits(&self, log: &Log) -> bool {
        let addresses = self.addresses.lock().unwrap();
        let topics = self.topics.lock().unwrap();
        let address_ok = addresses.is_empty() || addresses.contains(&log.address);
        let topic_ok = topics.is_empty() || log.topic0().is_some_and(|t| topics.contains(t));
        address_ok && topic_ok
    }
}

#[async_trait]
impl LogSource for MemoryLogSource {
    async fn logs_for_range(&self, start: u64, end: u64) -> Result<Vec<Log>, ListenerError> {
        self.fetched.lock().unwrap().push((start, end));
        if self.failing_pages.lock().unwrap().contains(&start) {
            return Err(ListenerError::Rpc(format!(
                "eth_getLogs failed for [{start}, {end}]"
            )));
        }
        let logs = self.logs.lock().unwrap().clone();
        Ok(logs
            .into_iter()
            .filter(|l| l.block_number >= start && l.block_number <= end)
            .filter(|l| self.admits(l))
            .collect())
    }

    async fn subscribe(&self, options: FeedOptions) -> Result<LogStream, ListenerError> {
        self.subscriptions.lock().unwrap().push(options);
        let in_range = |block: &BlockSummary| {
            options.start_block.map_or(true, |s| block.number >= s)
                && options.end_block.map_or(true, |e| block.number <= e)
        };
        let events: Vec<Result<FeedEvent, ListenerError>> = self
            .feed
            .lock()
            .unwrap()
            .iter()
            .filter(|event| match event {
                FeedEvent::Log { block, .. } | FeedEvent::BlockEnd(block) => in_range(block),
            })
            .cloned()
            .map(Ok)
            .collect();
        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn add_address(&self, address: Address) {
        let mut addresses = self.addresses.lock().unwrap();
        if !addresses.contains(&address) {
            addresses.push(address);
        }
    }

    fn set_topics(&self, topics: Vec<B256>) {
        *self.topics.lock().unwrap() = topics;
    }
}

// ─── MemoryRegistryClient ────────────────────────────────────────────────────

/// In-memory registry state.
///
/// Each `refresh_contracts` call consumes the next queued address set, or
/// keeps the current one when the queue is empty.
#[derive(Default)]
pub struct MemoryRegistryClient {
    contracts: Mutex<ContractAddresses>,
    upcoming: Mutex<VecDeque<ContractAddresses>>,
    scanners: Mutex<HashMap<String, bool>>,
    agents: Mutex<HashMap<String, AgentState>>,
    pool_owners: Mutex<HashMap<U256, Address>>,
    refreshes: AtomicUsize,
    lookups: AtomicUsize,
    fail_refresh: AtomicBool,
}

impl MemoryRegistryClient {
    pub fn new(contracts: ContractAddresses) -> Self {
        Self {
            contracts: Mutex::new(contracts),
            ..Default::default()
        }
    }

    /// Queue the address set returned by the next refresh.
    pub fn queue_refresh(&self, contracts: ContractAddresses) {
        self.upcoming.lock().unwrap().push_back(contracts);
    }

    /// Make every following refresh fail.
    pub fn fail_refreshes(&self) {
        self.fail_refresh.store(true, Ordering::SeqCst);
    }

    pub fn set_scanner_enabled(&self, scanner_id: U256, enabled: bool) {
        self.scanners
            .lock()
            .unwrap()
            .insert(scanner_id_hex(scanner_id), enabled);
    }

    pub fn set_agent(&self, agent: AgentState) {
        self.agents
            .lock()
            .unwrap()
            .insert(agent.agent_id.clone(), agent);
    }

    pub fn set_pool_owner(&self, pool_id: U256, owner: Address) {
        self.pool_owners.lock().unwrap().insert(pool_id, owner);
    }

    /// Number of successful contract refreshes.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Number of state lookups served.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryStateClient for MemoryRegistryClient {
    async fn is_enabled_scanner(&self, scanner_id: &str) -> Result<bool, ListenerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        // Unregistered scanners are not enabled.
        Ok(self
            .scanners
            .lock()
            .unwrap()
            .get(scanner_id)
            .copied()
            .unwrap_or(false))
    }

    async fn scanner_pool_owner(&self, pool_id: U256) -> Result<Address, ListenerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.pool_owners
            .lock()
            .unwrap()
            .get(&pool_id)
            .copied()
            .ok_or_else(|| ListenerError::StateLookup(format!("scanner pool {pool_id} has no owner")))
    }

    async fn agent(&self, agent_id: &str) -> Result<AgentState, ListenerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.agents
            .lock()
            .unwrap()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| ListenerError::StateLookup(format!("agent {agent_id} not found")))
    }

    async fn refresh_contracts(&self) -> Result<ContractAddresses, ListenerError> {
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(ListenerError::Refresh("registry resolution failed".into()));
        }
        let mut contracts = self.contracts.lock().unwrap();
        if let Some(next) = self.upcoming.lock().unwrap().pop_front() {
            *contracts = next;
        }
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(contracts.clone())
    }

    fn contracts(&self) -> ContractAddresses {
        self.contracts.lock().unwrap().clone()
    }
}
