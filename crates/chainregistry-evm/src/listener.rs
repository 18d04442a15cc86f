//! The registry listener: historical range processing and the live loop.
//!
//! # Historical
//! `[start, end]` is split into pages. Up to `workers` pages are fetched
//! concurrently; each worker walks its page's logs in order, fetching a
//! parent block only when the block number changes. Routing and delivery are
//! serialized through the lock that owns the contract registry, so a refresh
//! never races with another log. The first error stops the whole range.
//!
//! # Live
//! Logs arrive one at a time from the log source's feed and go through the
//! same serialized handling. After the last log of each block the sink's
//! after-block hook runs, if one is registered.

use std::sync::{Arc, Mutex};

use futures::{stream, StreamExt, TryStreamExt};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use chainregistry_core::client::{ChainClient, FeedEvent, FeedOptions, LogSource};
use chainregistry_core::config::{ListenerConfig, ListenerState};
use chainregistry_core::error::ListenerError;
use chainregistry_core::handler::MessageSink;
use chainregistry_core::types::{BlockSummary, Log};

use crate::pager::{self, Page};
use crate::registry::ContractRegistry;
use crate::router::EventRouter;

/// Listens to the registry contracts and delivers decoded messages.
///
/// Built with [`ListenerBuilder`](crate::builder::ListenerBuilder).
pub struct RegistryListener {
    config: ListenerConfig,
    log_source: Arc<dyn LogSource>,
    chain: Arc<dyn ChainClient>,
    router: EventRouter,
    registry: AsyncMutex<ContractRegistry>,
    sink: Arc<dyn MessageSink>,
    state: Mutex<ListenerState>,
    cancel: CancellationToken,
}

impl RegistryListener {
    pub(crate) fn new(
        config: ListenerConfig,
        log_source: Arc<dyn LogSource>,
        chain: Arc<dyn ChainClient>,
        router: EventRouter,
        registry: ContractRegistry,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            config,
            log_source,
            chain,
            router,
            registry: AsyncMutex::new(registry),
            sink,
            state: Mutex::new(ListenerState::Idle),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Current runtime state.
    pub fn state(&self) -> ListenerState {
        *self.state.lock().unwrap()
    }

    /// Token that stops every running operation when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Snapshot of the contract registry.
    pub async fn contracts(&self) -> ContractRegistry {
        self.registry.lock().await.clone()
    }

    /// Process every log in `[start, end]`.
    ///
    /// A missing `end` resolves to the chain height at call time.
    pub async fn process_block_range(
        &self,
        start: u64,
        end: Option<u64>,
    ) -> Result<(), ListenerError> {
        self.set_state(ListenerState::Backfilling);
        let result = self.run_range(start, end).await;
        self.finish(result)
    }

    /// Process the last `blocks_ago` blocks up to and including the chain head.
    pub async fn process_last_blocks(&self, blocks_ago: u64) -> Result<(), ListenerError> {
        let height = self.chain.block_number().await?;
        if height == 0 {
            return Err(ListenerError::EmptyChain);
        }
        self.process_block_range(height.saturating_sub(blocks_ago), Some(height))
            .await
    }

    /// Follow the live feed until it ends, errors, or the listener is cancelled.
    pub async fn listen(&self) -> Result<(), ListenerError> {
        self.set_state(ListenerState::Live);
        let result = self.run_live().await;
        self.finish(result)
    }

    async fn run_range(&self, start: u64, end: Option<u64>) -> Result<(), ListenerError> {
        let end = match end {
            Some(end) => end,
            None => self.chain.block_number().await?,
        };
        info!(
            listener = %self.config.name,
            start,
            end,
            workers = self.config.workers,
            "Processing block range"
        );

        let pages = pager::pages(start, end, self.config.page_size)?;
        let work = stream::iter(pages)
            .try_for_each_concurrent(self.config.workers, |page| self.process_page(page));

        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(ListenerError::Cancelled),
            result = work => result,
        };
        result?;

        info!(listener = %self.config.name, start, end, "Block range complete");
        Ok(())
    }

    async fn process_page(&self, page: Page) -> Result<(), ListenerError> {
        self.check_cancelled()?;
        let logs = self.log_source.logs_for_range(page.start, page.end).await?;
        debug!(
            page_start = page.start,
            page_end = page.end,
            logs = logs.len(),
            "Fetched page"
        );

        let mut cached: Option<BlockSummary> = None;
        for log in logs {
            self.check_cancelled()?;
            if log.removed {
                debug!(block = log.block_number, log_index = log.log_index, "Skipping removed log");
                continue;
            }
            let block = match cached.take() {
                Some(block) if block.number == log.block_number => block,
                _ => self.chain.block_by_number(log.block_number).await?,
            };
            self.handle_log(&block, &log).await?;
            cached = Some(block);
        }
        Ok(())
    }

    async fn run_live(&self) -> Result<(), ListenerError> {
        let options = FeedOptions {
            start_block: self.config.start_block,
            end_block: self.config.end_block,
            block_offset: self.config.block_offset,
        };
        let mut feed = self.log_source.subscribe(options).await?;
        info!(listener = %self.config.name, ?options, "Listening for registry logs");

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ListenerError::Cancelled),
                next = feed.next() => next,
            };
            match next {
                None => return Ok(()),
                Some(Err(e)) => return Err(e),
                Some(Ok(FeedEvent::Log { block, log })) => {
                    if log.removed {
                        debug!(block = block.number, log_index = log.log_index, "Skipping removed log");
                        continue;
                    }
                    self.handle_log(&block, &log).await?;
                }
                Some(Ok(FeedEvent::BlockEnd(block))) => {
                    self.check_cancelled()?;
                    if self.sink.has_block_handler() {
                        self.sink.after_block(&block).await?;
                    }
                }
            }
        }
    }

    /// Route one log and deliver its messages, in order, under the lock.
    async fn handle_log(&self, block: &BlockSummary, log: &Log) -> Result<(), ListenerError> {
        let mut registry = self.registry.lock().await;
        let messages = self.router.route(&mut registry, block, log).await?;
        for msg in messages {
            self.sink.deliver(msg).await?;
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), ListenerError> {
        if self.cancel.is_cancelled() {
            return Err(ListenerError::Cancelled);
        }
        Ok(())
    }

    fn set_state(&self, state: ListenerState) {
        *self.state.lock().unwrap() = state;
    }

    fn finish(&self, result: Result<(), ListenerError>) -> Result<(), ListenerError> {
        match &result {
            Ok(()) => self.set_state(ListenerState::Stopped),
            Err(e) => {
                error!(listener = %self.config.name, error = %e, "Listener stopped");
                self.set_state(ListenerState::Error);
            }
        }
        result
    }
}
