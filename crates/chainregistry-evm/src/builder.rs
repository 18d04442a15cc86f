//! Fluent builder API for creating registry listeners.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use alloy_primitives::Address;
//! use chainregistry_core::contracts::{ContractAddresses, ContractRole};
//! use chainregistry_core::handler::HandlerRegistry;
//! use chainregistry_core::memory::{MemoryChain, MemoryLogSource, MemoryRegistryClient};
//! use chainregistry_evm::ListenerBuilder;
//!
//! # async fn run() -> Result<(), chainregistry_core::ListenerError> {
//! let contracts = ContractAddresses::default()
//!     .with(ContractRole::Dispatch, Address::repeat_byte(0x01));
//!
//! let listener = ListenerBuilder::new()
//!     .name("dispatch-listener")
//!     .page_size(5_000)
//!     .log_source(Arc::new(MemoryLogSource::new()))
//!     .chain(Arc::new(MemoryChain::new(1_000)))
//!     .client(Arc::new(MemoryRegistryClient::new(contracts)))
//!     .handlers(HandlerRegistry::new())
//!     .build()
//!     .await?;
//!
//! listener.process_last_blocks(100).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use alloy_primitives::B256;
use tracing::{debug, info};

use chainregistry_core::client::{ChainClient, LogSource, RegistryStateClient};
use chainregistry_core::config::ListenerConfig;
use chainregistry_core::contracts::ContractFilter;
use chainregistry_core::error::ListenerError;
use chainregistry_core::handler::{HandlerRegistry, MessageProxy, MessageSink, ProxySink};

use crate::decoder::default_topics;
use crate::listener::RegistryListener;
use crate::registry::ContractRegistry;
use crate::router::EventRouter;

/// Fluent builder for [`RegistryListener`].
#[derive(Default)]
pub struct ListenerBuilder {
    config: ListenerConfig,
    log_source: Option<Arc<dyn LogSource>>,
    chain: Option<Arc<dyn ChainClient>>,
    client: Option<Arc<dyn RegistryStateClient>>,
    handlers: Option<HandlerRegistry>,
    proxy: Option<Arc<dyn MessageProxy>>,
}

impl ListenerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ListenerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the listener name (used in log output).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the first block of the live feed.
    pub fn start_block(mut self, block: u64) -> Self {
        self.config.start_block = Some(block);
        self
    }

    /// Set the last block of the live feed.
    pub fn end_block(mut self, block: u64) -> Self {
        self.config.end_block = Some(block);
        self
    }

    /// Set how many blocks the live feed stays behind the head.
    pub fn block_offset(mut self, offset: u64) -> Self {
        self.config.block_offset = offset;
        self
    }

    /// Restrict the subscribed addresses to the selected roles.
    pub fn contract_filter(mut self, filter: ContractFilter) -> Self {
        self.config.contract_filter = Some(filter);
        self
    }

    /// Set an explicit topic allow-list.
    pub fn topics(mut self, topics: Vec<B256>) -> Self {
        self.config.topics = topics;
        self
    }

    /// Use the client's current addresses instead of re-resolving at startup.
    pub fn no_refresh(mut self, no_refresh: bool) -> Self {
        self.config.no_refresh = no_refresh;
        self
    }

    /// Set the number of blocks per historical page.
    pub fn page_size(mut self, size: u64) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the number of concurrent page fetchers.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn log_source(mut self, source: Arc<dyn LogSource>) -> Self {
        self.log_source = Some(source);
        self
    }

    pub fn chain(mut self, chain: Arc<dyn ChainClient>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn client(mut self, client: Arc<dyn RegistryStateClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Deliver messages to in-process handlers.
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Publish messages through a proxy. Takes precedence over handlers.
    pub fn proxy(mut self, proxy: Arc<dyn MessageProxy>) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Build the `ListenerConfig` only.
    pub fn build_config(self) -> ListenerConfig {
        self.config
    }

    /// Resolve the contracts, configure the log source and build the listener.
    pub async fn build(self) -> Result<RegistryListener, ListenerError> {
        self.config.validate()?;
        let log_source = self
            .log_source
            .ok_or_else(|| ListenerError::Config("a log source is required".into()))?;
        let chain = self
            .chain
            .ok_or_else(|| ListenerError::Config("a chain client is required".into()))?;
        let client = self
            .client
            .ok_or_else(|| ListenerError::Config("a registry state client is required".into()))?;

        let addresses = if self.config.no_refresh {
            client.contracts()
        } else {
            client.refresh_contracts().await?
        };
        let registry = ContractRegistry::new(addresses);

        let topics = if self.config.topics.is_empty() {
            default_topics()
        } else {
            self.config.topics.clone()
        };
        log_source.set_topics(topics);

        let filter_addresses = registry.filter_addresses(self.config.contract_filter.as_ref())?;
        for address in &filter_addresses {
            log_source.add_address(*address);
        }

        let sink: Arc<dyn MessageSink> = match self.proxy {
            Some(proxy) => {
                let block_handler = self.handlers.as_ref().and_then(|h| h.block_handler());
                if self.handlers.is_some() {
                    debug!("proxy configured, local message handlers are not used");
                }
                Arc::new(ProxySink::new(proxy).with_block_handler(block_handler))
            }
            None => Arc::new(self.handlers.unwrap_or_default()),
        };

        info!(
            listener = %self.config.name,
            addresses = filter_addresses.len(),
            contracts = registry.bindings().len(),
            "Registry listener ready"
        );

        let router = EventRouter::new(client, log_source.clone(), self.config.contract_filter);
        Ok(RegistryListener::new(
            self.config,
            log_source,
            chain,
            router,
            registry,
            sink,
        ))
    }
}
