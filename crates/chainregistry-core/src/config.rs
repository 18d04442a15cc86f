//! Listener configuration and state types.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::contracts::ContractFilter;
use crate::error::ListenerError;

/// Widest block range fetched in one `logs_for_range` call.
pub const DEFAULT_PAGE_SIZE: u64 = 10_000;

/// Number of pages fetched concurrently during historical processing.
pub const DEFAULT_WORKERS: usize = 25;

/// Configuration for a listener instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Name used in log output.
    pub name: String,
    /// First block of the live feed. `None` = current head.
    pub start_block: Option<u64>,
    /// Last block of the live feed. `None` = run forever.
    pub end_block: Option<u64>,
    /// Blocks to stay behind the head, for finality lag.
    pub block_offset: u64,
    /// Roles to subscribe to. `None` = every deployed role.
    pub contract_filter: Option<ContractFilter>,
    /// Topic allow-list. Empty = every topic the router understands.
    pub topics: Vec<B256>,
    /// Skip re-resolving contract addresses at startup.
    pub no_refresh: bool,
    /// Blocks per historical page.
    pub page_size: u64,
    /// Concurrent page fetchers.
    pub workers: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            name: "listener".into(),
            start_block: None,
            end_block: None,
            block_offset: 0,
            contract_filter: None,
            topics: Vec::new(),
            no_refresh: false,
            page_size: DEFAULT_PAGE_SIZE,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ListenerConfig {
    /// Reject settings the pager cannot work with.
    pub fn validate(&self) -> Result<(), ListenerError> {
        if self.page_size == 0 {
            return Err(ListenerError::Config("page_size must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(ListenerError::Config("workers must be at least 1".into()));
        }
        if let (Some(start), Some(end)) = (self.start_block, self.end_block) {
            if end < start {
                return Err(ListenerError::Config(format!(
                    "end_block {end} is before start_block {start}"
                )));
            }
        }
        Ok(())
    }
}

/// Runtime state of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListenerState {
    /// Not yet started.
    Idle,
    /// Processing a historical block range.
    Backfilling,
    /// Following the live feed.
    Live,
    /// Finished without error.
    Stopped,
    /// Stopped on an error.
    Error,
}

impl std::fmt::Display for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Backfilling => write!(f, "backfilling"),
            Self::Live => write!(f, "live"),
            Self::Stopped => write!(f, "stopped"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ListenerConfig::default();
        assert_eq!(cfg.page_size, 10_000);
        assert_eq!(cfg.workers, 25);
        assert!(cfg.contract_filter.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let cfg = ListenerConfig {
            page_size: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ListenerError::Config(_))));
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let cfg = ListenerConfig {
            start_block: Some(200),
            end_block: Some(100),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserialize_partial_json() {
        let cfg: ListenerConfig = serde_json::from_str(
            r#"{"name":"pool-listener","contract_filter":{"scanner_pool_registry":true},"block_offset":5}"#,
        )
        .unwrap();
        assert_eq!(cfg.name, "pool-listener");
        assert_eq!(cfg.block_offset, 5);
        assert_eq!(cfg.workers, 25);
        assert!(cfg.contract_filter.unwrap().scanner_pool_registry);
    }
}
