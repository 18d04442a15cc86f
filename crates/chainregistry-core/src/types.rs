//! Shared chain types for the listener pipeline.

use alloy_primitives::{Address, Bytes, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── BlockSummary ─────────────────────────────────────────────────────────────

/// The parent block of a log, enough for messages to carry their chain position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Parent block hash.
    pub parent_hash: B256,
    /// Unix timestamp of the block (seconds since epoch).
    pub timestamp: u64,
}

impl BlockSummary {
    /// Block timestamp as a UTC date-time, `None` if out of range.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.timestamp).ok()?;
        DateTime::from_timestamp(secs, 0)
    }

    /// Time elapsed since the block was produced.
    pub fn age(&self) -> Option<chrono::Duration> {
        self.timestamp_utc().map(|ts| Utc::now() - ts)
    }
}

// ─── Log ──────────────────────────────────────────────────────────────────────

/// An EVM event log.
///
/// The first topic is the event signature hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics, signature hash first.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed fields.
    pub data: Bytes,
    /// Block the log was included in.
    pub block_number: u64,
    /// Hash of the emitting transaction.
    pub tx_hash: B256,
    /// Position of the log within its block.
    pub log_index: u64,
    /// `true` if the log was dropped by a reorg.
    pub removed: bool,
}

impl Log {
    /// The event signature hash, if the log has any topics.
    pub fn topic0(&self) -> Option<&B256> {
        self.topics.first()
    }

    /// Returns `true` if this log's first topic equals `topic`.
    pub fn has_topic0(&self, topic: &B256) -> bool {
        self.topic0() == Some(topic)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic0_is_first_topic() {
        let sig = B256::repeat_byte(0xaa);
        let log = Log {
            topics: vec![sig, B256::repeat_byte(0x01)],
            ..Default::default()
        };
        assert_eq!(log.topic0(), Some(&sig));
        assert!(log.has_topic0(&sig));
        assert!(!log.has_topic0(&B256::repeat_byte(0x01)));
    }

    #[test]
    fn anonymous_log_has_no_topic0() {
        let log = Log::default();
        assert!(log.topic0().is_none());
    }

    #[test]
    fn block_timestamp_conversion() {
        let block = BlockSummary {
            number: 100,
            hash: B256::ZERO,
            parent_hash: B256::ZERO,
            timestamp: 1_700_000_000,
        };
        assert_eq!(block.timestamp_utc().unwrap().timestamp(), 1_700_000_000);
        assert!(block.age().unwrap() > chrono::Duration::zero());
    }
}
