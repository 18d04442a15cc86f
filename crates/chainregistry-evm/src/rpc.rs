//! JSON-RPC shapes of `eth_getLogs` and `eth_getBlockByNumber` results.
//!
//! Log sources backed by a JSON-RPC node use these to turn responses into
//! [`Log`] and [`BlockSummary`] values. Malformed hex is an error, never a
//! silent zero.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use chainregistry_core::error::ListenerError;
use chainregistry_core::types::{BlockSummary, Log};

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(default)]
    pub removed: Option<bool>,
}

impl TryFrom<RawLog> for Log {
    type Error = ListenerError;

    fn try_from(raw: RawLog) -> Result<Self, Self::Error> {
        let topics = raw
            .topics
            .iter()
            .map(|t| parse_hex::<B256>("topic", t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Log {
            address: parse_hex::<Address>("address", &raw.address)?,
            topics,
            data: parse_hex::<Bytes>("data", &raw.data)?,
            block_number: parse_hex_u64(&raw.block_number)?,
            tx_hash: parse_hex::<B256>("transactionHash", &raw.tx_hash)?,
            log_index: parse_hex_u64(&raw.log_index)?,
            removed: raw.removed.unwrap_or(false),
        })
    }
}

fn parse_hex<T: std::str::FromStr>(field: &str, s: &str) -> Result<T, ListenerError> {
    s.parse::<T>()
        .map_err(|_| ListenerError::Rpc(format!("invalid {field} '{s}'")))
}

/// Parse a hex-encoded quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, ListenerError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ListenerError::Rpc(format!("invalid hex quantity '{s}': {e}")))
}

/// Convert an `eth_getBlockByNumber` result to a `BlockSummary`.
pub fn block_from_json(v: &Value) -> Result<BlockSummary, ListenerError> {
    let field = |name: &str| {
        v[name]
            .as_str()
            .ok_or_else(|| ListenerError::Rpc(format!("block response is missing '{name}'")))
    };
    Ok(BlockSummary {
        number: parse_hex_u64(field("number")?)?,
        hash: parse_hex::<B256>("hash", field("hash")?)?,
        parent_hash: parse_hex::<B256>("parentHash", field("parentHash")?)?,
        timestamp: parse_hex_u64(field("timestamp")?)?,
    })
}

/// `eth_getLogs` filter parameters for `[from, to]`.
///
/// An empty address list matches every address; `topics` is the allow-list
/// for the first topic.
pub fn get_logs_params(from: u64, to: u64, addresses: &[Address], topics: &[B256]) -> Value {
    let mut filter = json!({
        "fromBlock": format!("{from:#x}"),
        "toBlock": format!("{to:#x}"),
    });
    if !addresses.is_empty() {
        filter["address"] = json!(addresses);
    }
    if !topics.is_empty() {
        filter["topics"] = json!([topics]);
    }
    json!([filter])
}
