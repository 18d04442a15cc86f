//! Domain messages emitted by the listener.
//!
//! One on-chain log yields zero or more messages. Messages are immutable
//! values: once built they are handed to the sink and never touched again.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::subject::SubjectType;
use crate::types::{BlockSummary, Log};

// ─── Source ──────────────────────────────────────────────────────────────────

/// Where on chain a message came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub block_number: u64,
    pub block_hash: B256,
    pub block_timestamp: u64,
    pub tx_hash: B256,
    pub log_index: u64,
    /// Address of the emitting contract.
    pub address: Address,
}

impl Source {
    pub fn new(block: &BlockSummary, log: &Log) -> Self {
        Self {
            block_number: block.number,
            block_hash: block.hash,
            block_timestamp: block.timestamp,
            tx_hash: log.tx_hash,
            log_index: log.log_index,
            address: log.address,
        }
    }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// A scanner was registered or its metadata changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerSave {
    pub source: Source,
    pub scanner_id: String,
    pub chain_id: U256,
    pub metadata: String,
    /// Current enablement, read from registry state rather than the event.
    pub enabled: bool,
    /// Owning pool, for scanners registered through the pool registry.
    pub scanner_pool_id: Option<String>,
}

/// A scanner was enabled or disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerEnablement {
    pub source: Source,
    pub scanner_id: String,
    pub enabled: bool,
    pub permission: u8,
    pub value: bool,
}

/// Stake thresholds changed for a chain (or globally, for agents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeThreshold {
    pub source: Source,
    pub chain_id: Option<U256>,
    pub min: U256,
    pub max: U256,
    pub activated: bool,
}

/// A scanner pool was registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerPoolRegistration {
    pub source: Source,
    pub scanner_pool_id: String,
    pub chain_id: U256,
    pub owner: Address,
}

/// Ownership of a scanner pool moved between two non-zero accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerPoolTransfer {
    pub source: Source,
    pub scanner_pool_id: String,
    pub from: Address,
    pub to: Address,
}

/// The number of enabled scanners in a pool changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerPoolEnablement {
    pub source: Source,
    pub scanner_pool_id: String,
    pub enabled_scanners: U256,
}

/// An agent was registered or updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSave {
    pub source: Source,
    pub agent_id: String,
    pub by: Address,
    pub metadata: String,
    pub chain_ids: Vec<U256>,
    /// Current enablement, read from registry state rather than the event.
    pub enabled: bool,
}

/// An agent was enabled or disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEnablement {
    pub source: Source,
    pub agent_id: String,
    pub enabled: bool,
    pub permission: u8,
    pub value: bool,
}

/// The minimum scanner node version changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerNodeVersion {
    pub source: Source,
    pub new_version: String,
    pub old_version: String,
}

/// Stake was allocated to or unallocated from a pool subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAllocation {
    pub source: Source,
    pub subject_type: u8,
    pub subject_id: String,
    pub increase: bool,
    pub amount: U256,
    pub total_allocated: U256,
}

/// An agent was linked to (or unlinked from) a scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchLink {
    pub source: Source,
    pub agent_id: String,
    pub scanner_id: String,
    pub enable: bool,
    /// The link already existed in the requested state.
    pub already_linked: bool,
}

/// Kind of stake movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Deposit,
    Withdrawal,
    Slash,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Slash => "slash",
        }
    }
}

/// Stake moved for a scanner, agent or scanner pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeChange {
    pub source: Source,
    pub subject_type: SubjectType,
    /// Subject id in its subject type's encoding.
    pub subject_id: String,
    pub change: ChangeType,
    /// Staker account. Absent for slashes.
    pub account: Option<Address>,
    /// Amount moved. Absent for withdrawal initiations.
    pub value: Option<U256>,
}

/// Stake shares moved between accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareTransfer {
    pub source: Source,
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub share_id: U256,
    pub value: U256,
}

/// A registry proxy was pointed at a new implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrade {
    pub source: Source,
    pub proxy: Address,
    pub implementation: Address,
}

// ─── RegistryMessage ─────────────────────────────────────────────────────────

/// Every message the listener can deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryMessage {
    ScannerSave(ScannerSave),
    ScannerEnablement(ScannerEnablement),
    ScannerStakeThreshold(StakeThreshold),
    ScannerManagedStakeThreshold(StakeThreshold),
    ScannerPoolRegistration(ScannerPoolRegistration),
    ScannerPoolTransfer(ScannerPoolTransfer),
    ScannerPoolEnablement(ScannerPoolEnablement),
    AgentSave(AgentSave),
    AgentEnablement(AgentEnablement),
    AgentStakeThreshold(StakeThreshold),
    ScannerNodeVersion(ScannerNodeVersion),
    StakeAllocation(StakeAllocation),
    Dispatch(DispatchLink),
    ScannerStake(StakeChange),
    AgentStake(StakeChange),
    ScannerPoolStake(StakeChange),
    ShareTransfer(ShareTransfer),
    Upgrade(Upgrade),
}

impl RegistryMessage {
    /// The handler slot this message is delivered to.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::ScannerSave(_) => MessageKind::SaveScanner,
            Self::ScannerEnablement(m) if m.enabled => MessageKind::EnableScanner,
            Self::ScannerEnablement(_) => MessageKind::DisableScanner,
            Self::ScannerStakeThreshold(_) => MessageKind::ScannerStakeThreshold,
            Self::ScannerManagedStakeThreshold(_) => MessageKind::ScannerManagedStakeThreshold,
            Self::ScannerPoolRegistration(_) => MessageKind::RegisterScannerPool,
            Self::ScannerPoolTransfer(_) => MessageKind::TransferScannerPool,
            Self::ScannerPoolEnablement(_) => MessageKind::UpdateScannerPoolEnablement,
            Self::AgentSave(_) => MessageKind::SaveAgent,
            Self::AgentEnablement(m) if m.enabled => MessageKind::EnableAgent,
            Self::AgentEnablement(_) => MessageKind::DisableAgent,
            Self::AgentStakeThreshold(_) => MessageKind::AgentStakeThreshold,
            Self::ScannerNodeVersion(_) => MessageKind::ScannerNodeVersion,
            Self::StakeAllocation(_) => MessageKind::StakeAllocation,
            Self::Dispatch(m) => match (m.already_linked, m.enable) {
                (false, true) => MessageKind::Link,
                (false, false) => MessageKind::Unlink,
                (true, true) => MessageKind::AlreadyLinked,
                (true, false) => MessageKind::AlreadyUnlinked,
            },
            Self::ScannerStake(_) => MessageKind::ScannerStake,
            Self::AgentStake(_) => MessageKind::AgentStake,
            Self::ScannerPoolStake(_) => MessageKind::ScannerPoolStake,
            Self::ShareTransfer(_) => MessageKind::TransferShares,
            Self::Upgrade(_) => MessageKind::Upgrade,
        }
    }

    /// Chain position of the log the message was built from.
    pub fn source(&self) -> &Source {
        match self {
            Self::ScannerSave(m) => &m.source,
            Self::ScannerEnablement(m) => &m.source,
            Self::ScannerStakeThreshold(m)
            | Self::ScannerManagedStakeThreshold(m)
            | Self::AgentStakeThreshold(m) => &m.source,
            Self::ScannerPoolRegistration(m) => &m.source,
            Self::ScannerPoolTransfer(m) => &m.source,
            Self::ScannerPoolEnablement(m) => &m.source,
            Self::AgentSave(m) => &m.source,
            Self::AgentEnablement(m) => &m.source,
            Self::ScannerNodeVersion(m) => &m.source,
            Self::StakeAllocation(m) => &m.source,
            Self::Dispatch(m) => &m.source,
            Self::ScannerStake(m) | Self::AgentStake(m) | Self::ScannerPoolStake(m) => &m.source,
            Self::ShareTransfer(m) => &m.source,
            Self::Upgrade(m) => &m.source,
        }
    }
}

/// Handler slot for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    SaveScanner,
    EnableScanner,
    DisableScanner,
    ScannerStakeThreshold,
    ScannerManagedStakeThreshold,
    RegisterScannerPool,
    TransferScannerPool,
    UpdateScannerPoolEnablement,
    SaveAgent,
    EnableAgent,
    DisableAgent,
    AgentStakeThreshold,
    ScannerNodeVersion,
    StakeAllocation,
    Link,
    Unlink,
    AlreadyLinked,
    AlreadyUnlinked,
    ScannerStake,
    AgentStake,
    ScannerPoolStake,
    TransferShares,
    Upgrade,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SaveScanner => "save_scanner",
            Self::EnableScanner => "enable_scanner",
            Self::DisableScanner => "disable_scanner",
            Self::ScannerStakeThreshold => "scanner_stake_threshold",
            Self::ScannerManagedStakeThreshold => "scanner_managed_stake_threshold",
            Self::RegisterScannerPool => "register_scanner_pool",
            Self::TransferScannerPool => "transfer_scanner_pool",
            Self::UpdateScannerPoolEnablement => "update_scanner_pool_enablement",
            Self::SaveAgent => "save_agent",
            Self::EnableAgent => "enable_agent",
            Self::DisableAgent => "disable_agent",
            Self::AgentStakeThreshold => "agent_stake_threshold",
            Self::ScannerNodeVersion => "scanner_node_version",
            Self::StakeAllocation => "stake_allocation",
            Self::Link => "link",
            Self::Unlink => "unlink",
            Self::AlreadyLinked => "already_linked",
            Self::AlreadyUnlinked => "already_unlinked",
            Self::ScannerStake => "scanner_stake",
            Self::AgentStake => "agent_stake",
            Self::ScannerPoolStake => "scanner_pool_stake",
            Self::TransferShares => "transfer_shares",
            Self::Upgrade => "upgrade",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
