//! Per-role event decoders.
//!
//! Each registry role has a closed enum of the events it understands. A log
//! whose first topic is not one of them decodes to `Ok(None)`; a log whose
//! topic matches but whose payload does not is a decode error.

use alloy_primitives::{Address, B256};
use alloy_sol_types::SolEvent;

use chainregistry_core::contracts::ContractRole;
use chainregistry_core::error::ListenerError;
use chainregistry_core::types::Log;

use crate::bindings::{
    AgentRegistry, Dispatch, FortaStaking, ScannerNodeVersion, ScannerPoolRegistry,
    ScannerRegistry, StakeAllocator, Upgraded,
};

/// Decode `log` as event `E`, validating the topic count and signature.
fn decode_as<E: SolEvent>(log: &Log) -> Result<E, ListenerError> {
    E::decode_raw_log(log.topics.iter().copied(), &log.data, true)
        .map_err(|e| ListenerError::decode(E::SIGNATURE, e))
}

/// Decode the shared proxy `Upgraded` event.
pub fn decode_upgraded(log: &Log) -> Result<Upgraded, ListenerError> {
    decode_as(log)
}

// ─── Role events ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerRegistryEvent {
    ScannerUpdated(ScannerRegistry::ScannerUpdated),
    ScannerEnabled(ScannerRegistry::ScannerEnabled),
    StakeThresholdChanged(ScannerRegistry::StakeThresholdChanged),
}

impl ScannerRegistryEvent {
    pub fn decode(log: &Log) -> Result<Option<Self>, ListenerError> {
        use ScannerRegistry::*;
        let event = match log.topic0().copied() {
            Some(<ScannerUpdated as SolEvent>::SIGNATURE_HASH) => {
                Self::ScannerUpdated(decode_as(log)?)
            }
            Some(<ScannerEnabled as SolEvent>::SIGNATURE_HASH) => {
                Self::ScannerEnabled(decode_as(log)?)
            }
            Some(<StakeThresholdChanged as SolEvent>::SIGNATURE_HASH) => {
                Self::StakeThresholdChanged(decode_as(log)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn topics() -> Vec<B256> {
        use ScannerRegistry::*;
        vec![
            ScannerUpdated::SIGNATURE_HASH,
            ScannerEnabled::SIGNATURE_HASH,
            StakeThresholdChanged::SIGNATURE_HASH,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerPoolRegistryEvent {
    ScannerUpdated(ScannerPoolRegistry::ScannerUpdated),
    ManagedStakeThresholdChanged(ScannerPoolRegistry::ManagedStakeThresholdChanged),
    Transfer(ScannerPoolRegistry::Transfer),
    ScannerPoolRegistered(ScannerPoolRegistry::ScannerPoolRegistered),
    EnabledScannersChanged(ScannerPoolRegistry::EnabledScannersChanged),
}

impl ScannerPoolRegistryEvent {
    pub fn decode(log: &Log) -> Result<Option<Self>, ListenerError> {
        use ScannerPoolRegistry::*;
        let event = match log.topic0().copied() {
            Some(<ScannerUpdated as SolEvent>::SIGNATURE_HASH) => {
                Self::ScannerUpdated(decode_as(log)?)
            }
            Some(<ManagedStakeThresholdChanged as SolEvent>::SIGNATURE_HASH) => {
                Self::ManagedStakeThresholdChanged(decode_as(log)?)
            }
            Some(<Transfer as SolEvent>::SIGNATURE_HASH) => Self::Transfer(decode_as(log)?),
            Some(<ScannerPoolRegistered as SolEvent>::SIGNATURE_HASH) => {
                Self::ScannerPoolRegistered(decode_as(log)?)
            }
            Some(<EnabledScannersChanged as SolEvent>::SIGNATURE_HASH) => {
                Self::EnabledScannersChanged(decode_as(log)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn topics() -> Vec<B256> {
        use ScannerPoolRegistry::*;
        vec![
            ScannerUpdated::SIGNATURE_HASH,
            ManagedStakeThresholdChanged::SIGNATURE_HASH,
            Transfer::SIGNATURE_HASH,
            ScannerPoolRegistered::SIGNATURE_HASH,
            EnabledScannersChanged::SIGNATURE_HASH,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentRegistryEvent {
    AgentUpdated(AgentRegistry::AgentUpdated),
    AgentEnabled(AgentRegistry::AgentEnabled),
    StakeThresholdChanged(AgentRegistry::StakeThresholdChanged),
}

impl AgentRegistryEvent {
    pub fn decode(log: &Log) -> Result<Option<Self>, ListenerError> {
        use AgentRegistry::*;
        let event = match log.topic0().copied() {
            Some(<AgentUpdated as SolEvent>::SIGNATURE_HASH) => Self::AgentUpdated(decode_as(log)?),
            Some(<AgentEnabled as SolEvent>::SIGNATURE_HASH) => Self::AgentEnabled(decode_as(log)?),
            Some(<StakeThresholdChanged as SolEvent>::SIGNATURE_HASH) => {
                Self::StakeThresholdChanged(decode_as(log)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn topics() -> Vec<B256> {
        use AgentRegistry::*;
        vec![
            AgentUpdated::SIGNATURE_HASH,
            AgentEnabled::SIGNATURE_HASH,
            StakeThresholdChanged::SIGNATURE_HASH,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerNodeVersionEvent {
    ScannerNodeVersionUpdated(ScannerNodeVersion::ScannerNodeVersionUpdated),
}

impl ScannerNodeVersionEvent {
    pub fn decode(log: &Log) -> Result<Option<Self>, ListenerError> {
        use ScannerNodeVersion::*;
        match log.topic0().copied() {
            Some(<ScannerNodeVersionUpdated as SolEvent>::SIGNATURE_HASH) => {
                Ok(Some(Self::ScannerNodeVersionUpdated(decode_as(log)?)))
            }
            _ => Ok(None),
        }
    }

    pub fn topics() -> Vec<B256> {
        vec![ScannerNodeVersion::ScannerNodeVersionUpdated::SIGNATURE_HASH]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeAllocatorEvent {
    AllocatedStake(StakeAllocator::AllocatedStake),
}

impl StakeAllocatorEvent {
    pub fn decode(log: &Log) -> Result<Option<Self>, ListenerError> {
        use StakeAllocator::*;
        match log.topic0().copied() {
            Some(<AllocatedStake as SolEvent>::SIGNATURE_HASH) => {
                Ok(Some(Self::AllocatedStake(decode_as(log)?)))
            }
            _ => Ok(None),
        }
    }

    pub fn topics() -> Vec<B256> {
        vec![StakeAllocator::AllocatedStake::SIGNATURE_HASH]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Link(Dispatch::Link),
    AlreadyLinked(Dispatch::AlreadyLinked),
}

impl DispatchEvent {
    pub fn decode(log: &Log) -> Result<Option<Self>, ListenerError> {
        use Dispatch::*;
        let event = match log.topic0().copied() {
            Some(<Link as SolEvent>::SIGNATURE_HASH) => Self::Link(decode_as(log)?),
            Some(<AlreadyLinked as SolEvent>::SIGNATURE_HASH) => {
                Self::AlreadyLinked(decode_as(log)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn topics() -> Vec<B256> {
        vec![
            Dispatch::Link::SIGNATURE_HASH,
            Dispatch::AlreadyLinked::SIGNATURE_HASH,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FortaStakingEvent {
    StakeDeposited(FortaStaking::StakeDeposited),
    WithdrawalInitiated(FortaStaking::WithdrawalInitiated),
    Slashed(FortaStaking::Slashed),
    TransferSingle(FortaStaking::TransferSingle),
    TransferBatch(FortaStaking::TransferBatch),
}

impl FortaStakingEvent {
    pub fn decode(log: &Log) -> Result<Option<Self>, ListenerError> {
        use FortaStaking::*;
        let event = match log.topic0().copied() {
            Some(<StakeDeposited as SolEvent>::SIGNATURE_HASH) => {
                Self::StakeDeposited(decode_as(log)?)
            }
            Some(<WithdrawalInitiated as SolEvent>::SIGNATURE_HASH) => {
                Self::WithdrawalInitiated(decode_as(log)?)
            }
            Some(<Slashed as SolEvent>::SIGNATURE_HASH) => Self::Slashed(decode_as(log)?),
            Some(<TransferSingle as SolEvent>::SIGNATURE_HASH) => {
                Self::TransferSingle(decode_as(log)?)
            }
            Some(<TransferBatch as SolEvent>::SIGNATURE_HASH) => {
                let batch: TransferBatch = decode_as(log)?;
                if batch.ids.len() != batch.values.len() {
                    return Err(ListenerError::decode(
                        TransferBatch::SIGNATURE,
                        format!(
                            "{} ids but {} values",
                            batch.ids.len(),
                            batch.values.len()
                        ),
                    ));
                }
                Self::TransferBatch(batch)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn topics() -> Vec<B256> {
        use FortaStaking::*;
        vec![
            StakeDeposited::SIGNATURE_HASH,
            WithdrawalInitiated::SIGNATURE_HASH,
            Slashed::SIGNATURE_HASH,
            TransferSingle::SIGNATURE_HASH,
            TransferBatch::SIGNATURE_HASH,
        ]
    }
}

// ─── RegistryEvent ───────────────────────────────────────────────────────────

/// A decoded event, tagged with the role that emitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    ScannerRegistry(ScannerRegistryEvent),
    ScannerPoolRegistry(ScannerPoolRegistryEvent),
    AgentRegistry(AgentRegistryEvent),
    ScannerNodeVersion(ScannerNodeVersionEvent),
    StakeAllocator(StakeAllocatorEvent),
    Dispatch(DispatchEvent),
    FortaStaking(FortaStakingEvent),
}

/// Topics understood for `role`.
pub fn role_topics(role: ContractRole) -> Vec<B256> {
    match role {
        ContractRole::ScannerRegistry => ScannerRegistryEvent::topics(),
        ContractRole::ScannerPoolRegistry => ScannerPoolRegistryEvent::topics(),
        ContractRole::AgentRegistry => AgentRegistryEvent::topics(),
        ContractRole::Dispatch => DispatchEvent::topics(),
        ContractRole::FortaStaking => FortaStakingEvent::topics(),
        ContractRole::ScannerNodeVersion => ScannerNodeVersionEvent::topics(),
        ContractRole::StakeAllocator => StakeAllocatorEvent::topics(),
    }
}

/// Every topic the router understands, plus the shared `Upgraded` topic.
pub fn default_topics() -> Vec<B256> {
    let mut topics = vec![Upgraded::SIGNATURE_HASH];
    for role in ContractRole::ROUTING_ORDER {
        for topic in role_topics(role) {
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
    }
    topics
}

// ─── ContractBinding ─────────────────────────────────────────────────────────

/// A role's decoder bound to the role's deployed address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractBinding {
    pub role: ContractRole,
    pub address: Address,
}

impl ContractBinding {
    pub fn new(role: ContractRole, address: Address) -> Self {
        Self { role, address }
    }

    /// Decode a log emitted by the bound contract.
    ///
    /// Logs from any other address decode to `Ok(None)`.
    pub fn decode(&self, log: &Log) -> Result<Option<RegistryEvent>, ListenerError> {
        if log.address != self.address {
            return Ok(None);
        }
        let event = match self.role {
            ContractRole::ScannerRegistry => {
                ScannerRegistryEvent::decode(log)?.map(RegistryEvent::ScannerRegistry)
            }
            ContractRole::ScannerPoolRegistry => {
                ScannerPoolRegistryEvent::decode(log)?.map(RegistryEvent::ScannerPoolRegistry)
            }
            ContractRole::AgentRegistry => {
                AgentRegistryEvent::decode(log)?.map(RegistryEvent::AgentRegistry)
            }
            ContractRole::ScannerNodeVersion => {
                ScannerNodeVersionEvent::decode(log)?.map(RegistryEvent::ScannerNodeVersion)
            }
            ContractRole::StakeAllocator => {
                StakeAllocatorEvent::decode(log)?.map(RegistryEvent::StakeAllocator)
            }
            ContractRole::Dispatch => DispatchEvent::decode(log)?.map(RegistryEvent::Dispatch),
            ContractRole::FortaStaking => {
                FortaStakingEvent::decode(log)?.map(RegistryEvent::FortaStaking)
            }
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, U256};

    fn log_of<E: SolEvent>(address: Address, event: &E) -> Log {
        let data = event.encode_log_data();
        Log {
            address,
            topics: data.topics().to_vec(),
            data: data.data,
            block_number: 1,
            ..Default::default()
        }
    }

    #[test]
    fn decodes_known_topic() {
        let evt = ScannerRegistry::ScannerEnabled {
            scannerId: U256::from(5),
            enabled: true,
            permission: 2,
            value: true,
        };
        let log = log_of(Address::repeat_byte(1), &evt);
        let decoded = ScannerRegistryEvent::decode(&log).unwrap();
        assert_eq!(decoded, Some(ScannerRegistryEvent::ScannerEnabled(evt)));
    }

    #[test]
    fn unknown_topic_is_none() {
        let evt = Dispatch::Link {
            agentId: U256::from(1),
            scannerId: U256::from(2),
            enable: true,
        };
        let log = log_of(Address::repeat_byte(1), &evt);
        assert_eq!(ScannerRegistryEvent::decode(&log).unwrap(), None);
        assert_eq!(AgentRegistryEvent::decode(&Log::default()).unwrap(), None);
    }

    #[test]
    fn truncated_payload_is_decode_error() {
        let evt = ScannerNodeVersion::ScannerNodeVersionUpdated {
            newVersion: "QmNew".into(),
            oldVersion: "QmOld".into(),
        };
        let mut log = log_of(Address::repeat_byte(1), &evt);
        log.data = Bytes::from(vec![0u8; 8]);
        let err = ScannerNodeVersionEvent::decode(&log).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn batch_length_mismatch_is_decode_error() {
        let evt = FortaStaking::TransferBatch {
            operator: Address::repeat_byte(1),
            from: Address::repeat_byte(2),
            to: Address::repeat_byte(3),
            ids: vec![U256::from(1), U256::from(2)],
            values: vec![U256::from(10)],
        };
        let log = log_of(Address::repeat_byte(9), &evt);
        assert!(FortaStakingEvent::decode(&log).unwrap_err().is_decode());
    }

    #[test]
    fn binding_ignores_other_addresses() {
        let evt = Dispatch::AlreadyLinked {
            agentId: U256::from(1),
            scannerId: U256::from(2),
            enable: false,
        };
        let binding = ContractBinding::new(ContractRole::Dispatch, Address::repeat_byte(7));
        let foreign = log_of(Address::repeat_byte(8), &evt);
        assert_eq!(binding.decode(&foreign).unwrap(), None);

        let own = log_of(Address::repeat_byte(7), &evt);
        assert_eq!(
            binding.decode(&own).unwrap(),
            Some(RegistryEvent::Dispatch(DispatchEvent::AlreadyLinked(evt)))
        );
    }

    #[test]
    fn default_topics_cover_every_role() {
        let topics = default_topics();
        assert_eq!(topics[0], Upgraded::SIGNATURE_HASH);
        for role in ContractRole::ROUTING_ORDER {
            for topic in role_topics(role) {
                assert!(topics.contains(&topic), "missing topic for {role}");
            }
        }
        // 3 + 5 + 3 + 1 + 1 + 2 + 5 role topics, plus Upgraded
        assert_eq!(topics.len(), 21);
    }
}
