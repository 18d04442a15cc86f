//! Event router: turns one raw log into zero or more registry messages.
//!
//! Resolution order for every log:
//! 1. the shared `Upgraded` topic, regardless of address: refresh the
//!    contract registry, extend the log source's address filter and emit an
//!    upgrade message;
//! 2. exact address match against the bound roles, in routing order;
//! 3. first-topic dispatch to the role's interpreter.
//!
//! Unknown addresses and topics yield no messages. Event fields that can be
//! stale by the time a log is processed (enablement) are reconciled against
//! the registry state client.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolEvent;
use tracing::{debug, debug_span, warn, Instrument};

use chainregistry_core::client::{LogSource, RegistryStateClient};
use chainregistry_core::contracts::ContractFilter;
use chainregistry_core::error::ListenerError;
use chainregistry_core::message::*;
use chainregistry_core::subject::{agent_id_hex, pool_id, scanner_id_hex, SubjectType};
use chainregistry_core::types::{BlockSummary, Log};

use crate::bindings::Upgraded;
use crate::decoder::{
    decode_upgraded, AgentRegistryEvent, DispatchEvent, FortaStakingEvent, RegistryEvent,
    ScannerNodeVersionEvent, ScannerPoolRegistryEvent, ScannerRegistryEvent, StakeAllocatorEvent,
};
use crate::registry::ContractRegistry;

/// Routes logs to role interpreters.
pub struct EventRouter {
    client: Arc<dyn RegistryStateClient>,
    log_source: Arc<dyn LogSource>,
    filter: Option<ContractFilter>,
}

impl EventRouter {
    pub fn new(
        client: Arc<dyn RegistryStateClient>,
        log_source: Arc<dyn LogSource>,
        filter: Option<ContractFilter>,
    ) -> Self {
        Self {
            client,
            log_source,
            filter,
        }
    }

    /// Route one log. The caller must hold exclusive access to `registry`
    /// for the whole call.
    pub async fn route(
        &self,
        registry: &mut ContractRegistry,
        block: &BlockSummary,
        log: &Log,
    ) -> Result<Vec<RegistryMessage>, ListenerError> {
        let span = debug_span!(
            "route",
            block = log.block_number,
            tx_hash = %log.tx_hash,
            log_index = log.log_index,
            address = %log.address,
        );
        self.route_inner(registry, block, log).instrument(span).await
    }

    async fn route_inner(
        &self,
        registry: &mut ContractRegistry,
        block: &BlockSummary,
        log: &Log,
    ) -> Result<Vec<RegistryMessage>, ListenerError> {
        if log.has_topic0(&Upgraded::SIGNATURE_HASH) {
            return self.handle_upgrade(registry, block, log).await;
        }

        let Some(binding) = registry.binding_for(&log.address) else {
            debug!("log from unknown address, ignoring");
            return Ok(Vec::new());
        };
        let role = binding.role;
        let Some(event) = binding.decode(log)? else {
            debug!(%role, topic = ?log.topic0(), "unhandled topic, ignoring");
            return Ok(Vec::new());
        };

        let source = Source::new(block, log);
        match event {
            RegistryEvent::ScannerRegistry(e) => self.scanner_registry(e, source).await,
            RegistryEvent::ScannerPoolRegistry(e) => self.scanner_pool_registry(e, source).await,
            RegistryEvent::AgentRegistry(e) => self.agent_registry(e, source).await,
            RegistryEvent::ScannerNodeVersion(e) => Ok(scanner_node_version(e, source)),
            RegistryEvent::StakeAllocator(e) => Ok(stake_allocator(e, source)),
            RegistryEvent::Dispatch(e) => Ok(dispatch(e, source)),
            RegistryEvent::FortaStaking(e) => Ok(forta_staking(e, source)),
        }
    }

    /// Refresh contracts and the address filter, then report the upgrade.
    async fn handle_upgrade(
        &self,
        registry: &mut ContractRegistry,
        block: &BlockSummary,
        log: &Log,
    ) -> Result<Vec<RegistryMessage>, ListenerError> {
        registry.refresh(self.client.as_ref()).await?;
        for address in registry.filter_addresses(self.filter.as_ref())? {
            self.log_source.add_address(address);
        }

        let upgraded = decode_upgraded(log)?;
        debug!(implementation = %upgraded.implementation, "proxy upgraded");
        Ok(vec![RegistryMessage::Upgrade(Upgrade {
            source: Source::new(block, log),
            proxy: log.address,
            implementation: upgraded.implementation,
        })])
    }

    async fn scanner_registry(
        &self,
        event: ScannerRegistryEvent,
        source: Source,
    ) -> Result<Vec<RegistryMessage>, ListenerError> {
        let msg = match event {
            ScannerRegistryEvent::ScannerUpdated(e) => {
                let scanner_id = scanner_id_hex(e.scannerId);
                let enabled = self.client.is_enabled_scanner(&scanner_id).await?;
                RegistryMessage::ScannerSave(ScannerSave {
                    source,
                    scanner_id,
                    chain_id: e.chainId,
                    metadata: e.metadata,
                    enabled,
                    scanner_pool_id: None,
                })
            }
            ScannerRegistryEvent::ScannerEnabled(e) => {
                let scanner_id = scanner_id_hex(e.scannerId);
                // sunsetting can disable a scanner regardless of the event
                let current = self.client.is_enabled_scanner(&scanner_id).await?;
                RegistryMessage::ScannerEnablement(ScannerEnablement {
                    source,
                    scanner_id,
                    enabled: current && e.enabled,
                    permission: e.permission,
                    value: e.value,
                })
            }
            ScannerRegistryEvent::StakeThresholdChanged(e) => {
                RegistryMessage::ScannerStakeThreshold(StakeThreshold {
                    source,
                    chain_id: Some(e.chainId),
                    min: e.min,
                    max: e.max,
                    activated: e.activated,
                })
            }
        };
        Ok(vec![msg])
    }

    async fn scanner_pool_registry(
        &self,
        event: ScannerPoolRegistryEvent,
        source: Source,
    ) -> Result<Vec<RegistryMessage>, ListenerError> {
        let msg = match event {
            ScannerPoolRegistryEvent::ScannerUpdated(e) => {
                let scanner_id = scanner_id_hex(e.scannerId);
                let enabled = self.client.is_enabled_scanner(&scanner_id).await?;
                RegistryMessage::ScannerSave(ScannerSave {
                    source,
                    scanner_id,
                    chain_id: e.chainId,
                    metadata: e.metadata,
                    enabled,
                    scanner_pool_id: Some(pool_id(e.scannerPool)),
                })
            }
            ScannerPoolRegistryEvent::ManagedStakeThresholdChanged(e) => {
                RegistryMessage::ScannerManagedStakeThreshold(StakeThreshold {
                    source,
                    chain_id: Some(e.chainId),
                    min: e.min,
                    max: e.max,
                    activated: e.activated,
                })
            }
            ScannerPoolRegistryEvent::Transfer(e) => {
                // a transfer from zero is the mint, not an ownership change
                if e.from.is_zero() {
                    return Ok(Vec::new());
                }
                RegistryMessage::ScannerPoolTransfer(ScannerPoolTransfer {
                    source,
                    scanner_pool_id: pool_id(e.tokenId),
                    from: e.from,
                    to: e.to,
                })
            }
            ScannerPoolRegistryEvent::ScannerPoolRegistered(e) => {
                let owner = self.client.scanner_pool_owner(e.scannerPoolId).await?;
                RegistryMessage::ScannerPoolRegistration(ScannerPoolRegistration {
                    source,
                    scanner_pool_id: pool_id(e.scannerPoolId),
                    chain_id: e.chainId,
                    owner,
                })
            }
            ScannerPoolRegistryEvent::EnabledScannersChanged(e) => {
                RegistryMessage::ScannerPoolEnablement(ScannerPoolEnablement {
                    source,
                    scanner_pool_id: pool_id(e.scannerPoolId),
                    enabled_scanners: e.enabledScanners,
                })
            }
        };
        Ok(vec![msg])
    }

    async fn agent_registry(
        &self,
        event: AgentRegistryEvent,
        source: Source,
    ) -> Result<Vec<RegistryMessage>, ListenerError> {
        let msg = match event {
            AgentRegistryEvent::AgentUpdated(e) => {
                let agent_id = agent_id_hex(e.agentId);
                let agent = self.client.agent(&agent_id).await?;
                RegistryMessage::AgentSave(AgentSave {
                    source,
                    agent_id,
                    by: e.by,
                    metadata: e.metadata,
                    chain_ids: e.chainIds,
                    enabled: agent.enabled,
                })
            }
            // taken as-is, no current-state reconciliation for agents
            AgentRegistryEvent::AgentEnabled(e) => RegistryMessage::AgentEnablement(AgentEnablement {
                source,
                agent_id: agent_id_hex(e.agentId),
                enabled: e.enabled,
                permission: e.permission,
                value: e.value,
            }),
            AgentRegistryEvent::StakeThresholdChanged(e) => {
                RegistryMessage::AgentStakeThreshold(StakeThreshold {
                    source,
                    chain_id: None,
                    min: e.min,
                    max: e.max,
                    activated: e.activated,
                })
            }
        };
        Ok(vec![msg])
    }
}

fn scanner_node_version(event: ScannerNodeVersionEvent, source: Source) -> Vec<RegistryMessage> {
    match event {
        ScannerNodeVersionEvent::ScannerNodeVersionUpdated(e) => {
            vec![RegistryMessage::ScannerNodeVersion(ScannerNodeVersion {
                source,
                new_version: e.newVersion,
                old_version: e.oldVersion,
            })]
        }
    }
}

fn stake_allocator(event: StakeAllocatorEvent, source: Source) -> Vec<RegistryMessage> {
    match event {
        StakeAllocatorEvent::AllocatedStake(e) => {
            vec![RegistryMessage::StakeAllocation(StakeAllocation {
                source,
                subject_type: e.subjectType,
                // allocations target pools, keyed by decimal id
                subject_id: pool_id(e.subject),
                increase: e.increase,
                amount: e.amount,
                total_allocated: e.totalAllocated,
            })]
        }
    }
}

fn dispatch(event: DispatchEvent, source: Source) -> Vec<RegistryMessage> {
    let (agent_id, scanner_id, enable, already_linked) = match event {
        DispatchEvent::Link(e) => (e.agentId, e.scannerId, e.enable, false),
        DispatchEvent::AlreadyLinked(e) => (e.agentId, e.scannerId, e.enable, true),
    };
    vec![RegistryMessage::Dispatch(DispatchLink {
        source,
        agent_id: agent_id_hex(agent_id),
        scanner_id: scanner_id_hex(scanner_id),
        enable,
        already_linked,
    })]
}

/// Stake movement common to deposits, withdrawals and slashes.
struct StakeMovement {
    subject_type: u8,
    subject: U256,
    change: ChangeType,
    account: Option<Address>,
    value: Option<U256>,
}

fn forta_staking(event: FortaStakingEvent, source: Source) -> Vec<RegistryMessage> {
    let movement = match event {
        FortaStakingEvent::StakeDeposited(e) => StakeMovement {
            subject_type: e.subjectType,
            subject: e.subject,
            change: ChangeType::Deposit,
            account: Some(e.account),
            value: Some(e.amount),
        },
        FortaStakingEvent::WithdrawalInitiated(e) => StakeMovement {
            subject_type: e.subjectType,
            subject: e.subject,
            change: ChangeType::Withdrawal,
            account: Some(e.account),
            value: None,
        },
        FortaStakingEvent::Slashed(e) => StakeMovement {
            subject_type: e.subjectType,
            subject: e.subject,
            change: ChangeType::Slash,
            account: None,
            value: Some(e.value),
        },
        FortaStakingEvent::TransferSingle(e) => {
            return vec![RegistryMessage::ShareTransfer(ShareTransfer {
                source,
                operator: e.operator,
                from: e.from,
                to: e.to,
                share_id: e.id,
                value: e.value,
            })];
        }
        FortaStakingEvent::TransferBatch(e) => {
            return e
                .ids
                .into_iter()
                .zip(e.values)
                .map(|(share_id, value)| {
                    RegistryMessage::ShareTransfer(ShareTransfer {
                        source: source.clone(),
                        operator: e.operator,
                        from: e.from,
                        to: e.to,
                        share_id,
                        value,
                    })
                })
                .collect();
        }
    };

    let Some(subject_type) = SubjectType::from_tag(movement.subject_type) else {
        warn!(subject_type = movement.subject_type, "unhandled subject type, ignoring");
        return Vec::new();
    };
    let change = StakeChange {
        source,
        subject_type,
        subject_id: subject_type.encode_id(movement.subject),
        change: movement.change,
        account: movement.account,
        value: movement.value,
    };
    let msg = match subject_type {
        SubjectType::Scanner => RegistryMessage::ScannerStake(change),
        SubjectType::Agent => RegistryMessage::AgentStake(change),
        SubjectType::ScannerPool => RegistryMessage::ScannerPoolStake(change),
    };
    vec![msg]
}
