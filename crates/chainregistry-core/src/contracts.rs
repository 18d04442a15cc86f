//! Registry contract roles, their current addresses, and the subscription filter.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::ListenerError;

/// A logical registry contract whose deployed address can change through a
/// proxy upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractRole {
    ScannerRegistry,
    ScannerPoolRegistry,
    AgentRegistry,
    Dispatch,
    FortaStaking,
    ScannerNodeVersion,
    StakeAllocator,
}

impl ContractRole {
    /// Every role, in the order a log address is matched against them.
    pub const ROUTING_ORDER: [ContractRole; 7] = [
        ContractRole::ScannerRegistry,
        ContractRole::ScannerNodeVersion,
        ContractRole::AgentRegistry,
        ContractRole::Dispatch,
        ContractRole::FortaStaking,
        ContractRole::ScannerPoolRegistry,
        ContractRole::StakeAllocator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScannerRegistry => "scanner_registry",
            Self::ScannerPoolRegistry => "scanner_pool_registry",
            Self::AgentRegistry => "agent_registry",
            Self::Dispatch => "dispatch",
            Self::FortaStaking => "forta_staking",
            Self::ScannerNodeVersion => "scanner_node_version",
            Self::StakeAllocator => "stake_allocator",
        }
    }
}

impl std::fmt::Display for ContractRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── ContractAddresses ───────────────────────────────────────────────────────

/// Current deployed address of every registry role.
///
/// A role is absent when it is `None` or the zero address; deployments that
/// predate scanner pools have no pool registry and no stake allocator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub scanner_registry: Option<Address>,
    pub scanner_pool_registry: Option<Address>,
    pub agent_registry: Option<Address>,
    pub dispatch: Option<Address>,
    pub forta_staking: Option<Address>,
    pub scanner_node_version: Option<Address>,
    pub stake_allocator: Option<Address>,
}

impl ContractAddresses {
    /// The address currently bound to `role`, if the role is deployed.
    pub fn get(&self, role: ContractRole) -> Option<Address> {
        let addr = match role {
            ContractRole::ScannerRegistry => self.scanner_registry,
            ContractRole::ScannerPoolRegistry => self.scanner_pool_registry,
            ContractRole::AgentRegistry => self.agent_registry,
            ContractRole::Dispatch => self.dispatch,
            ContractRole::FortaStaking => self.forta_staking,
            ContractRole::ScannerNodeVersion => self.scanner_node_version,
            ContractRole::StakeAllocator => self.stake_allocator,
        };
        addr.filter(|a| !a.is_zero())
    }

    /// Set (or clear) the address of `role`.
    pub fn set(&mut self, role: ContractRole, address: Option<Address>) {
        let slot = match role {
            ContractRole::ScannerRegistry => &mut self.scanner_registry,
            ContractRole::ScannerPoolRegistry => &mut self.scanner_pool_registry,
            ContractRole::AgentRegistry => &mut self.agent_registry,
            ContractRole::Dispatch => &mut self.dispatch,
            ContractRole::FortaStaking => &mut self.forta_staking,
            ContractRole::ScannerNodeVersion => &mut self.scanner_node_version,
            ContractRole::StakeAllocator => &mut self.stake_allocator,
        };
        *slot = address;
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, role: ContractRole, address: Address) -> Self {
        self.set(role, Some(address));
        self
    }

    /// The role whose address equals `address`, in routing order.
    pub fn role_of(&self, address: &Address) -> Option<ContractRole> {
        ContractRole::ROUTING_ORDER
            .into_iter()
            .find(|role| self.get(*role).as_ref() == Some(address))
    }

    /// All deployed addresses, in routing order.
    pub fn all(&self) -> Vec<Address> {
        ContractRole::ROUTING_ORDER
            .into_iter()
            .filter_map(|role| self.get(role))
            .collect()
    }
}

// ─── ContractFilter ──────────────────────────────────────────────────────────

/// Selects which roles' addresses the log source subscribes to.
///
/// A filter with no flag set selects every deployed role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractFilter {
    pub agent_registry: bool,
    pub scanner_registry: bool,
    pub scanner_pool_registry: bool,
    pub dispatch: bool,
    pub forta_staking: bool,
    pub scanner_node_version: bool,
    pub stake_allocator: bool,
}

impl ContractFilter {
    /// Filter selecting only the given roles.
    pub fn only(roles: &[ContractRole]) -> Self {
        let mut filter = Self::default();
        for role in roles {
            *filter.flag_mut(*role) = true;
        }
        filter
    }

    /// Returns `true` if `role` is selected by an explicit flag.
    pub fn includes(&self, role: ContractRole) -> bool {
        match role {
            ContractRole::ScannerRegistry => self.scanner_registry,
            ContractRole::ScannerPoolRegistry => self.scanner_pool_registry,
            ContractRole::AgentRegistry => self.agent_registry,
            ContractRole::Dispatch => self.dispatch,
            ContractRole::FortaStaking => self.forta_staking,
            ContractRole::ScannerNodeVersion => self.scanner_node_version,
            ContractRole::StakeAllocator => self.stake_allocator,
        }
    }

    /// Returns `true` if no flag is set.
    pub fn is_empty(&self) -> bool {
        !ContractRole::ROUTING_ORDER
            .into_iter()
            .any(|role| self.includes(role))
    }

    fn flag_mut(&mut self, role: ContractRole) -> &mut bool {
        match role {
            ContractRole::ScannerRegistry => &mut self.scanner_registry,
            ContractRole::ScannerPoolRegistry => &mut self.scanner_pool_registry,
            ContractRole::AgentRegistry => &mut self.agent_registry,
            ContractRole::Dispatch => &mut self.dispatch,
            ContractRole::FortaStaking => &mut self.forta_staking,
            ContractRole::ScannerNodeVersion => &mut self.scanner_node_version,
            ContractRole::StakeAllocator => &mut self.stake_allocator,
        }
    }

    /// Resolve the addresses to subscribe to.
    ///
    /// Selected roles that are not deployed are skipped. An empty result is a
    /// configuration error: the listener must never subscribe to nothing.
    pub fn resolve(
        filter: Option<&ContractFilter>,
        addresses: &ContractAddresses,
    ) -> Result<Vec<Address>, ListenerError> {
        let resolved: Vec<Address> = match filter {
            Some(f) if !f.is_empty() => ContractRole::ROUTING_ORDER
                .into_iter()
                .filter(|role| f.includes(*role))
                .filter_map(|role| addresses.get(role))
                .collect(),
            _ => addresses.all(),
        };
        if resolved.is_empty() {
            return Err(ListenerError::Config(
                "contract filter resolved to no addresses".into(),
            ));
        }
        Ok(resolved)
    }
}
