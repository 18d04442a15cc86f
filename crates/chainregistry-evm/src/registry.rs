//! Contract address registry: role → current address + bound decoder.

use alloy_primitives::Address;
use tracing::info;

use chainregistry_core::client::RegistryStateClient;
use chainregistry_core::contracts::{ContractAddresses, ContractFilter, ContractRole};
use chainregistry_core::error::ListenerError;

use crate::decoder::ContractBinding;

/// The live set of registry contracts.
///
/// Owned by the listener and only mutated inside its serialized handling
/// section. A refresh replaces every binding at once, so no decoder bound to
/// a previous address survives it.
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    addresses: ContractAddresses,
    bindings: Vec<ContractBinding>,
    refreshes: u64,
}

impl ContractRegistry {
    pub fn new(addresses: ContractAddresses) -> Self {
        let bindings = bind(&addresses);
        Self {
            addresses,
            bindings,
            refreshes: 0,
        }
    }

    /// Current addresses.
    pub fn addresses(&self) -> &ContractAddresses {
        &self.addresses
    }

    /// Current bindings, in routing order.
    pub fn bindings(&self) -> &[ContractBinding] {
        &self.bindings
    }

    /// Number of refreshes applied since construction.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    /// The binding whose address equals `address`, first match in routing order.
    pub fn binding_for(&self, address: &Address) -> Option<&ContractBinding> {
        self.bindings.iter().find(|b| &b.address == address)
    }

    /// The role currently deployed at `address`.
    pub fn role_of(&self, address: &Address) -> Option<ContractRole> {
        self.binding_for(address).map(|b| b.role)
    }

    /// Re-resolve every address from `client` and rebind all decoders.
    ///
    /// On failure the current set is left untouched.
    pub async fn refresh(
        &mut self,
        client: &dyn RegistryStateClient,
    ) -> Result<&ContractAddresses, ListenerError> {
        let addresses = client.refresh_contracts().await?;
        self.bindings = bind(&addresses);
        self.addresses = addresses;
        self.refreshes += 1;
        info!(
            refreshes = self.refreshes,
            contracts = self.bindings.len(),
            "Registry contracts refreshed"
        );
        Ok(&self.addresses)
    }

    /// Addresses to subscribe to under `filter`.
    pub fn filter_addresses(
        &self,
        filter: Option<&ContractFilter>,
    ) -> Result<Vec<Address>, ListenerError> {
        ContractFilter::resolve(filter, &self.addresses)
    }
}

fn bind(addresses: &ContractAddresses) -> Vec<ContractBinding> {
    ContractRole::ROUTING_ORDER
        .into_iter()
        .filter_map(|role| addresses.get(role).map(|a| ContractBinding::new(role, a)))
        .collect()
}
