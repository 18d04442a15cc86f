//! Standalone proxy-upgrade watcher.
//!
//! For processes that do not run a full listener but still need the
//! registry client's contract addresses to follow proxy upgrades.

use alloy_sol_types::SolEvent;
use futures::{Stream, StreamExt};
use tracing::info;

use chainregistry_core::client::RegistryStateClient;
use chainregistry_core::error::ListenerError;
use chainregistry_core::types::{BlockSummary, Log};

use crate::bindings::Upgraded;

/// One block and its logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLogs {
    pub block: BlockSummary,
    pub logs: Vec<Log>,
}

/// Refresh `client`'s contracts whenever a known registry contract emits
/// `Upgraded`.
///
/// At most one refresh per block. Returns the number of refreshes once the
/// feed ends; the first feed or refresh error ends the watch.
pub async fn watch_upgrades<S>(client: &dyn RegistryStateClient, feed: S) -> Result<u64, ListenerError>
where
    S: Stream<Item = Result<BlockLogs, ListenerError>>,
{
    futures::pin_mut!(feed);
    let mut refreshes = 0;
    while let Some(item) = feed.next().await {
        let BlockLogs { block, logs } = item?;
        let contracts = client.contracts();
        let upgraded = logs.iter().find(|log| {
            log.has_topic0(&Upgraded::SIGNATURE_HASH) && contracts.role_of(&log.address).is_some()
        });
        if let Some(log) = upgraded {
            info!(
                block = block.number,
                proxy = %log.address,
                role = ?contracts.role_of(&log.address),
                "Registry contract upgraded, refreshing"
            );
            client.refresh_contracts().await?;
            refreshes += 1;
        }
    }
    Ok(refreshes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use chainregistry_core::contracts::{ContractAddresses, ContractRole};
    use chainregistry_core::memory::{synthetic_block, MemoryRegistryClient};

    fn upgraded_log(address: Address) -> Log {
        let data = Upgraded {
            implementation: Address::repeat_byte(0xee),
        }
        .encode_log_data();
        Log {
            address,
            topics: data.topics().to_vec(),
            data: data.data,
            ..Default::default()
        }
    }

    fn client() -> MemoryRegistryClient {
        MemoryRegistryClient::new(
            ContractAddresses::default().with(ContractRole::Dispatch, Address::repeat_byte(0x01)),
        )
    }

    #[tokio::test]
    async fn refreshes_once_per_block() {
        let client = client();
        let known = Address::repeat_byte(0x01);
        let feed = futures::stream::iter(vec![
            Ok(BlockLogs {
                block: synthetic_block(1),
                logs: vec![upgraded_log(known), upgraded_log(known)],
            }),
            Ok(BlockLogs {
                block: synthetic_block(2),
                logs: vec![upgraded_log(Address::repeat_byte(0x99))],
            }),
            Ok(BlockLogs {
                block: synthetic_block(3),
                logs: vec![Log::default()],
            }),
        ]);

        let refreshes = watch_upgrades(&client, feed).await.unwrap();
        assert_eq!(refreshes, 1);
        assert_eq!(client.refresh_count(), 1);
    }

    #[tokio::test]
    async fn refresh_error_ends_watch() {
        let client = client();
        client.fail_refreshes();
        let feed = futures::stream::iter(vec![Ok(BlockLogs {
            block: synthetic_block(1),
            logs: vec![upgraded_log(Address::repeat_byte(0x01))],
        })]);
        assert!(matches!(
            watch_upgrades(&client, feed).await,
            Err(ListenerError::Refresh(_))
        ));
    }
}
