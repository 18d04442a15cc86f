//! End-to-end listener tests over the in-memory collaborators.
//!
//! Every log is built by ABI-encoding the contract's event, so the listener
//! sees exactly what a node would return.

use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;

use chainregistry_core::{
    config::ListenerState,
    contracts::{ContractAddresses, ContractRole},
    handler::{BlockHandler, HandlerRegistry, MessageHandler},
    memory::{synthetic_block, MemoryChain, MemoryLogSource, MemoryRegistryClient},
    message::{MessageKind, RegistryMessage},
    proxy::BroadcastProxy,
    types::{BlockSummary, Log},
    ListenerError,
};
use chainregistry_evm::bindings::{Dispatch, FortaStaking, ScannerRegistry, Upgraded};
use chainregistry_evm::{ListenerBuilder, RegistryListener};

// ─── Helpers ──────────────────────────────────────────────────────────────────

const SCANNERS: Address = Address::new([0x01; 20]);
const DISPATCH: Address = Address::new([0x02; 20]);
const STAKING: Address = Address::new([0x03; 20]);
const NEW_DISPATCH: Address = Address::new([0x22; 20]);

fn contracts() -> ContractAddresses {
    ContractAddresses::default()
        .with(ContractRole::ScannerRegistry, SCANNERS)
        .with(ContractRole::Dispatch, DISPATCH)
        .with(ContractRole::FortaStaking, STAKING)
}

fn log_of<E: SolEvent>(address: Address, event: &E, block_number: u64, log_index: u64) -> Log {
    let data = event.encode_log_data();
    Log {
        address,
        topics: data.topics().to_vec(),
        data: data.data,
        block_number,
        log_index,
        ..Default::default()
    }
}

fn link(agent: u64, scanner: u64) -> Dispatch::Link {
    Dispatch::Link {
        agentId: U256::from(agent),
        scannerId: U256::from(scanner),
        enable: true,
    }
}

/// Records every message of its kind into a shared list.
struct Recorder {
    kind: MessageKind,
    seen: Arc<Mutex<Vec<RegistryMessage>>>,
}

#[async_trait]
impl MessageHandler for Recorder {
    async fn handle(&self, msg: &RegistryMessage) -> Result<(), ListenerError> {
        self.seen.lock().unwrap().push(msg.clone());
        Ok(())
    }
    fn kind(&self) -> MessageKind {
        self.kind
    }
}

/// Fails on the n-th message (1-based), counting every attempt.
struct FailOn {
    n: usize,
    attempts: Arc<Mutex<usize>>,
}

#[async_trait]
impl MessageHandler for FailOn {
    async fn handle(&self, msg: &RegistryMessage) -> Result<(), ListenerError> {
        let mut attempts = self.attempts.lock().unwrap();
        *attempts += 1;
        if *attempts == self.n {
            return Err(ListenerError::Handler {
                kind: msg.kind().to_string(),
                reason: "store unavailable".into(),
            });
        }
        Ok(())
    }
    fn kind(&self) -> MessageKind {
        MessageKind::TransferShares
    }
}

struct BlockCounter(Arc<Mutex<Vec<u64>>>);

#[async_trait]
impl BlockHandler for BlockCounter {
    async fn handle_block(&self, block: &BlockSummary) -> Result<(), ListenerError> {
        self.0.lock().unwrap().push(block.number);
        Ok(())
    }
}

fn recording(kinds: &[MessageKind]) -> (HandlerRegistry, Arc<Mutex<Vec<RegistryMessage>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut handlers = HandlerRegistry::new();
    for kind in kinds {
        handlers.on_message(Arc::new(Recorder {
            kind: *kind,
            seen: seen.clone(),
        }));
    }
    (handlers, seen)
}

struct Harness {
    chain: Arc<MemoryChain>,
    source: Arc<MemoryLogSource>,
    client: Arc<MemoryRegistryClient>,
}

impl Harness {
    fn new(head: u64) -> Self {
        Self {
            chain: Arc::new(MemoryChain::new(head)),
            source: Arc::new(MemoryLogSource::new()),
            client: Arc::new(MemoryRegistryClient::new(contracts())),
        }
    }

    fn builder(&self) -> ListenerBuilder {
        ListenerBuilder::new()
            .name("test")
            .log_source(self.source.clone())
            .chain(self.chain.clone())
            .client(self.client.clone())
    }

    async fn listener(&self, handlers: HandlerRegistry) -> RegistryListener {
        self.builder().handlers(handlers).build().await.unwrap()
    }
}

// ─── Historical processing ────────────────────────────────────────────────────

#[tokio::test]
async fn range_is_partitioned_into_pages() {
    let h = Harness::new(30_000);
    let listener = h.listener(HandlerRegistry::new()).await;

    listener.process_block_range(5, Some(25_004)).await.unwrap();

    let mut fetched = h.source.fetched_ranges();
    fetched.sort();
    assert_eq!(fetched, vec![(5, 10_004), (10_005, 20_004), (20_005, 25_004)]);
    assert_eq!(listener.state(), ListenerState::Stopped);
}

#[tokio::test]
async fn missing_end_resolves_to_chain_height() {
    let h = Harness::new(12_345);
    let listener = h.listener(HandlerRegistry::new()).await;

    listener.process_block_range(10_000, None).await.unwrap();

    assert_eq!(h.source.fetched_ranges(), vec![(10_000, 12_345)]);
}

#[tokio::test]
async fn block_is_fetched_once_for_many_logs() {
    let h = Harness::new(1_000);
    h.source
        .insert_logs((0..5).map(|i| log_of(DISPATCH, &link(i, 100 + i), 50, i)));
    h.source.insert_logs([log_of(DISPATCH, &link(9, 9), 51, 0)]);
    let (handlers, seen) = recording(&[MessageKind::Link]);
    let listener = h.listener(handlers).await;

    listener.process_block_range(0, Some(999)).await.unwrap();

    assert_eq!(h.chain.fetch_count(50), 1);
    assert_eq!(h.chain.fetch_count(51), 1);
    assert_eq!(h.chain.total_fetches(), 2);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 6);
    assert_eq!(seen[0].source().block_number, 50);
    assert_eq!(seen[5].source().block_number, 51);
}

#[tokio::test]
async fn removed_logs_are_skipped() {
    let h = Harness::new(100);
    let mut removed = log_of(DISPATCH, &link(1, 2), 10, 0);
    removed.removed = true;
    h.source.insert_logs([removed, log_of(DISPATCH, &link(3, 4), 10, 1)]);
    let (handlers, seen) = recording(&[MessageKind::Link]);
    let listener = h.listener(handlers).await;

    listener.process_block_range(0, Some(100)).await.unwrap();

    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn scanner_enablement_reflects_current_state() {
    let h = Harness::new(100);
    h.client.set_scanner_enabled(U256::from(42), false);
    h.source.insert_logs([log_of(
        SCANNERS,
        &ScannerRegistry::ScannerEnabled {
            scannerId: U256::from(42),
            enabled: true,
            permission: 1,
            value: true,
        },
        20,
        0,
    )]);
    let (handlers, seen) = recording(&[MessageKind::EnableScanner, MessageKind::DisableScanner]);
    let listener = h.listener(handlers).await;

    listener.process_block_range(0, Some(100)).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].kind(), MessageKind::DisableScanner);
}

#[tokio::test]
async fn pool_stake_is_delivered_with_decimal_id() {
    let h = Harness::new(100);
    h.source.insert_logs([log_of(
        STAKING,
        &FortaStaking::StakeDeposited {
            subjectType: 2,
            subject: U256::from(7),
            account: Address::repeat_byte(0x0a),
            amount: U256::from(1_000),
        },
        30,
        0,
    )]);
    let (handlers, seen) = recording(&[MessageKind::ScannerPoolStake]);
    let listener = h.listener(handlers).await;

    listener.process_block_range(0, Some(100)).await.unwrap();

    let seen = seen.lock().unwrap();
    let [RegistryMessage::ScannerPoolStake(stake)] = &seen[..] else {
        panic!("expected one scanner pool stake, got {seen:?}");
    };
    assert_eq!(stake.subject_id, "7");
}

#[tokio::test]
async fn upgrade_refreshes_before_later_logs() {
    let h = Harness::new(30_000);
    let upgraded = Upgraded {
        implementation: Address::repeat_byte(0x77),
    };
    h.source.insert_logs([
        log_of(DISPATCH, &upgraded, 10, 0),
        // same page, old address: no longer bound after the refresh
        log_of(DISPATCH, &link(1, 1), 10, 1),
        // later page, new address: admitted once the filter is extended
        log_of(NEW_DISPATCH, &link(2, 2), 15_000, 0),
    ]);
    let (handlers, seen) = recording(&[MessageKind::Upgrade, MessageKind::Link]);
    let listener = h.builder().workers(1).handlers(handlers).build().await.unwrap();
    assert_eq!(h.client.refresh_count(), 1);
    h.client
        .queue_refresh(contracts().with(ContractRole::Dispatch, NEW_DISPATCH));

    listener.process_block_range(0, Some(20_000)).await.unwrap();

    assert_eq!(h.client.refresh_count(), 2);
    assert!(h.source.addresses().contains(&NEW_DISPATCH));
    let kinds: Vec<_> = seen.lock().unwrap().iter().map(|m| m.kind()).collect();
    assert_eq!(kinds, vec![MessageKind::Upgrade, MessageKind::Link]);
    let contracts = listener.contracts().await;
    assert_eq!(
        contracts.role_of(&NEW_DISPATCH),
        Some(ContractRole::Dispatch)
    );
}

#[tokio::test]
async fn refresh_failure_stops_the_range() {
    let h = Harness::new(100);
    h.source.insert_logs([
        log_of(
            SCANNERS,
            &Upgraded {
                implementation: Address::repeat_byte(0x77),
            },
            5,
            0,
        ),
        log_of(DISPATCH, &link(1, 1), 6, 0),
    ]);
    let (handlers, seen) = recording(&[MessageKind::Link]);
    let listener = h.listener(handlers).await;
    h.client.fail_refreshes();

    let err = listener.process_block_range(0, Some(100)).await.unwrap_err();

    assert!(matches!(err, ListenerError::Refresh(_)));
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(listener.state(), ListenerState::Error);
}

#[tokio::test]
async fn transfer_batch_delivery_stops_at_first_failure() {
    let h = Harness::new(100);
    h.source.insert_logs([log_of(
        STAKING,
        &FortaStaking::TransferBatch {
            operator: Address::repeat_byte(1),
            from: Address::repeat_byte(2),
            to: Address::repeat_byte(3),
            ids: (1..=4).map(U256::from).collect(),
            values: (1..=4).map(|v| U256::from(v * 10)).collect(),
        },
        40,
        0,
    )]);
    let attempts = Arc::new(Mutex::new(0));
    let mut handlers = HandlerRegistry::new();
    handlers.on_message(Arc::new(FailOn {
        n: 2,
        attempts: attempts.clone(),
    }));
    let listener = h.listener(handlers).await;

    let err = listener.process_block_range(0, Some(100)).await.unwrap_err();

    assert!(matches!(err, ListenerError::Handler { .. }));
    assert_eq!(*attempts.lock().unwrap(), 2);
}

#[tokio::test]
async fn transfer_batch_delivers_every_entry() {
    let h = Harness::new(100);
    h.source.insert_logs([log_of(
        STAKING,
        &FortaStaking::TransferBatch {
            operator: Address::repeat_byte(1),
            from: Address::repeat_byte(2),
            to: Address::repeat_byte(3),
            ids: (1..=4).map(U256::from).collect(),
            values: (1..=4).map(U256::from).collect(),
        },
        40,
        0,
    )]);
    let (handlers, seen) = recording(&[MessageKind::TransferShares]);
    let listener = h.listener(handlers).await;

    listener.process_block_range(0, Some(100)).await.unwrap();

    assert_eq!(seen.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn page_error_stops_later_pages() {
    let h = Harness::new(300_000);
    h.source.fail_page(100_000);
    let listener = h.builder().workers(1).build().await.unwrap();

    let err = listener
        .process_block_range(0, Some(299_999))
        .await
        .unwrap_err();

    assert!(matches!(err, ListenerError::Rpc(_)));
    let fetched = h.source.fetched_ranges();
    assert_eq!(fetched.last(), Some(&(100_000, 109_999)));
    assert!(fetched.iter().all(|(start, _)| *start <= 109_999));
}

#[tokio::test]
async fn page_error_cancels_concurrent_workers() {
    let h = Harness::new(1_000_000);
    h.source.fail_page(100_000);
    let listener = h.listener(HandlerRegistry::new()).await;

    let err = listener
        .process_block_range(0, Some(999_999))
        .await
        .unwrap_err();

    assert!(matches!(err, ListenerError::Rpc(_)));
    let fetched = h.source.fetched_ranges();
    assert!(fetched.len() < 100);
    assert!(fetched.iter().all(|(start, _)| *start <= 100_000));
}

#[tokio::test]
async fn cancelled_listener_stops() {
    let h = Harness::new(100);
    let listener = h.listener(HandlerRegistry::new()).await;
    listener.cancel_token().cancel();

    let err = listener.process_block_range(0, Some(100)).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(h.source.fetched_ranges().is_empty());
}

#[tokio::test]
async fn last_blocks_cover_the_head() {
    let h = Harness::new(50_000);
    let listener = h.listener(HandlerRegistry::new()).await;

    listener.process_last_blocks(100).await.unwrap();

    assert_eq!(h.source.fetched_ranges(), vec![(49_900, 50_000)]);
}

#[tokio::test]
async fn last_blocks_on_empty_chain_is_error() {
    let h = Harness::new(0);
    let listener = h.listener(HandlerRegistry::new()).await;
    let err = listener.process_last_blocks(10).await.unwrap_err();
    assert!(matches!(err, ListenerError::EmptyChain));
}

// ─── Live ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn live_runs_after_block_hook_once_per_block() {
    let h = Harness::new(100);
    h.source.push_feed_block(
        synthetic_block(11),
        [
            log_of(DISPATCH, &link(1, 1), 11, 0),
            log_of(DISPATCH, &link(2, 2), 11, 1),
        ],
    );
    h.source
        .push_feed_block(synthetic_block(12), [log_of(DISPATCH, &link(3, 3), 12, 0)]);
    let (mut handlers, seen) = recording(&[MessageKind::Link]);
    let blocks = Arc::new(Mutex::new(Vec::new()));
    handlers.on_block(Arc::new(BlockCounter(blocks.clone())));
    let listener = h
        .builder()
        .start_block(11)
        .block_offset(2)
        .handlers(handlers)
        .build()
        .await
        .unwrap();

    listener.listen().await.unwrap();

    assert_eq!(seen.lock().unwrap().len(), 3);
    assert_eq!(*blocks.lock().unwrap(), vec![11, 12]);
    assert_eq!(listener.state(), ListenerState::Stopped);
    let subscriptions = h.source.subscriptions();
    assert_eq!(subscriptions[0].start_block, Some(11));
    assert_eq!(subscriptions[0].block_offset, 2);
}

#[tokio::test]
async fn live_upgrade_extends_filter() {
    let h = Harness::new(100);
    h.source.push_feed_block(
        synthetic_block(5),
        [
            log_of(
                DISPATCH,
                &Upgraded {
                    implementation: Address::repeat_byte(0x77),
                },
                5,
                0,
            ),
            log_of(NEW_DISPATCH, &link(4, 4), 5, 1),
        ],
    );
    let (handlers, seen) = recording(&[MessageKind::Upgrade, MessageKind::Link]);
    let listener = h.listener(handlers).await;
    h.client
        .queue_refresh(contracts().with(ContractRole::Dispatch, NEW_DISPATCH));

    listener.listen().await.unwrap();

    assert!(h.source.addresses().contains(&NEW_DISPATCH));
    let kinds: Vec<_> = seen.lock().unwrap().iter().map(|m| m.kind()).collect();
    assert_eq!(kinds, vec![MessageKind::Upgrade, MessageKind::Link]);
}

// ─── Proxy ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn proxy_takes_precedence_over_handlers() {
    let h = Harness::new(100);
    h.source.insert_logs([log_of(DISPATCH, &link(1, 2), 10, 0)]);

    let proxy = Arc::new(BroadcastProxy::new(16));
    let subscription = proxy.subscriber();
    let (local, local_seen) = recording(&[MessageKind::Link]);
    let listener = h
        .builder()
        .handlers(local)
        .proxy(proxy.clone())
        .build()
        .await
        .unwrap();

    listener.process_block_range(0, Some(100)).await.unwrap();
    drop(listener);
    drop(proxy);

    let (remote, remote_seen) = recording(&[MessageKind::Link]);
    subscription.run(Arc::new(remote)).await.unwrap();

    assert!(local_seen.lock().unwrap().is_empty());
    assert_eq!(remote_seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn after_block_hook_runs_in_proxy_mode() {
    let h = Harness::new(100);
    h.source
        .push_feed_block(synthetic_block(11), [log_of(DISPATCH, &link(1, 1), 11, 0)]);

    let proxy = Arc::new(BroadcastProxy::new(16));
    let subscription = proxy.subscriber();
    let (mut local, local_seen) = recording(&[MessageKind::Link]);
    let blocks = Arc::new(Mutex::new(Vec::new()));
    local.on_block(Arc::new(BlockCounter(blocks.clone())));
    let listener = h
        .builder()
        .handlers(local)
        .proxy(proxy.clone())
        .build()
        .await
        .unwrap();

    listener.listen().await.unwrap();
    drop(listener);
    drop(proxy);

    let (remote, remote_seen) = recording(&[MessageKind::Link]);
    subscription.run(Arc::new(remote)).await.unwrap();

    assert_eq!(*blocks.lock().unwrap(), vec![11]);
    assert!(local_seen.lock().unwrap().is_empty());
    assert_eq!(remote_seen.lock().unwrap().len(), 1);
}
