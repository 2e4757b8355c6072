use landgrab_ledger::{encode_log, ContractAddresses, RawLog};
use landgrab_nullables::NullEventTransport;
use landgrab_subscriber::{EventSubscriber, SubscriberConfig, SubscriberStats};
use landgrab_types::{Address, ChainEvent, DomainEvent, EventId, EventKind, RequestId, TokenId, TxHash};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_secs(5);

fn contracts() -> ContractAddresses {
    ContractAddresses {
        land_token: Address::new([0x10; 20]),
        land_market: Address::new([0x20; 20]),
        land_swap: Address::new([0x30; 20]),
    }
}

fn config() -> SubscriberConfig {
    SubscriberConfig {
        reconnect_delay: Duration::ZERO,
        ..SubscriberConfig::default()
    }
}

fn requested(tx: u8, index: u64) -> ChainEvent {
    ChainEvent {
        id: EventId {
            tx_hash: TxHash::new([tx; 32]),
            log_index: index,
        },
        block_number: u64::from(tx),
        event: DomainEvent::VerificationRequested {
            request_id: RequestId::new([tx; 32]),
            user: Address::new([0x42; 20]),
            code: "filled.count.soap".into(),
        },
    }
}

fn claimed(tx: u8) -> ChainEvent {
    ChainEvent {
        id: EventId {
            tx_hash: TxHash::new([tx; 32]),
            log_index: 0,
        },
        block_number: u64::from(tx),
        event: DomainEvent::LandClaimed {
            owner: Address::new([0x42; 20]),
            token_id: TokenId::new(1),
            code: "filled.count.soap".into(),
        },
    }
}

fn market_log(event: &ChainEvent) -> RawLog {
    encode_log(contracts().land_market, event)
}

fn spawn(
    transport: &Arc<NullEventTransport>,
    kinds: &[EventKind],
) -> (mpsc::Receiver<ChainEvent>, Arc<SubscriberStats>, tokio::task::JoinHandle<()>) {
    let subscriber = EventSubscriber::new(transport.clone(), &contracts(), kinds, config());
    let stats = subscriber.stats();
    let (rx, handle) = subscriber.spawn(16);
    (rx, stats, handle)
}

async fn next(rx: &mut mpsc::Receiver<ChainEvent>) -> ChainEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("event within timeout")
        .expect("subscriber still running")
}

async fn nothing_pending(rx: &mut mpsc::Receiver<ChainEvent>) -> bool {
    tokio::time::timeout(Duration::from_millis(50), rx.recv()).await.is_err()
}

#[tokio::test]
async fn registers_a_filter_for_all_three_contracts() {
    let transport = Arc::new(NullEventTransport::new());
    let (_rx, stats, _handle) = spawn(&transport, &EventKind::ALL);
    assert!(transport.wait_for_opens(1, WAIT).await);

    let filter = transport.last_filter().unwrap();
    assert_eq!(filter.addresses.len(), 3);
    assert!(filter.addresses.contains(&contracts().land_swap));
    assert_eq!(stats.registrations(), 1);
}

#[tokio::test]
async fn delivers_decoded_events_in_order() {
    let transport = Arc::new(NullEventTransport::new());
    let (mut rx, stats, _handle) = spawn(&transport, &EventKind::ALL);
    assert!(transport.wait_for_opens(1, WAIT).await);

    transport.push(market_log(&requested(1, 0)));
    transport.push(market_log(&requested(2, 0)));

    assert_eq!(next(&mut rx).await, requested(1, 0));
    assert_eq!(next(&mut rx).await, requested(2, 0));
    assert_eq!(stats.delivered(), 2);
}

#[tokio::test]
async fn repeated_log_identity_is_delivered_once() {
    let transport = Arc::new(NullEventTransport::new());
    let (mut rx, stats, _handle) = spawn(&transport, &EventKind::ALL);
    assert!(transport.wait_for_opens(1, WAIT).await);

    transport.push(market_log(&requested(1, 0)));
    transport.push(market_log(&requested(1, 0)));
    // Same transaction, different log index: a distinct event.
    transport.push(market_log(&requested(1, 1)));

    assert_eq!(next(&mut rx).await.id.log_index, 0);
    assert_eq!(next(&mut rx).await.id.log_index, 1);
    assert!(nothing_pending(&mut rx).await);
    assert_eq!(stats.duplicates(), 1);
}

#[tokio::test]
async fn resubscribes_after_a_drop_without_redelivering() {
    let transport = Arc::new(NullEventTransport::new());
    let (mut rx, stats, _handle) = spawn(&transport, &EventKind::ALL);
    assert!(transport.wait_for_opens(1, WAIT).await);

    transport.push(market_log(&requested(1, 0)));
    next(&mut rx).await;

    transport.drop_connections();
    assert!(transport.wait_for_opens(2, WAIT).await);
    transport.push(market_log(&requested(1, 0)));
    transport.push(market_log(&requested(2, 0)));

    assert_eq!(next(&mut rx).await, requested(2, 0));
    assert_eq!(stats.registrations(), 2);
    assert!(stats.reconnects() >= 1);
    assert_eq!(stats.duplicates(), 1);
}

#[tokio::test]
async fn resubscribes_after_the_stream_ends() {
    let transport = Arc::new(NullEventTransport::new());
    let (mut rx, stats, _handle) = spawn(&transport, &EventKind::ALL);
    assert!(transport.wait_for_opens(1, WAIT).await);

    transport.close_connections();
    assert!(transport.wait_for_opens(2, WAIT).await);
    transport.push(market_log(&requested(3, 0)));
    assert_eq!(next(&mut rx).await, requested(3, 0));
    assert_eq!(stats.registrations(), 2);
}

#[tokio::test]
async fn refused_connections_are_retried() {
    let transport = Arc::new(NullEventTransport::new());
    transport.refuse_next(3);
    let (mut rx, stats, _handle) = spawn(&transport, &EventKind::ALL);
    assert!(transport.wait_for_opens(1, WAIT).await);

    transport.push(market_log(&requested(1, 0)));
    next(&mut rx).await;
    assert_eq!(stats.registrations(), 1);
    assert!(stats.reconnects() >= 3);
}

#[tokio::test]
async fn unparseable_messages_do_not_break_the_stream() {
    let transport = Arc::new(NullEventTransport::new());
    let (mut rx, stats, _handle) = spawn(&transport, &EventKind::ALL);
    assert!(transport.wait_for_opens(1, WAIT).await);

    transport.push_garbage();
    transport.push(market_log(&requested(1, 0)));
    next(&mut rx).await;
    assert_eq!(transport.opens(), 1);
    assert_eq!(stats.registrations(), 1);
}

#[tokio::test]
async fn removed_logs_are_skipped() {
    let transport = Arc::new(NullEventTransport::new());
    let (mut rx, _stats, _handle) = spawn(&transport, &EventKind::ALL);
    assert!(transport.wait_for_opens(1, WAIT).await);

    let mut reorged = market_log(&requested(1, 0));
    reorged.removed = true;
    transport.push(reorged);
    transport.push(market_log(&requested(2, 0)));
    assert_eq!(next(&mut rx).await, requested(2, 0));
}

#[tokio::test]
async fn only_requested_kinds_are_delivered() {
    let transport = Arc::new(NullEventTransport::new());
    let (mut rx, _stats, _handle) = spawn(&transport, &[EventKind::LandClaimed]);
    assert!(transport.wait_for_opens(1, WAIT).await);

    transport.push(market_log(&requested(1, 0)));
    transport.push(encode_log(contracts().land_token, &claimed(2)));
    assert_eq!(next(&mut rx).await, claimed(2));
    assert!(nothing_pending(&mut rx).await);
}

#[tokio::test]
async fn stops_when_the_receiver_is_dropped() {
    let transport = Arc::new(NullEventTransport::new());
    let (rx, _stats, handle) = spawn(&transport, &EventKind::ALL);
    assert!(transport.wait_for_opens(1, WAIT).await);

    drop(rx);
    tokio::time::timeout(WAIT, handle)
        .await
        .expect("subscriber stops")
        .unwrap();
    assert_eq!(transport.active_sessions(), 0);
}
