//! Потоки сообщений поверх мессенджера.

use std::{
    sync::{mpsc, Arc},
    time::Duration,
};

use futures::StreamExt;
use herald::{
    MessageStream, MessengerConfig, RecipientId, RecvError, StrongMessenger, Token, TryRecvError,
    WeakMessenger,
};
use tokio::time::timeout;

#[derive(Debug, Clone, PartialEq)]
struct PriceTick {
    symbol: &'static str,
    price: u64,
}

#[tokio::test]
async fn test_messages_from_other_thread_reach_stream() {
    let messenger = StrongMessenger::new();
    let mut ticks = messenger.observe::<PriceTick>().unwrap();

    let publisher = messenger.clone();
    std::thread::spawn(move || {
        for price in 1..=3 {
            publisher
                .send(PriceTick {
                    symbol: "ACME",
                    price,
                })
                .unwrap();
        }
    })
    .join()
    .unwrap();

    for expected in 1..=3 {
        let tick = timeout(Duration::from_millis(100), ticks.recv())
            .await
            .expect("timed out")
            .expect("stream closed");
        assert_eq!(tick.price, expected);
    }
}

#[tokio::test]
async fn test_stream_keeps_itself_alive_in_weak_messenger() {
    let messenger = WeakMessenger::new();
    let mut ticks = messenger.observe_with_token::<PriceTick>("fx").unwrap();

    messenger
        .send_with_token(
            PriceTick {
                symbol: "EUR",
                price: 108,
            },
            &Token::from("fx"),
        )
        .unwrap();
    assert_eq!(
        ticks.try_recv(),
        Ok(PriceTick {
            symbol: "EUR",
            price: 108
        })
    );
    assert_eq!(messenger.stats().skipped_dead, 0);
}

#[tokio::test]
async fn test_dispose_closes_all_listeners() {
    let messenger = StrongMessenger::new();
    let mut ticks = messenger.observe::<PriceTick>().unwrap();
    let mut listener = ticks.subscribe();

    ticks.dispose();
    assert!(!ticks.is_active());
    assert_eq!(messenger.registration_count(), 0);

    assert_eq!(listener.recv().await, Err(RecvError::Closed));
    assert_eq!(ticks.try_recv(), Err(TryRecvError::Closed));
}

#[tokio::test]
async fn test_stream_adapter_reports_lag() {
    let messenger = StrongMessenger::with_config(MessengerConfig {
        stream_capacity: 1,
        ..MessengerConfig::default()
    });
    let ticks = messenger.observe::<PriceTick>().unwrap();
    for price in 0..3 {
        messenger
            .send(PriceTick {
                symbol: "ACME",
                price,
            })
            .unwrap();
    }

    let mut stream = ticks.into_stream();
    assert_eq!(stream.next().await, Some(Err(RecvError::Lagged(2))));
    assert_eq!(
        stream.next().await,
        Some(Ok(PriceTick {
            symbol: "ACME",
            price: 2
        }))
    );
}

struct Refresh;

/// Получатель, который владеет потоком того же мессенджера: его drop
/// снимает регистрацию потока.
struct TickerView {
    _ticks: MessageStream<PriceTick>,
}

fn register_view(messenger: &StrongMessenger) -> RecipientId {
    let view = Arc::new(TickerView {
        _ticks: messenger.observe::<PriceTick>().unwrap(),
    });
    messenger
        .register(&view, |_: &TickerView, _: &Refresh| Ok(()))
        .unwrap();
    assert_eq!(messenger.registration_count(), 2);
    RecipientId::of(&*view)
}

fn finishes_in_time(f: impl FnOnce() + Send + 'static) -> bool {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        f();
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(3)).is_ok()
}

#[test]
fn test_reset_releases_recipient_owning_stream() {
    let messenger = StrongMessenger::new();
    register_view(&messenger);

    let m = messenger.clone();
    assert!(finishes_in_time(move || m.reset()), "reset did not finish");
    assert_eq!(messenger.registration_count(), 0);
}

#[test]
fn test_unregister_all_releases_recipient_owning_stream() {
    let messenger = StrongMessenger::new();
    let id = register_view(&messenger);

    let m = messenger.clone();
    assert!(
        finishes_in_time(move || {
            m.unregister_all(&id);
        }),
        "unregister_all did not finish"
    );
    // регистрация потока снята из drop получателя
    assert_eq!(messenger.registration_count(), 0);
}
