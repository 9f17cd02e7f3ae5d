use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use bytes::Bytes;
use tokio::{
    sync::mpsc,
    time::{sleep, timeout},
};

use courier::{
    handler_fn, interceptor_fn, MemoryBroker, Message, PipelineState, PullSubscription,
    Subscriber, SubscriptionInterceptor,
};

/// Включает журналирование теста; фильтр берётся из `RUST_LOG`.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Перехватчик, перезаписывающий атрибут `intercepted`.
fn marker_interceptor(value: &'static str) -> SubscriptionInterceptor {
    interceptor_fn(move |_info, next| {
        handler_fn(move |cancel, message: Message| {
            let next = next.clone();
            async move { next(cancel, message.with_attribute("intercepted", value)).await }
        })
    })
}

/// Тест проверяет сквозной сценарий оригинала: два опубликованных
/// сообщения проходят цепочку перехватчиков, обработчик видит значение
/// последнего перехватчика, счётчик достигает двух.
#[tokio::test]
async fn test_run_delivers_through_interceptor_chain() {
    init_logging();
    let broker = MemoryBroker::new();
    broker.create_topic("orders");
    let source = Arc::new(broker.subscribe("orders", "orders-sub").unwrap());

    let subscriber = Subscriber::with_interceptors(vec![
        marker_interceptor("abc"),
        // Перезапишет значение первого перехватчика.
        marker_interceptor("true"),
    ]);

    let received = Arc::new(AtomicUsize::new(0));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    {
        let received = received.clone();
        subscriber
            .register(
                source,
                handler_fn(move |_cancel, message: Message| {
                    let received = received.clone();
                    let done_tx = done_tx.clone();
                    async move {
                        assert_eq!(message.attribute("intercepted"), Some("true"));
                        received.fetch_add(1, Ordering::SeqCst);
                        done_tx.send(()).unwrap();
                        Ok(())
                    }
                }),
            )
            .unwrap();
    }

    subscriber.run().unwrap();

    broker.publish("orders", Bytes::from_static(b"test")).unwrap();
    broker.publish("orders", Bytes::from_static(b"test")).unwrap();

    for _ in 0..2 {
        timeout(Duration::from_secs(1), done_rx.recv())
            .await
            .expect("message was not handled")
            .unwrap();
    }
    assert_eq!(received.load(Ordering::SeqCst), 2);

    subscriber.shutdown().await;
    assert_eq!(subscriber.state(), PipelineState::Stopped);
}

/// Тест проверяет, что после остановки обработчики не вызываются для
/// сообщений, опубликованных позже.
#[tokio::test]
async fn test_no_handling_after_shutdown() {
    init_logging();
    let broker = MemoryBroker::new();
    broker.create_topic("t");
    let source = Arc::new(broker.subscribe("t", "t-sub").unwrap());

    let subscriber = Subscriber::new();
    let received = Arc::new(AtomicUsize::new(0));
    {
        let received = received.clone();
        subscriber
            .register(
                source,
                handler_fn(move |_cancel, _message| {
                    let received = received.clone();
                    async move {
                        received.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )
            .unwrap();
    }

    subscriber.run().unwrap();
    subscriber.shutdown().await;

    broker.publish("t", Bytes::from_static(b"late")).unwrap();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(received.load(Ordering::SeqCst), 0);
}

/// Тест проверяет изоляцию подписок: терминальное состояние одной
/// не останавливает потребление другой.
#[tokio::test]
async fn test_terminated_subscription_does_not_stop_siblings() {
    init_logging();
    let broker = MemoryBroker::new();
    broker.create_topic("doomed");
    broker.create_topic("healthy");
    let doomed = Arc::new(broker.subscribe("doomed", "doomed-sub").unwrap());
    let healthy = Arc::new(broker.subscribe("healthy", "healthy-sub").unwrap());

    let subscriber = Subscriber::new();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    subscriber
        .register(doomed, handler_fn(|_cancel, _message| async { Ok(()) }))
        .unwrap();
    subscriber
        .register(
            healthy,
            handler_fn(move |_cancel, message: Message| {
                let done_tx = done_tx.clone();
                async move {
                    done_tx.send(message).unwrap();
                    Ok(())
                }
            }),
        )
        .unwrap();

    subscriber.run().unwrap();

    // Очередь первой подписки закрывается терминально.
    broker.delete_topic("doomed");
    sleep(Duration::from_millis(50)).await;

    broker
        .publish("healthy", Bytes::from_static(b"still here"))
        .unwrap();
    let msg = timeout(Duration::from_secs(1), done_rx.recv())
        .await
        .expect("sibling subscription stopped consuming")
        .unwrap();
    assert_eq!(msg.payload, Bytes::from_static(b"still here"));

    subscriber.shutdown().await;
}

/// Тест проверяет, что ошибка бизнес-логики не останавливает
/// потребление: следующие сообщения той же подписки обрабатываются.
#[tokio::test]
async fn test_handler_error_does_not_stop_consumption() {
    init_logging();
    let broker = MemoryBroker::new();
    broker.create_topic("flaky");
    let source = Arc::new(broker.subscribe("flaky", "flaky-sub").unwrap());

    let subscriber = Subscriber::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    {
        let attempts = attempts.clone();
        subscriber
            .register(
                source,
                handler_fn(move |_cancel, _message| {
                    let attempts = attempts.clone();
                    let done_tx = done_tx.clone();
                    async move {
                        let n = attempts.fetch_add(1, Ordering::SeqCst);
                        done_tx.send(()).unwrap();
                        if n == 0 {
                            anyhow::bail!("transient business failure");
                        }
                        Ok(())
                    }
                }),
            )
            .unwrap();
    }

    subscriber.run().unwrap();

    broker.publish("flaky", Bytes::from_static(b"1")).unwrap();
    broker.publish("flaky", Bytes::from_static(b"2")).unwrap();

    for _ in 0..2 {
        timeout(Duration::from_secs(1), done_rx.recv())
            .await
            .expect("consumption stopped after handler error")
            .unwrap();
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    subscriber.shutdown().await;
}

/// Тест проверяет пакетную регистрацию и потребление из нескольких
/// подписок одним конвейером.
#[tokio::test]
async fn test_register_many_and_concurrent_consumption() {
    init_logging();
    let broker = MemoryBroker::new();
    broker.create_topic("a");
    broker.create_topic("b");

    let subscriber = Subscriber::new();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let handler_for = |name: &'static str| {
        let done_tx = done_tx.clone();
        handler_fn(move |_cancel, message: Message| {
            let done_tx = done_tx.clone();
            async move {
                done_tx.send((name, message.payload)).unwrap();
                Ok(())
            }
        })
    };

    let pairs: Vec<(Arc<dyn PullSubscription>, _)> = vec![
        (
            Arc::new(broker.subscribe("a", "a-sub").unwrap()),
            handler_for("a"),
        ),
        (
            Arc::new(broker.subscribe("b", "b-sub").unwrap()),
            handler_for("b"),
        ),
    ];
    subscriber.register_many(pairs).unwrap();
    assert_eq!(subscriber.registry().len(), 2);

    subscriber.run().unwrap();

    broker.publish("a", Bytes::from_static(b"for a")).unwrap();
    broker.publish("b", Bytes::from_static(b"for b")).unwrap();

    let mut seen = Vec::new();
    for _ in 0..2 {
        let (name, payload) = timeout(Duration::from_secs(1), done_rx.recv())
            .await
            .expect("delivery missing")
            .unwrap();
        seen.push((name, payload));
    }
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("a", Bytes::from_static(b"for a")),
            ("b", Bytes::from_static(b"for b")),
        ]
    );

    subscriber.shutdown().await;
}
