//! Tests for the broadcast notification system

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::notifications::{
    CallbackError, NotificationManager, SessionSubscription, Subscriber, SubscriberHandle,
};

/// Subscriber recording every message it receives
struct MockSubscriber {
    name: String,
    received: Mutex<Vec<String>>,
}

impl MockSubscriber {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            received: Mutex::new(Vec::new()),
        })
    }

    fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

impl Subscriber for MockSubscriber {
    fn deliver(&self, message: &str) -> Result<(), CallbackError> {
        self.received.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn subscriber_name(&self) -> String {
        self.name.clone()
    }
}

/// Subscriber that blocks inside its callback until released
fn gated_subscriber(name: &str) -> (SubscriberHandle, Receiver<()>, Sender<()>) {
    let (started_tx, started_rx) = bounded(16);
    let (release_tx, release_rx) = bounded::<()>(16);
    let handle = SubscriberHandle::from_fn(name, move |_| {
        let _ = started_tx.send(());
        let _ = release_rx.recv();
    });
    (handle, started_rx, release_tx)
}

#[test]
fn test_subscribe_is_idempotent() {
    let manager = NotificationManager::new().unwrap();
    let subscriber = SubscriberHandle::from_fn("a", |_| {});

    assert!(manager.subscribe(subscriber.clone()));
    assert!(!manager.subscribe(subscriber.clone()));
    assert_eq!(manager.subscriber_count(), 1);

    assert!(manager.unsubscribe(&subscriber));
    assert!(!manager.unsubscribe(&subscriber));
    assert_eq!(manager.subscriber_count(), 0);
}

#[test]
fn test_broadcast_then_unsubscribe() {
    let manager = NotificationManager::new().unwrap();
    let a = MockSubscriber::new("a");
    let b = MockSubscriber::new("b");
    let a_handle = SubscriberHandle::from_arc(a.clone());
    let b_handle = SubscriberHandle::from_arc(b.clone());

    manager.subscribe(a_handle.clone());
    manager.subscribe(b_handle);

    assert_eq!(manager.notify_all("hi"), 2);
    manager.flush();
    assert_eq!(a.received(), vec!["hi"]);
    assert_eq!(b.received(), vec!["hi"]);

    manager.unsubscribe(&a_handle);
    assert_eq!(manager.notify_all("bye"), 1);
    manager.flush();
    assert_eq!(a.received(), vec!["hi"]);
    assert_eq!(b.received(), vec!["hi", "bye"]);
}

#[test]
fn test_failing_subscriber_does_not_block_others() {
    let manager = NotificationManager::new().unwrap();
    let healthy = MockSubscriber::new("healthy");
    manager.subscribe(SubscriberHandle::try_from_fn("failing", |_| Err("render failed".into())));
    manager.subscribe(SubscriberHandle::from_arc(healthy.clone()));

    assert_eq!(manager.notify_all("x"), 2);
    manager.flush();

    assert_eq!(healthy.received(), vec!["x"]);
    let stats = manager.stats();
    assert_eq!(stats.deliveries_succeeded, 1);
    assert_eq!(stats.delivery_failures, 1);
}

#[test]
fn test_first_invocation_failure_does_not_block_second() {
    let manager = NotificationManager::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let delivered = Arc::new(Mutex::new(Vec::new()));

    let seen_calls = Arc::clone(&calls);
    let seen = Arc::clone(&delivered);
    let subscriber = SubscriberHandle::try_from_fn("flaky", move |message| {
        if seen_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err("first call fails".into());
        }
        seen.lock().unwrap().push(message.to_string());
        Ok(())
    });
    manager.subscribe(subscriber.clone());

    manager.notify_all("x");
    manager.notify_all("x");
    manager.flush();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*delivered.lock().unwrap(), vec!["x"]);
    // failed subscribers stay registered
    assert!(manager.has_subscriber(&subscriber));
}

#[test]
fn test_panicking_subscriber_is_contained() {
    let manager = NotificationManager::new().unwrap();
    let healthy = MockSubscriber::new("healthy");
    manager.subscribe(SubscriberHandle::from_fn("panics", |message| {
        panic!("cannot render {}", message)
    }));
    manager.subscribe(SubscriberHandle::from_arc(healthy.clone()));

    manager.notify_all("one");
    manager.notify_all("two");
    manager.flush();

    assert_eq!(healthy.received(), vec!["one", "two"]);
    assert_eq!(manager.stats().delivery_failures, 2);
    assert!(manager.is_running());
}

#[test]
fn test_notify_all_does_not_wait_for_delivery() {
    let manager = NotificationManager::new().unwrap();
    let (slow, started, release) = gated_subscriber("slow");
    manager.subscribe(slow);

    let start = Instant::now();
    assert_eq!(manager.notify_all("hello"), 1);
    assert!(start.elapsed() < Duration::from_millis(500));

    // the callback is running while the caller has already returned
    started.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(manager.stats().pending(), 1);

    release.send(()).unwrap();
    manager.flush();
    assert_eq!(manager.stats().pending(), 0);
}

#[test]
fn test_removed_subscriber_gets_nothing() {
    let manager = NotificationManager::new().unwrap();
    let gone = MockSubscriber::new("gone");
    let handle = SubscriberHandle::from_arc(gone.clone());

    manager.subscribe(handle.clone());
    manager.unsubscribe(&handle);
    assert_eq!(manager.notify_all("late"), 0);
    manager.flush();

    assert!(gone.received().is_empty());
}

#[test]
fn test_snapshot_taken_at_call_time() {
    let manager = NotificationManager::new().unwrap();
    let (blocker, started, release) = gated_subscriber("blocker");
    let a = MockSubscriber::new("a");
    let a_handle = SubscriberHandle::from_arc(a.clone());

    manager.subscribe(blocker);
    manager.notify_all("hold");
    started.recv_timeout(Duration::from_secs(5)).unwrap();

    // delivery to `a` is queued but not yet run when it unsubscribes
    manager.subscribe(a_handle.clone());
    manager.notify_all("queued");
    manager.unsubscribe(&a_handle);

    release.send(()).unwrap();
    release.send(()).unwrap();
    manager.flush();

    assert_eq!(a.received(), vec!["queued"]);
}

#[test]
fn test_per_subscriber_order_follows_call_order() {
    let manager = NotificationManager::new().unwrap();
    let subscribers: Vec<_> = (0..4).map(|i| MockSubscriber::new(&format!("s{}", i))).collect();
    for subscriber in &subscribers {
        manager.subscribe(SubscriberHandle::from_arc(subscriber.clone()));
    }

    let expected: Vec<String> = (0..100).map(|i| format!("message {}", i)).collect();
    for message in &expected {
        manager.notify_all(message);
    }
    manager.flush();

    for subscriber in &subscribers {
        assert_eq!(subscriber.received(), expected);
    }
}

#[test]
fn test_hanging_subscriber_stalls_later_deliveries() {
    // Known limitation: one worker, no per-delivery timeout.
    let manager = NotificationManager::new().unwrap();
    let (hanging, started, release) = gated_subscriber("hanging");
    let waiting = MockSubscriber::new("waiting");

    manager.subscribe(hanging.clone());
    manager.notify_all("first");
    started.recv_timeout(Duration::from_secs(5)).unwrap();

    manager.unsubscribe(&hanging);
    manager.subscribe(SubscriberHandle::from_arc(waiting.clone()));
    manager.notify_all("second");

    assert!(!manager.flush_timeout(Duration::from_millis(100)));
    assert!(waiting.received().is_empty());

    release.send(()).unwrap();
    manager.flush();
    assert_eq!(waiting.received(), vec!["second"]);
}

#[test]
fn test_concurrent_producers() {
    let manager = NotificationManager::new().unwrap();
    let total = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&total);
    manager.subscribe(SubscriberHandle::from_fn("counter", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let manager = manager.clone();
            thread::spawn(move || {
                let session =
                    SessionSubscription::new(manager.clone(), format!("session-{}", p), |_| {});
                session.set_opted_in(true);
                for i in 0..25 {
                    session.attach();
                    manager.notify_all(&format!("producer {} message {}", p, i));
                    session.detach();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    manager.flush();

    assert_eq!(total.load(Ordering::SeqCst), 100);
    assert_eq!(manager.subscriber_count(), 1);
    assert_eq!(manager.stats().broadcasts, 100);
}

#[test]
fn test_session_receives_only_while_eligible() {
    let manager = NotificationManager::new().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let session = SessionSubscription::new(manager.clone(), "session-1", move |message| {
        sink.lock().unwrap().push(message.to_string());
    });

    session.attach();
    manager.notify_all("not opted in");
    session.set_opted_in(true);
    manager.notify_all("delivered");
    session.detach();
    manager.notify_all("detached");
    manager.flush();

    assert_eq!(*received.lock().unwrap(), vec!["delivered"]);
}

#[test]
fn test_flush_from_callback_does_not_deadlock() {
    let manager = NotificationManager::new().unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let inner = manager.clone();
    manager.subscribe(SubscriberHandle::from_fn("flushes", move |message| {
        inner.flush();
        assert!(!inner.flush_timeout(Duration::from_secs(5)));
        sink.lock().unwrap().push(message.to_string());
    }));

    manager.notify_all("trigger");
    assert!(manager.flush_timeout(Duration::from_secs(2)), "worker is stuck");

    manager.notify_all("later");
    assert!(manager.flush_timeout(Duration::from_secs(2)), "worker is stuck");
    assert_eq!(*received.lock().unwrap(), vec!["trigger", "later"]);
    assert_eq!(manager.stats().delivery_failures, 0);

    // breaks the manager -> subscriber -> manager cycle
    manager.shutdown().unwrap();
}

#[test]
fn test_shutdown_from_callback() {
    let manager = NotificationManager::new().unwrap();
    let (result_tx, result_rx) = bounded(1);
    let inner = manager.clone();
    manager.subscribe(SubscriberHandle::from_fn("shuts-down", move |_| {
        let _ = result_tx.send(inner.shutdown().is_ok());
    }));
    manager.subscribe(SubscriberHandle::from_fn("bystander", |_| {}));

    assert_eq!(manager.notify_all("stop"), 2);
    let shut_down = result_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("callback never finished shutdown");

    assert!(shut_down);
    assert!(!manager.is_running());
    assert_eq!(manager.subscriber_count(), 0);
    assert_eq!(manager.notify_all("ignored"), 0);

    // joins the worker, which exits after the queued bystander delivery
    manager.shutdown().unwrap();
    let stats = manager.stats();
    assert_eq!(stats.delivery_failures, 0);
    assert_eq!(stats.deliveries_succeeded, 2);
}

#[test]
fn test_concurrent_shutdown_waits_for_worker() {
    let manager = NotificationManager::new().unwrap();
    let (subscriber, started, release) = gated_subscriber("blocking");
    manager.subscribe(subscriber);

    manager.notify_all("hold");
    started.recv_timeout(Duration::from_secs(2)).unwrap();

    let first = {
        let manager = manager.clone();
        thread::spawn(move || manager.shutdown())
    };
    thread::sleep(Duration::from_millis(50));
    let second = {
        let manager = manager.clone();
        thread::spawn(move || manager.shutdown())
    };
    thread::sleep(Duration::from_millis(100));

    // the worker is still inside the callback, so neither caller may return
    assert!(!first.is_finished());
    assert!(!second.is_finished());

    release.send(()).unwrap();
    assert!(first.join().unwrap().is_ok());
    assert!(second.join().unwrap().is_ok());

    // both returned only after the in-flight delivery completed
    assert_eq!(manager.stats().deliveries_succeeded, 1);
    assert_eq!(manager.stats().pending(), 0);
}
