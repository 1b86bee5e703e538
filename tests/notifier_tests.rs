use lanshare::notifier::{ChangeNotifier, Notice};

#[test]
fn test_notice_wire_text() {
    assert_eq!(Notice::Reload.as_str(), "reload");
    assert_eq!(Notice::Shutdown.to_string(), "shutdown");
}

#[tokio::test]
async fn test_broadcast_fan_out() {
    let notifier = ChangeNotifier::new();
    let mut listeners: Vec<_> = (0..5).map(|_| notifier.subscribe()).collect();
    assert_eq!(notifier.listener_count(), 5);

    let delivered = notifier.publish(Notice::Reload);
    assert_eq!(delivered, 5);

    for listener in listeners.iter_mut() {
        assert_eq!(listener.recv().await, Some(Notice::Reload));
        // exactly one
        assert_eq!(listener.try_recv(), None);
    }
}

#[tokio::test]
async fn test_publish_with_no_listeners() {
    let notifier = ChangeNotifier::new();
    assert_eq!(notifier.publish(Notice::Reload), 0);
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() {
    let notifier = ChangeNotifier::new();
    let mut listener = notifier.subscribe();
    let other = notifier.subscribe();

    assert!(notifier.unsubscribe(listener.id()));
    assert!(!notifier.unsubscribe(listener.id()));
    assert_eq!(notifier.listener_count(), 1);

    // unsubscribed listener sees nothing, its stream is over
    notifier.publish(Notice::Reload);
    assert_eq!(listener.recv().await, None);

    drop(other);
}

#[tokio::test]
async fn test_dropped_listener_is_pruned_on_publish() {
    let notifier = ChangeNotifier::new();
    let mut alive = notifier.subscribe();
    let gone = notifier.subscribe();
    drop(gone);

    // still registered until somebody tries to deliver
    assert_eq!(notifier.listener_count(), 2);

    assert_eq!(notifier.publish(Notice::Reload), 1);
    assert_eq!(notifier.listener_count(), 1);
    assert_eq!(alive.try_recv(), Some(Notice::Reload));
}

#[tokio::test]
async fn test_per_listener_order_follows_publish_order() {
    let notifier = ChangeNotifier::new();
    let mut a = notifier.subscribe();
    let mut b = notifier.subscribe();

    notifier.publish(Notice::Reload);
    notifier.publish(Notice::Reload);
    notifier.publish(Notice::Shutdown);

    for listener in [&mut a, &mut b] {
        assert_eq!(listener.try_recv(), Some(Notice::Reload));
        assert_eq!(listener.try_recv(), Some(Notice::Reload));
        assert_eq!(listener.try_recv(), Some(Notice::Shutdown));
        assert_eq!(listener.try_recv(), None);
    }
}

#[tokio::test]
async fn test_lagging_listener_drops_notices_but_stays_registered() {
    let notifier = ChangeNotifier::new();
    let mut slow = notifier.subscribe();

    let mut delivered = 0;
    for _ in 0..100 {
        delivered += notifier.publish(Notice::Reload);
    }

    // buffer filled up at some point, the rest were dropped for this listener
    assert!(delivered < 100);
    assert_eq!(notifier.listener_count(), 1);

    let mut received = 0;
    while slow.try_recv().is_some() {
        received += 1;
    }
    assert_eq!(received, delivered);

    // drained, so it gets the next one again
    assert_eq!(notifier.publish(Notice::Shutdown), 1);
    assert_eq!(slow.try_recv(), Some(Notice::Shutdown));
}

#[tokio::test]
async fn test_concurrent_publishers() {
    use std::sync::Arc;

    let notifier = Arc::new(ChangeNotifier::new());
    let mut listener = notifier.subscribe();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let notifier = notifier.clone();
            tokio::spawn(async move { notifier.publish(Notice::Reload) })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), 1);
    }

    for _ in 0..4 {
        assert_eq!(listener.try_recv(), Some(Notice::Reload));
    }
    assert_eq!(listener.try_recv(), None);
}
