use super::*;
use crate::state::test_helpers;
use tokio::time::{Duration, timeout};

#[tokio::test]
async fn notify_reaches_every_subscriber_of_the_event() {
    let state = test_helpers::test_app_state();
    let event_id = Uuid::new_v4();
    let (_, mut rx_a) = subscribe(&state, event_id).await;
    let (_, mut rx_b) = subscribe(&state, event_id).await;

    assert_eq!(notify(&state, event_id).await, 2);

    let a = timeout(Duration::from_millis(200), rx_a.recv()).await.expect("a timed out");
    let b = timeout(Duration::from_millis(200), rx_b.recv()).await.expect("b timed out");
    assert_eq!(a, Some(ChangeNotice { event_id }));
    assert_eq!(b, Some(ChangeNotice { event_id }));
}

#[tokio::test]
async fn notify_other_event_is_silent() {
    let state = test_helpers::test_app_state();
    let event_id = Uuid::new_v4();
    let (_, mut rx) = subscribe(&state, event_id).await;

    assert_eq!(notify(&state, Uuid::new_v4()).await, 0);
    assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
}

#[tokio::test]
async fn full_queue_keeps_subscriber() {
    let state = test_helpers::test_app_state();
    let event_id = Uuid::new_v4();
    let (subscriber_id, mut rx) = subscribe(&state, event_id).await;

    for _ in 0..(state.channel_capacity + 3) {
        notify(&state, event_id).await;
    }
    assert!(state.feeds.read().await[&event_id].subscribers.contains_key(&subscriber_id));

    let mut drained = 0;
    while rx.try_recv().is_ok() {
        drained += 1;
    }
    assert_eq!(drained, state.channel_capacity);
}

#[tokio::test]
async fn closed_receiver_is_pruned_and_feed_evicted() {
    let state = test_helpers::test_app_state();
    let event_id = Uuid::new_v4();
    let (_, rx) = subscribe(&state, event_id).await;
    drop(rx);

    assert_eq!(notify(&state, event_id).await, 0);
    assert!(!state.feeds.read().await.contains_key(&event_id));
}

#[tokio::test]
async fn unsubscribe_evicts_empty_feed() {
    let state = test_helpers::test_app_state();
    let event_id = Uuid::new_v4();
    let (a, _rx_a) = subscribe(&state, event_id).await;
    let (b, _rx_b) = subscribe(&state, event_id).await;

    unsubscribe(&state, event_id, a).await;
    assert_eq!(state.feeds.read().await[&event_id].subscribers.len(), 1);
    unsubscribe(&state, event_id, b).await;
    assert!(!state.feeds.read().await.contains_key(&event_id));

    // Unknown ids are a no-op.
    unsubscribe(&state, event_id, Uuid::new_v4()).await;
}
