//! Change feed service — per-event invalidation broadcast.
//!
//! DESIGN
//! ======
//! Every successful post mutation calls [`notify`] for the post's event.
//! Each websocket subscriber owns a bounded receiver; delivery uses
//! `try_send`, so a slow subscriber never blocks a mutation. A full queue
//! already holds an unread "refetch" signal, so the dropped one is
//! redundant. Closed senders are pruned on the next notify.

use board::doc::{ChangeNotice, EventId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::AppState;

/// Register a subscriber on an event's feed.
pub async fn subscribe(state: &AppState, event_id: EventId) -> (Uuid, mpsc::Receiver<ChangeNotice>) {
    let subscriber_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(state.channel_capacity);

    let mut feeds = state.feeds.write().await;
    let feed = feeds.entry(event_id).or_default();
    feed.subscribers.insert(subscriber_id, tx);
    info!(%event_id, %subscriber_id, subscribers = feed.subscribers.len(), "feed: subscribed");
    (subscriber_id, rx)
}

/// Remove a subscriber; the feed is evicted once empty.
pub async fn unsubscribe(state: &AppState, event_id: EventId, subscriber_id: Uuid) {
    let mut feeds = state.feeds.write().await;
    let Some(feed) = feeds.get_mut(&event_id) else {
        return;
    };
    feed.subscribers.remove(&subscriber_id);
    info!(%event_id, %subscriber_id, remaining = feed.subscribers.len(), "feed: unsubscribed");
    if feed.subscribers.is_empty() {
        feeds.remove(&event_id);
    }
}

/// Signal every subscriber of `event_id` that the board changed.
///
/// Returns how many subscribers the signal was queued for.
pub async fn notify(state: &AppState, event_id: EventId) -> usize {
    let mut feeds = state.feeds.write().await;
    let Some(feed) = feeds.get_mut(&event_id) else {
        return 0;
    };

    let mut delivered = 0;
    feed.subscribers.retain(|subscriber_id, tx| match tx.try_send(ChangeNotice { event_id }) {
        Ok(()) => {
            delivered += 1;
            true
        }
        Err(TrySendError::Full(_)) => {
            debug!(%event_id, %subscriber_id, "feed: queue full, signal coalesced");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    });
    if feed.subscribers.is_empty() {
        feeds.remove(&event_id);
    }
    delivered
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod tests;
