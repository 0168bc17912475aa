//! Per-subject fan-out of chat stream events.
//!
//! One logical channel per subject: every connected device subscribes to
//! the same broadcast sender, so a turn started on one device streams to
//! all of them. Publishing with no subscribers is a silent no-op, and the
//! sender is pruned once its last receiver is gone.

use std::sync::Arc;

use dashmap::DashMap;
use planeja_types::chat::ChatStreamEvent;
use tokio::sync::broadcast;
use uuid::Uuid;

// Enough slack for a fast generator against a slow websocket; a receiver
// that still falls behind observes a Lagged error and resubscribes.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Default)]
pub struct StreamBroker {
    channels: Arc<DashMap<Uuid, broadcast::Sender<ChatStreamEvent>>>,
}

impl StreamBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a subject's event stream, creating the channel on first
    /// use.
    pub fn subscribe(&self, subject_id: Uuid) -> broadcast::Receiver<ChatStreamEvent> {
        self.channels
            .entry(subject_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Broadcast an event to every receiver of the subject's channel.
    pub fn publish(&self, subject_id: Uuid, event: ChatStreamEvent) {
        let stale = match self.channels.get(&subject_id) {
            Some(sender) => sender.send(event).is_err(),
            None => return,
        };
        // The guard is dropped before touching the map again.
        if stale {
            self.channels
                .remove_if(&subject_id, |_, sender| sender.receiver_count() == 0);
        }
    }

    #[cfg(test)]
    fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_event(chat_id: Uuid, token: &str) -> ChatStreamEvent {
        ChatStreamEvent::Token {
            chat_id,
            token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn events_reach_every_subscriber() {
        let broker = StreamBroker::new();
        let subject = Uuid::now_v7();
        let chat = Uuid::now_v7();
        let mut phone = broker.subscribe(subject);
        let mut laptop = broker.subscribe(subject);

        broker.publish(subject, token_event(chat, "hi"));

        for rx in [&mut phone, &mut laptop] {
            match rx.recv().await.unwrap() {
                ChatStreamEvent::Token { token, .. } => assert_eq!(token, "hi"),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let broker = StreamBroker::new();
        broker.publish(Uuid::now_v7(), token_event(Uuid::now_v7(), "lost"));
    }

    #[tokio::test]
    async fn subjects_do_not_cross_streams() {
        let broker = StreamBroker::new();
        let ana = Uuid::now_v7();
        let bruno = Uuid::now_v7();
        let mut ana_rx = broker.subscribe(ana);
        let mut bruno_rx = broker.subscribe(bruno);

        broker.publish(ana, token_event(Uuid::now_v7(), "for ana"));

        assert!(ana_rx.recv().await.is_ok());
        assert!(matches!(
            bruno_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn stale_channel_is_pruned_after_last_receiver_drops() {
        let broker = StreamBroker::new();
        let subject = Uuid::now_v7();
        let rx = broker.subscribe(subject);
        assert_eq!(broker.channel_count(), 1);

        drop(rx);
        broker.publish(subject, token_event(Uuid::now_v7(), "nobody home"));
        assert_eq!(broker.channel_count(), 0);
    }
}
