use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use message_types::ChatEvent;

pub mod handlers;
pub mod message_types;

/// Per-subscriber queue depth. A subscriber that falls further behind
/// than this loses deliveries and must catch up by timestamp.
pub const SUBSCRIBER_QUEUE_DEPTH: usize = 64;

/// Send-guard stripes; sessions hash onto a fixed lock table.
const SEND_STRIPES: usize = 64;

/// Per-session fan-out of committed events to live subscribers.
///
/// Delivery is best-effort: a full queue drops that delivery for that
/// subscriber only, a closed receiver is pruned, and neither ever
/// blocks the publishing side or other subscribers.
#[derive(Clone)]
pub struct ConnectionRegistry {
    // session_id -> channel senders of active subscribers
    inner: Arc<RwLock<HashMap<String, Vec<Sender<Arc<ChatEvent>>>>>>,
    send_locks: Arc<Vec<Arc<Mutex<()>>>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self {
            inner: Arc::default(),
            send_locks: Arc::new((0..SEND_STRIPES).map(|_| Arc::new(Mutex::new(()))).collect()),
        }
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard for the commit-then-publish critical section of one
    /// session. Holding it from store append through `publish` keeps
    /// the live stream in commit order; without it a writer preempted
    /// between the two steps lets a later commit enqueue first.
    /// Striped, so unrelated sessions rarely contend.
    pub async fn send_guard(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let mut hasher = DefaultHasher::new();
        session_id.hash(&mut hasher);
        let stripe = (hasher.finish() as usize) % SEND_STRIPES;
        self.send_locks[stripe].clone().lock_owned().await
    }

    /// Registers a subscriber for the session. Dropping the returned
    /// receiver unsubscribes; the sender side is pruned on the next
    /// publish.
    pub async fn subscribe(&self, session_id: &str) -> Receiver<Arc<ChatEvent>> {
        let (tx, rx) = channel(SUBSCRIBER_QUEUE_DEPTH);
        let mut guard = self.inner.write().await;
        guard.entry(session_id.to_string()).or_default().push(tx);
        rx
    }

    pub async fn publish(&self, session_id: &str, event: Arc<ChatEvent>) {
        let mut guard = self.inner.write().await;
        if let Some(list) = guard.get_mut(session_id) {
            list.retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(%session_id, "subscriber queue full; dropping delivery");
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            });
            if list.is_empty() {
                guard.remove(session_id);
            }
        }
    }

    pub async fn subscriber_count(&self, session_id: &str) -> usize {
        self.inner
            .read()
            .await
            .get(session_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(session_id: &str, text: &str) -> Arc<ChatEvent> {
        let sender = Uuid::new_v4();
        Arc::new(ChatEvent::Message {
            session_id: session_id.to_string(),
            message: Message {
                id: Uuid::new_v4(),
                session_id: session_id.to_string(),
                sequence_number: 1,
                sender_id: sender,
                receiver_id: Uuid::new_v4(),
                text: Some(text.to_string()),
                attachment_ref: None,
                idempotency_key: None,
                sent_at: Utc::now(),
                read_by: vec![sender],
            },
        })
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let registry = ConnectionRegistry::new();
        let mut rx1 = registry.subscribe("s").await;
        let mut rx2 = registry.subscribe("s").await;

        registry.publish("s", event("s", "hi")).await;

        for rx in [&mut rx1, &mut rx2] {
            let delivered = rx.recv().await.expect("delivery");
            match delivered.as_ref() {
                ChatEvent::Message { message, .. } => {
                    assert_eq!(message.text.as_deref(), Some("hi"))
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn publish_is_scoped_to_the_session() {
        let registry = ConnectionRegistry::new();
        let mut rx = registry.subscribe("a").await;
        registry.publish("b", event("b", "elsewhere")).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned_without_affecting_others() {
        let registry = ConnectionRegistry::new();
        let rx1 = registry.subscribe("s").await;
        let mut rx2 = registry.subscribe("s").await;
        assert_eq!(registry.subscriber_count("s").await, 2);

        drop(rx1);
        registry.publish("s", event("s", "still here")).await;
        assert_eq!(registry.subscriber_count("s").await, 1);
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn slow_subscriber_drops_overflow_but_stays_subscribed() {
        let registry = ConnectionRegistry::new();
        let mut rx = registry.subscribe("s").await;

        for i in 0..(SUBSCRIBER_QUEUE_DEPTH + 10) {
            registry.publish("s", event("s", &format!("m{i}"))).await;
        }
        // Overflow deliveries were dropped, not the subscriber.
        assert_eq!(registry.subscriber_count("s").await, 1);

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, SUBSCRIBER_QUEUE_DEPTH);
    }

    #[tokio::test]
    async fn send_guard_is_exclusive_per_session() {
        let registry = ConnectionRegistry::new();
        let guard = registry.send_guard("s").await;

        let contender = registry.clone();
        let pending = tokio::spawn(async move { contender.send_guard("s").await });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        drop(guard);
        pending.await.expect("guard acquired after release");
    }

    #[tokio::test]
    async fn empty_sessions_are_removed_from_the_registry() {
        let registry = ConnectionRegistry::new();
        let rx = registry.subscribe("s").await;
        drop(rx);
        registry.publish("s", event("s", "x")).await;
        assert_eq!(registry.subscriber_count("s").await, 0);
    }
}
