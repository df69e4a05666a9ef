use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::notification::KIND_NEW_MESSAGE;
use crate::models::{Message, Notification, Session};
use crate::services::profile_directory::placeholder_profile;

/// Preview text is capped so the notification stays a summary.
const SUMMARY_MAX_CHARS: usize = 120;

/// Downstream notification-delivery collaborator. This core only
/// produces the record; persistence and transport (push, email,
/// in-app poll) live elsewhere.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: Notification) -> AppResult<()>;
}

/// Default sink when no delivery backend is wired up: the record is
/// logged and dropped.
#[derive(Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn deliver(&self, notification: Notification) -> AppResult<()> {
        tracing::info!(
            recipient = %notification.recipient_id,
            session = %notification.related_session_id,
            kind = %notification.kind,
            "notification emitted (no delivery backend configured)"
        );
        Ok(())
    }
}

/// Captures delivered notifications; used by tests.
#[derive(Default)]
pub struct RecordingSink {
    delivered: RwLock<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn delivered(&self) -> Vec<Notification> {
        self.delivered.read().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: Notification) -> AppResult<()> {
        self.delivered.write().await.push(notification);
        Ok(())
    }
}

/// Emits exactly one `new_message` notification per accepted message,
/// for the receiving participant. Runs after the message commit; sink
/// failures are logged and swallowed so a notification outage never
/// turns into a failed send.
#[derive(Clone)]
pub struct NotificationEmitter {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationEmitter {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub async fn emit_new_message(&self, session: &Session, message: &Message) {
        let notification = build_notification(session, message);
        if let Err(e) = self.sink.deliver(notification).await {
            tracing::warn!(
                error = %e,
                recipient = %message.receiver_id,
                session = %message.session_id,
                "notification delivery failed; message itself is committed"
            );
        }
    }
}

fn build_notification(session: &Session, message: &Message) -> Notification {
    let sender_name = session
        .participants
        .get(&message.sender_id)
        .map(|p| p.display_name.clone())
        .unwrap_or_else(|| placeholder_profile(message.sender_id).display_name);

    let summary_text = match &message.text {
        Some(text) => format!("{sender_name}: {}", truncate_chars(text, SUMMARY_MAX_CHARS)),
        None => format!("{sender_name} sent an attachment"),
    };

    Notification {
        id: Uuid::new_v4(),
        recipient_id: message.receiver_id,
        kind: KIND_NEW_MESSAGE.to_string(),
        summary_text,
        related_session_id: message.session_id.clone(),
        is_read: false,
        created_at: Utc::now(),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::{canonical_pair, session_key, DisplayProfile};
    use std::collections::HashMap;

    fn fixture() -> (Session, Message) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut participants = HashMap::new();
        participants.insert(
            a,
            DisplayProfile {
                display_name: "Alice".into(),
                avatar_ref: None,
            },
        );
        let session = Session {
            id: session_key(a, b).unwrap(),
            participant_ids: canonical_pair(a, b),
            participants,
            last_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let message = Message {
            id: Uuid::new_v4(),
            session_id: session.id.clone(),
            sequence_number: 1,
            sender_id: a,
            receiver_id: b,
            text: Some("hello there".into()),
            attachment_ref: None,
            idempotency_key: None,
            sent_at: Utc::now(),
            read_by: vec![a],
        };
        (session, message)
    }

    #[test]
    fn summary_uses_sender_display_name() {
        let (session, message) = fixture();
        let n = build_notification(&session, &message);
        assert_eq!(n.kind, KIND_NEW_MESSAGE);
        assert_eq!(n.recipient_id, message.receiver_id);
        assert_eq!(n.summary_text, "Alice: hello there");
        assert!(!n.is_read);
    }

    #[test]
    fn summary_falls_back_to_placeholder_name() {
        let (mut session, message) = fixture();
        session.participants.clear();
        let n = build_notification(&session, &message);
        assert!(n.summary_text.starts_with("u_"));
    }

    #[test]
    fn attachment_only_message_gets_generic_summary() {
        let (session, mut message) = fixture();
        message.text = None;
        message.attachment_ref = Some("https://cdn.example/file.png".into());
        let n = build_notification(&session, &message);
        assert_eq!(n.summary_text, "Alice sent an attachment");
    }

    #[test]
    fn long_text_is_truncated() {
        let (session, mut message) = fixture();
        message.text = Some("x".repeat(500));
        let n = build_notification(&session, &message);
        assert!(n.summary_text.chars().count() < 200);
        assert!(n.summary_text.ends_with('…'));
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() {
        struct FailingSink;
        #[async_trait]
        impl NotificationSink for FailingSink {
            async fn deliver(&self, _n: Notification) -> AppResult<()> {
                Err(crate::error::AppError::Unavailable("sink down".into()))
            }
        }

        let (session, message) = fixture();
        let emitter = NotificationEmitter::new(Arc::new(FailingSink));
        // Must not panic or propagate.
        emitter.emit_new_message(&session, &message).await;
    }
}
