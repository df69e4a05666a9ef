use std::sync::Arc;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{DisplayProfile, Message};
use crate::store::{ChatStore, NewMessage};
use crate::websocket::message_types::ChatEvent;
use crate::websocket::ConnectionRegistry;

use super::notification_service::NotificationEmitter;

#[derive(Debug, Default, Clone)]
pub struct SendMessageInput {
    pub text: Option<String>,
    pub attachment_ref: Option<String>,
    /// Caller-supplied token; retries with the same token are
    /// deduplicated at the message-log boundary.
    pub idempotency_key: Option<String>,
    /// If the caller knows a fresher display snapshot for the sender,
    /// it is applied best-effort after the commit.
    pub sender_profile: Option<DisplayProfile>,
}

/// Write coordinator: validates, appends atomically through the store,
/// then fans the committed message out to live subscribers and the
/// notification emitter. The fan-out and the notification are both
/// post-commit and can never roll the message back.
pub struct MessageService;

impl MessageService {
    pub async fn append_message(
        store: &dyn ChatStore,
        registry: &ConnectionRegistry,
        emitter: &NotificationEmitter,
        session_id: &str,
        sender_id: Uuid,
        input: SendMessageInput,
    ) -> AppResult<Message> {
        let text = input.text.filter(|t| !t.trim().is_empty());
        let attachment_ref = input.attachment_ref.filter(|a| !a.trim().is_empty());
        if text.is_none() && attachment_ref.is_none() {
            return Err(AppError::InvalidOperation(
                "message needs text or an attachment".into(),
            ));
        }

        let session = store
            .get_session(session_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let receiver_id = session
            .other_participant(sender_id)
            .ok_or(AppError::Forbidden)?;

        // Commit order must equal publish order for live subscribers;
        // the guard spans both steps.
        let _send_guard = registry.send_guard(session_id).await;

        let message = store
            .append_message(NewMessage {
                session_id: session_id.to_string(),
                sender_id,
                receiver_id,
                text,
                attachment_ref,
                idempotency_key: input.idempotency_key,
            })
            .await?;

        if let Some(profile) = input.sender_profile {
            if session.participants.get(&sender_id) != Some(&profile) {
                if let Err(e) = store
                    .refresh_participant(session_id, sender_id, profile)
                    .await
                {
                    tracing::debug!(error = %e, "participant snapshot refresh skipped");
                }
            }
        }

        registry
            .publish(
                session_id,
                Arc::new(ChatEvent::Message {
                    session_id: session_id.to_string(),
                    message: message.clone(),
                }),
            )
            .await;
        emitter.emit_new_message(&session, &message).await;

        Ok(message)
    }
}
