use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{DisplayProfile, Message};
use crate::services::message_service::{MessageService, SendMessageInput};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: Uuid,
    pub text: Option<String>,
    pub attachment_ref: Option<String>,
    pub idempotency_key: Option<String>,
    /// Optional fresher display snapshot for the sender, applied
    /// best-effort to the session's denormalized participants.
    pub sender_display_name: Option<String>,
    pub sender_avatar_ref: Option<String>,
}

/// POST /sessions/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let sender_profile = body.sender_display_name.map(|display_name| DisplayProfile {
        display_name,
        avatar_ref: body.sender_avatar_ref,
    });
    let message = MessageService::append_message(
        state.store.as_ref(),
        &state.registry,
        &state.emitter,
        &id,
        body.sender_id,
        SendMessageInput {
            text: body.text,
            attachment_ref: body.attachment_ref,
            idempotency_key: body.idempotency_key,
            sender_profile,
        },
    )
    .await?;
    Ok(Json(message))
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub user_id: Uuid,
    /// When set, returns messages stamped at or after this timestamp
    /// (reconnect catch-up, duplicates deduped by sequence number);
    /// otherwise the newest `limit`.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// GET /sessions/{id}/messages?user_id=&since=&limit=
pub async fn get_message_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Message>>, AppError> {
    let session = state.store.get_session(&id).await?.ok_or(AppError::NotFound)?;
    if !session.is_participant(params.user_id) {
        return Err(AppError::Forbidden);
    }

    let messages = match params.since {
        Some(since) => state.store.messages_since(&id, since).await?,
        None => {
            let limit = params
                .limit
                .unwrap_or(state.config.replay_limit)
                .min(state.config.history_page_limit);
            state.store.recent_messages(&id, limit).await?
        }
    };
    Ok(Json(messages))
}
