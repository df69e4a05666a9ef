use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Session;
use crate::services::session_service::SessionService;
use crate::state::AppState;
use crate::websocket::message_types::ChatEvent;

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub user_a: Uuid,
    pub user_b: Uuid,
}

#[derive(Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: Session,
    pub is_new: bool,
}

/// POST /sessions — get-or-create for a user pair. 201 when this call
/// created the session, 200 when it already existed.
pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), crate::error::AppError> {
    let (session, is_new) = SessionService::get_or_create(
        state.store.as_ref(),
        state.profiles.as_ref(),
        body.user_a,
        body.user_b,
    )
    .await?;
    let status = if is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(SessionResponse { session, is_new })))
}

#[derive(Serialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: Session,
    /// Unread state computed for the requesting user.
    pub unread: bool,
}

/// GET /users/{user_id}/sessions — most recently updated first.
pub async fn list_user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<SessionSummary>>, crate::error::AppError> {
    let sessions = SessionService::list_for_user(state.store.as_ref(), user_id).await?;
    let summaries = sessions
        .into_iter()
        .map(|session| {
            let unread = session.is_unread(user_id);
            SessionSummary { session, unread }
        })
        .collect();
    Ok(Json(summaries))
}

#[derive(Deserialize)]
pub struct MarkAsReadRequest {
    pub user_id: Uuid,
}

/// POST /sessions/{id}/read — idempotent.
pub async fn mark_as_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MarkAsReadRequest>,
) -> Result<StatusCode, crate::error::AppError> {
    SessionService::mark_read(state.store.as_ref(), &id, body.user_id).await?;

    // Broadcast the read receipt to live subscribers.
    state
        .registry
        .publish(
            &id,
            Arc::new(ChatEvent::ReadReceipt {
                session_id: id.clone(),
                user_id: body.user_id,
                timestamp: Utc::now(),
            }),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
