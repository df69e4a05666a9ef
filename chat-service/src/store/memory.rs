use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{DisplayProfile, Message, Session};

use super::{ChatStore, NewMessage};

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    /// Per-session log in append order.
    messages: HashMap<String, Vec<Message>>,
    /// (session_id, idempotency_key) -> message id already appended.
    idempotency: HashMap<(String, String), Uuid>,
}

/// In-memory store. A single write lock over the whole state makes the
/// conditional create and the append-plus-preview update trivially
/// atomic. Used by tests and as the dev fallback when no database is
/// configured.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn create_session_if_absent(&self, session: Session) -> AppResult<(Session, bool)> {
        let mut guard = self.inner.write().await;
        if let Some(existing) = guard.sessions.get(&session.id) {
            return Ok((existing.clone(), false));
        }
        guard.sessions.insert(session.id.clone(), session.clone());
        Ok((session, true))
    }

    async fn get_session(&self, session_id: &str) -> AppResult<Option<Session>> {
        Ok(self.inner.read().await.sessions.get(session_id).cloned())
    }

    async fn list_sessions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let guard = self.inner.read().await;
        let mut sessions: Vec<Session> = guard
            .sessions
            .values()
            .filter(|s| s.is_participant(user_id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions.truncate(super::SESSION_LIST_LIMIT);
        Ok(sessions)
    }

    async fn append_message(&self, new: NewMessage) -> AppResult<Message> {
        let mut guard = self.inner.write().await;

        if let Some(key) = &new.idempotency_key {
            let dedup = (new.session_id.clone(), key.clone());
            if let Some(existing_id) = guard.idempotency.get(&dedup) {
                let log = guard.messages.get(&new.session_id);
                if let Some(msg) = log.and_then(|m| m.iter().find(|m| m.id == *existing_id)) {
                    return Ok(msg.clone());
                }
            }
        }

        if !guard.sessions.contains_key(&new.session_id) {
            return Err(AppError::NotFound);
        }

        let log = guard.messages.entry(new.session_id.clone()).or_default();
        // Storage-order sent_at is non-decreasing even if the clock
        // steps backwards between appends.
        let now = Utc::now();
        let sent_at = match log.last() {
            Some(last) if last.sent_at > now => last.sent_at,
            _ => now,
        };
        let message = Message {
            id: Uuid::new_v4(),
            session_id: new.session_id.clone(),
            sequence_number: log.len() as i64 + 1,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            text: new.text,
            attachment_ref: new.attachment_ref,
            idempotency_key: new.idempotency_key.clone(),
            sent_at,
            read_by: vec![new.sender_id],
        };
        log.push(message.clone());

        if let Some(key) = new.idempotency_key {
            guard
                .idempotency
                .insert((new.session_id.clone(), key), message.id);
        }

        // Same lock, so the preview can never diverge from the log.
        let session = guard
            .sessions
            .get_mut(&new.session_id)
            .ok_or(AppError::NotFound)?;
        session.last_message = Some(message.preview());
        session.updated_at = sent_at;

        Ok(message)
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> AppResult<Vec<Message>> {
        let guard = self.inner.read().await;
        let log = match guard.messages.get(session_id) {
            Some(log) => log,
            None => return Ok(Vec::new()),
        };
        let start = log.len().saturating_sub(limit);
        Ok(log[start..].to_vec())
    }

    async fn messages_since(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<Message>> {
        let guard = self.inner.read().await;
        Ok(guard
            .messages
            .get(session_id)
            .map(|log| {
                log.iter()
                    .filter(|m| m.sent_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn mark_read(&self, session_id: &str, viewer_id: Uuid) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        let session = guard.sessions.get_mut(session_id).ok_or(AppError::NotFound)?;
        if let Some(preview) = session.last_message.as_mut() {
            if !preview.read_by.contains(&viewer_id) {
                preview.read_by.push(viewer_id);
            }
        }
        Ok(())
    }

    async fn refresh_participant(
        &self,
        session_id: &str,
        user_id: Uuid,
        profile: DisplayProfile,
    ) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        let session = guard.sessions.get_mut(session_id).ok_or(AppError::NotFound)?;
        if session.is_participant(user_id) {
            session.participants.insert(user_id, profile);
        }
        Ok(())
    }
}
