use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{DisplayProfile, Message, MessagePreview, Session};

use super::{ChatStore, NewMessage};

/// Postgres-backed store. The conditional create maps to
/// `ON CONFLICT DO NOTHING` on the deterministic session key; the
/// append runs in a transaction holding the session row lock, which
/// also serializes sequence allocation per session.
pub struct PgChatStore {
    pool: Pool<Postgres>,
}

impl PgChatStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn session_from_row(row: &sqlx::postgres::PgRow) -> AppResult<Session> {
    let participants: serde_json::Value = row.get("participants");
    let last_message: Option<serde_json::Value> = row.get("last_message");
    Ok(Session {
        id: row.get("id"),
        participant_ids: [row.get("participant_a"), row.get("participant_b")],
        participants: serde_json::from_value(participants).map_err(|e| {
            tracing::error!(error = %e, "corrupt participants snapshot");
            AppError::Internal
        })?,
        last_message: last_message
            .map(serde_json::from_value::<MessagePreview>)
            .transpose()
            .map_err(|e| {
                tracing::error!(error = %e, "corrupt last_message preview");
                AppError::Internal
            })?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn message_from_row(row: &sqlx::postgres::PgRow) -> Message {
    Message {
        id: row.get("id"),
        session_id: row.get("session_id"),
        sequence_number: row.get("sequence_number"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        text: row.get("text_content"),
        attachment_ref: row.get("attachment_ref"),
        idempotency_key: row.get("idempotency_key"),
        sent_at: row.get("sent_at"),
        read_by: row.get("read_by"),
    }
}

const SESSION_COLUMNS: &str =
    "id, participant_a, participant_b, participants, last_message, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, session_id, sequence_number, sender_id, receiver_id, \
     text_content, attachment_ref, idempotency_key, sent_at, read_by";

#[async_trait]
impl ChatStore for PgChatStore {
    async fn create_session_if_absent(&self, session: Session) -> AppResult<(Session, bool)> {
        let participants = serde_json::to_value(&session.participants).map_err(|e| {
            tracing::error!(error = %e, "serialize participants");
            AppError::Internal
        })?;

        let inserted = sqlx::query(
            "INSERT INTO chat_sessions (id, participant_a, participant_b, participants, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&session.id)
        .bind(session.participant_ids[0])
        .bind(session.participant_ids[1])
        .bind(&participants)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 1 {
            return Ok((session, true));
        }

        // Lost the race (or the session predates this call): return the
        // winner's record.
        let existing = self
            .get_session(&session.id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok((existing, false))
    }

    async fn get_session(&self, session_id: &str) -> AppResult<Option<Session>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(session_from_row).transpose()
    }

    async fn list_sessions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions \
             WHERE participant_a = $1 OR participant_b = $1 \
             ORDER BY updated_at DESC \
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(super::SESSION_LIST_LIMIT as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(session_from_row).collect()
    }

    async fn append_message(&self, new: NewMessage) -> AppResult<Message> {
        let mut tx = self.pool.begin().await?;

        // Row lock: serializes appends per session and confirms existence.
        let session = sqlx::query("SELECT id FROM chat_sessions WHERE id = $1 FOR UPDATE")
            .bind(&new.session_id)
            .fetch_optional(&mut *tx)
            .await?;
        if session.is_none() {
            return Err(AppError::NotFound);
        }

        if let Some(key) = &new.idempotency_key {
            let existing = sqlx::query(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
                 WHERE session_id = $1 AND idempotency_key = $2"
            ))
            .bind(&new.session_id)
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?;
            if let Some(row) = existing {
                return Ok(message_from_row(&row));
            }
        }

        let id = Uuid::new_v4();
        let read_by = vec![new.sender_id];
        // GREATEST keeps sent_at non-decreasing in storage order even
        // if the database clock steps backwards.
        let row = sqlx::query(&format!(
            "INSERT INTO chat_messages \
                 (id, session_id, sequence_number, sender_id, receiver_id, \
                  text_content, attachment_ref, idempotency_key, sent_at, read_by) \
             SELECT $1, $2, \
                    COALESCE(MAX(sequence_number), 0) + 1, \
                    $3, $4, $5, $6, $7, \
                    GREATEST(NOW(), COALESCE(MAX(sent_at), NOW())), $8 \
             FROM chat_messages WHERE session_id = $2 \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(&new.session_id)
        .bind(new.sender_id)
        .bind(new.receiver_id)
        .bind(&new.text)
        .bind(&new.attachment_ref)
        .bind(&new.idempotency_key)
        .bind(&read_by)
        .fetch_one(&mut *tx)
        .await?;
        let message = message_from_row(&row);

        let preview = serde_json::to_value(message.preview()).map_err(|e| {
            tracing::error!(error = %e, "serialize message preview");
            AppError::Internal
        })?;
        sqlx::query("UPDATE chat_sessions SET last_message = $2, updated_at = $3 WHERE id = $1")
            .bind(&new.session_id)
            .bind(&preview)
            .bind(message.sent_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn recent_messages(&self, session_id: &str, limit: usize) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE session_id = $1 \
             ORDER BY sequence_number DESC \
             LIMIT $2"
        ))
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        let mut messages: Vec<Message> = rows.iter().map(message_from_row).collect();
        messages.reverse();
        Ok(messages)
    }

    async fn messages_since(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages \
             WHERE session_id = $1 AND sent_at >= $2 \
             ORDER BY sequence_number ASC"
        ))
        .bind(session_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn mark_read(&self, session_id: &str, viewer_id: Uuid) -> AppResult<()> {
        // Single-statement JSONB update; the WHERE clause makes repeat
        // calls no-ops.
        let result = sqlx::query(
            "UPDATE chat_sessions \
             SET last_message = jsonb_set(last_message, '{read_by}', \
                    (last_message->'read_by') || to_jsonb($2::text)) \
             WHERE id = $1 \
               AND last_message IS NOT NULL \
               AND NOT (last_message->'read_by') @> to_jsonb($2::text)",
        )
        .bind(session_id)
        .bind(viewer_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Already read, no preview yet, or unknown session: only the
            // last case is an error.
            let exists = sqlx::query("SELECT 1 FROM chat_sessions WHERE id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
            if exists.is_none() {
                return Err(AppError::NotFound);
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
        let value = serde_json::to_value(&profile).map_err(|e| {
            tracing::error!(error = %e, "serialize display profile");
            AppError::Internal
        })?;
        sqlx::query(
            "UPDATE chat_sessions \
             SET participants = jsonb_set(participants, ARRAY[$2::text], $3) \
             WHERE id = $1 AND (participant_a = $4 OR participant_b = $4)",
        )
        .bind(session_id)
        .bind(user_id.to_string())
        .bind(&value)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
