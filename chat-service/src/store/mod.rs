use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{DisplayProfile, Message, Session};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgChatStore;

/// Upper bound on one session listing, applied by every store.
pub const SESSION_LIST_LIMIT: usize = 100;

/// Input to an append; ids, sequencing and timestamps are assigned by
/// the store inside the atomic unit.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub session_id: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: Option<String>,
    pub attachment_ref: Option<String>,
    pub idempotency_key: Option<String>,
}

/// Storage boundary for sessions, the per-session message log and the
/// denormalized preview.
///
/// Two operations carry strict guarantees, both scoped to a single
/// session key so different sessions never contend:
/// - `create_session_if_absent` is a conditional create; racing
///   callers converge on one record and the loser sees `false`.
/// - `append_message` is atomic across message insert, preview update
///   and `updated_at` bump; on failure nothing is observable.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_session_if_absent(&self, session: Session) -> AppResult<(Session, bool)>;

    async fn get_session(&self, session_id: &str) -> AppResult<Option<Session>>;

    /// Sessions the user participates in, most recently updated first,
    /// capped at [`SESSION_LIST_LIMIT`].
    async fn list_sessions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>>;

    /// Durably appends a message and updates the session preview in
    /// one atomic unit. If `idempotency_key` was already used for this
    /// session, the previously stored message is returned instead of
    /// appending a duplicate.
    async fn append_message(&self, new: NewMessage) -> AppResult<Message>;

    /// Newest `limit` messages, returned oldest-first.
    async fn recent_messages(&self, session_id: &str, limit: usize) -> AppResult<Vec<Message>>;

    /// Messages stamped at or after `since`, oldest-first. Used by
    /// reconnecting subscribers to catch up. Inclusive because the
    /// clock-regression clamp can stamp consecutive messages with the
    /// same `sent_at`; an exclusive bound would skip those forever.
    /// Re-delivery at the boundary is resolved client-side by
    /// `sequence_number`.
    async fn messages_since(
        &self,
        session_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<Message>>;

    /// Adds `viewer_id` to the preview read set. Idempotent; a no-op
    /// when the session has no messages yet.
    async fn mark_read(&self, session_id: &str, viewer_id: Uuid) -> AppResult<()>;

    /// Best-effort refresh of one participant's display snapshot.
    async fn refresh_participant(
        &self,
        session_id: &str,
        user_id: Uuid,
        profile: DisplayProfile,
    ) -> AppResult<()>;
}
