use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::MessagePreview;

/// One unit of content within a session. At least one of `text` /
/// `attachment_ref` is present; both ordering fields (`sequence_number`,
/// `sent_at`) are assigned server-side at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: String,
    /// Monotonic per-session position, never reused.
    pub sequence_number: i64,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: Option<String>,
    /// Opaque reference produced by attachment storage (e.g. an upload URL).
    pub attachment_ref: Option<String>,
    pub idempotency_key: Option<String>,
    pub sent_at: DateTime<Utc>,
    /// Users who acknowledged this message; the sender is included at
    /// write time.
    pub read_by: Vec<Uuid>,
}

impl Message {
    /// The denormalized summary stored on the session.
    pub fn preview(&self) -> MessagePreview {
        MessagePreview {
            text: self.text.clone(),
            sender_id: self.sender_id,
            sent_at: self.sent_at,
            read_by: self.read_by.clone(),
        }
    }
}
