use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The only notification kind this service emits.
pub const KIND_NEW_MESSAGE: &str = "new_message";

/// Record handed to the external notification-delivery collaborator.
/// Created once per accepted message for the receiving participant;
/// `is_read` is owned by the downstream read flow, never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: String,
    pub summary_text: String,
    pub related_session_id: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
