use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Message;

/// Events pushed to live subscribers. Serialized as tagged JSON so
/// clients can route on `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    #[serde(rename = "message")]
    Message {
        session_id: String,
        message: Message,
    },
    #[serde(rename = "read_receipt")]
    ReadReceipt {
        session_id: String,
        user_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}
