use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Denormalized display snapshot for one participant. Refreshed
/// opportunistically on send; the profile service remains the source
/// of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayProfile {
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

/// Summary of the most recent message, embedded on the session for
/// fast listings. Derived from the message log; never authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePreview {
    pub text: Option<String>,
    pub sender_id: Uuid,
    pub sent_at: DateTime<Utc>,
    pub read_by: Vec<Uuid>,
}

/// A two-party conversation container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Deterministic key derived from the participant pair, see [`session_key`].
    pub id: String,
    /// Exactly two distinct user ids, stored in canonical (sorted) order.
    pub participant_ids: [Uuid; 2],
    pub participants: HashMap<Uuid, DisplayProfile>,
    /// `None` until the first message exists.
    pub last_message: Option<MessagePreview>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_ids.contains(&user_id)
    }

    /// The other side of the conversation, or `None` if `user_id` is
    /// not a participant.
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        let [a, b] = self.participant_ids;
        if user_id == a {
            Some(b)
        } else if user_id == b {
            Some(a)
        } else {
            None
        }
    }

    /// Unread for `viewer_id` iff the latest message exists, was sent
    /// by the other participant, and the viewer has not acknowledged it.
    pub fn is_unread(&self, viewer_id: Uuid) -> bool {
        match &self.last_message {
            Some(preview) => {
                preview.sender_id != viewer_id && !preview.read_by.contains(&viewer_id)
            }
            None => false,
        }
    }
}

/// Canonical session key for an unordered pair of users.
///
/// The two ids are sorted and joined with `:`, which cannot appear in
/// a UUID's text form, so the mapping is commutative and injective
/// over unordered pairs. (Uuid's `Ord` compares the raw bytes, which
/// matches lexicographic order of the hyphenated hex form.)
pub fn session_key(a: Uuid, b: Uuid) -> Result<String, AppError> {
    if a == b {
        return Err(AppError::InvalidOperation(
            "cannot open a session with yourself".into(),
        ));
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    Ok(format!("{lo}:{hi}"))
}

/// The canonical (sorted) participant pair for storage.
pub fn canonical_pair(a: Uuid, b: Uuid) -> [Uuid; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}
