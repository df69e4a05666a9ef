use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::session::{canonical_pair, session_key};
use crate::models::Session;
use crate::store::ChatStore;

use super::profile_directory::{placeholder_profile, ProfileDirectory};

pub struct SessionService;

impl SessionService {
    /// Resolves or creates the session for a pair of users. Idempotent:
    /// any call order and any number of concurrent callers converge on
    /// one record; only the winning creator sees `true`.
    pub async fn get_or_create(
        store: &dyn ChatStore,
        profiles: &dyn ProfileDirectory,
        user_a: Uuid,
        user_b: Uuid,
    ) -> AppResult<(Session, bool)> {
        let key = session_key(user_a, user_b)?;

        // Fast path: skip the profile lookups when the session exists.
        if let Some(existing) = store.get_session(&key).await? {
            return Ok((existing, false));
        }

        let mut participants = HashMap::new();
        for user_id in [user_a, user_b] {
            let profile = match profiles.get_display_profile(user_id).await {
                Ok(Some(profile)) => profile,
                Ok(None) => placeholder_profile(user_id),
                Err(e) => {
                    tracing::warn!(error = %e, user = %user_id, "profile lookup failed; using placeholder");
                    placeholder_profile(user_id)
                }
            };
            participants.insert(user_id, profile);
        }

        let now = Utc::now();
        let session = Session {
            id: key,
            participant_ids: canonical_pair(user_a, user_b),
            participants,
            last_message: None,
            created_at: now,
            updated_at: now,
        };
        store.create_session_if_absent(session).await
    }

    /// Sessions for the user, most recently updated first.
    pub async fn list_for_user(store: &dyn ChatStore, user_id: Uuid) -> AppResult<Vec<Session>> {
        store.list_sessions_for_user(user_id).await
    }

    /// Marks the session read for `viewer_id`. Idempotent; only
    /// participants may mark a session read.
    pub async fn mark_read(
        store: &dyn ChatStore,
        session_id: &str,
        viewer_id: Uuid,
    ) -> AppResult<()> {
        let session = store
            .get_session(session_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !session.is_participant(viewer_id) {
            return Err(AppError::Forbidden);
        }
        store.mark_read(session_id, viewer_id).await
    }
}
