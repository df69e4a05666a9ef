use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::DisplayProfile;

/// External identity lookup. User/profile storage is another service's
/// concern; this core only needs a display snapshot per user id.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_display_profile(&self, user_id: Uuid) -> AppResult<Option<DisplayProfile>>;
}

/// Synthesized snapshot for users the directory does not know. A
/// missing profile must never fail session creation.
pub fn placeholder_profile(user_id: Uuid) -> DisplayProfile {
    DisplayProfile {
        display_name: format!("u_{}", &user_id.to_string()[..8]),
        avatar_ref: None,
    }
}

/// In-memory directory, seedable for tests and local development.
#[derive(Default)]
pub struct StaticProfileDirectory {
    profiles: RwLock<HashMap<Uuid, DisplayProfile>>,
}

impl StaticProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: Uuid, profile: DisplayProfile) {
        self.profiles.write().await.insert(user_id, profile);
    }
}

#[async_trait]
impl ProfileDirectory for StaticProfileDirectory {
    async fn get_display_profile(&self, user_id: Uuid) -> AppResult<Option<DisplayProfile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }
}
