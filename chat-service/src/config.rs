use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    /// When unset, the service falls back to the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    /// Messages replayed to a fresh subscriber (newest N, oldest-first).
    pub replay_limit: usize,
    /// Hard cap for history page sizes.
    pub history_page_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let replay_limit = env::var("CHAT_REPLAY_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);
        let history_page_limit = env::var("CHAT_HISTORY_PAGE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(200);

        Ok(Self {
            database_url,
            port,
            replay_limit,
            history_page_limit,
        })
    }

    pub fn test_defaults() -> Self {
        Self {
            database_url: None,
            port: 3000,
            replay_limit: 50,
            history_page_limit: 200,
        }
    }
}
