use std::sync::Arc;

use chat_service::{
    config::Config,
    db, error, logging, migrations, routes,
    services::{notification_service::TracingSink, NotificationEmitter, StaticProfileDirectory},
    state::AppState,
    store::{ChatStore, MemoryStore, PgChatStore},
    websocket::ConnectionRegistry,
};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(Config::from_env()?);

    let store: Arc<dyn ChatStore> = match cfg.database_url.as_deref() {
        Some(url) => {
            let pool = db::init_pool(url)
                .await
                .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;
            // Run embedded migrations (idempotent)
            migrations::run_all(&pool)
                .await
                .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;
            Arc::new(PgChatStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (non-durable)");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState {
        store,
        registry: ConnectionRegistry::new(),
        profiles: Arc::new(StaticProfileDirectory::new()),
        emitter: NotificationEmitter::new(Arc::new(TracingSink)),
        config: cfg.clone(),
    };

    let app = routes::build_router().with_state(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
