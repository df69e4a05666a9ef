use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub mod messages;
pub mod sessions;

use crate::websocket::handlers::ws_handler;
use messages::{get_message_history, send_message};
use sessions::{create_session, list_user_sessions, mark_as_read};

pub fn build_router() -> Router<AppState> {
    // Service introspection endpoints (no API version prefix)
    let introspection = Router::new().route("/health", get(|| async { "OK" }));

    // API v1 endpoints
    let api_v1 = Router::new()
        .route("/sessions", post(create_session))
        .route("/users/:user_id/sessions", get(list_user_sessions))
        .route(
            "/sessions/:id/messages",
            post(send_message).get(get_message_history),
        )
        .route("/sessions/:id/read", post(mark_as_read))
        // WebSocket endpoint (with API version prefix for consistency)
        .route("/ws", get(ws_handler));

    let router = introspection.merge(Router::new().nest("/api/v1", api_v1));

    crate::middleware::with_defaults(router)
}
